use conn_model::signal::PublishTarget;

/// The per-target configuration an `HttpPushTransport` is built from: method, request-URI
/// template, and the derived [PublishTarget] address used to key metrics and backpressure
/// logging.
///
/// TLS and authentication parameters are named in the Target record but out of scope here (see
/// spec §1, "authentication configuration"); only plain `http://` requests are exercised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpPushTarget {
    pub method: http::Method,
    pub uri: http::Uri,
}

impl HttpPushTarget {
    pub fn new(method: http::Method, uri: http::Uri) -> Self {
        HttpPushTarget { method, uri }
    }

    /// The address used to key metrics and the publisher's backpressure reporting: the request
    /// path, falling back to `/` for a URI with none.
    pub fn publish_target(&self) -> PublishTarget {
        PublishTarget {
            address: match self.uri.path() {
                "" => "/".to_string(),
                path => path.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_target_uses_the_uri_path() {
        let target = HttpPushTarget::new(http::Method::POST, "http://svc:80/ingest".parse().unwrap());
        assert_eq!(target.publish_target().address, "/ingest");
    }
}
