use crate::config::HttpPushTarget;
use crate::error::HttpPushError;
use bytes::Bytes;
use conn_model::signal::ExternalMessage;
use conn_model::signal::ExternalPayload;
use http_body_util::Full;

/// Build the HTTP request for one publish, per §4.5 point 1-3:
///
/// - the `Content-Type` header is extracted from `external_message` and attached to the
///   entity, never duplicated as a plain header;
/// - the body is the raw bytes under that content-type if one was given; otherwise the text
///   (under `text/plain`) if the message is textual; otherwise the raw bytes as-is;
/// - method and URI come from the injected [HttpPushTarget].
pub fn build_request(
    target: &HttpPushTarget,
    external_message: &ExternalMessage,
) -> Result<http::Request<Full<Bytes>>, HttpPushError> {
    let mut builder = http::Request::builder().method(target.method.clone()).uri(target.uri.clone());

    for (name, value) in external_message.headers_without_content_type() {
        builder = builder.header(name, value);
    }

    let (content_type, body) = match (external_message.content_type(), &external_message.payload) {
        (Some(content_type), payload) => (content_type.to_string(), raw_bytes(payload)),
        (None, ExternalPayload::Text(text)) => (mime::TEXT_PLAIN.essence_str().to_string(), text.clone().into_bytes()),
        (None, ExternalPayload::Bytes(bytes)) => return builder.body(Full::new(Bytes::from(bytes.clone()))).map_err(HttpPushError::InvalidRequest),
    };

    builder
        .header(http::header::CONTENT_TYPE, content_type)
        .body(Full::new(Bytes::from(body)))
        .map_err(HttpPushError::InvalidRequest)
}

fn raw_bytes(payload: &ExternalPayload) -> Vec<u8> {
    match payload {
        ExternalPayload::Text(text) => text.clone().into_bytes(),
        ExternalPayload::Bytes(bytes) => bytes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn target() -> HttpPushTarget {
        HttpPushTarget::new(http::Method::POST, "http://svc:80/ack".parse().unwrap())
    }

    #[test]
    fn an_explicit_content_type_header_is_attached_to_the_entity_not_duplicated() {
        let message = ExternalMessage {
            headers: BTreeMap::from([
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Correlation-Id".to_string(), "abc".to_string()),
            ]),
            payload: ExternalPayload::Text("{}".to_string()),
        };

        let request = build_request(&target(), &message).unwrap();
        assert_eq!(
            request.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(request.headers().get("x-correlation-id").unwrap(), "abc");
        // Only one Content-Type header value is present.
        assert_eq!(request.headers().get_all(http::header::CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn a_text_message_without_a_content_type_defaults_to_text_plain() {
        let message = ExternalMessage {
            headers: BTreeMap::new(),
            payload: ExternalPayload::Text("hello".to_string()),
        };

        let request = build_request(&target(), &message).unwrap();
        assert_eq!(request.headers().get(http::header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn a_binary_message_without_a_content_type_carries_no_content_type_header() {
        let message = ExternalMessage {
            headers: BTreeMap::new(),
            payload: ExternalPayload::Bytes(vec![1, 2, 3]),
        };

        let request = build_request(&target(), &message).unwrap();
        assert!(request.headers().get(http::header::CONTENT_TYPE).is_none());
    }
}
