use crate::config::HttpPushTarget;
use crate::error::HttpPushError;
use crate::request::build_request;
use crate::response::redact_user_info;
use crate::response::to_outcome;
use async_trait::async_trait;
use bytes::Bytes;
use conn_client::ConnectionTransport;
use conn_model::connection::Connection;
use conn_model::error::ConnectivityError;
use conn_model::signal::AutoAckTarget;
use conn_model::signal::CommandResponseOrAck;
use conn_model::signal::ExternalMessage;
use conn_model::signal::PublishTarget;
use conn_model::signal::Signal;
use conn_model::signal::DIAGNOSTIC_ACK_LABEL;
use conn_publisher::PublishTransport;
use http_body_util::Full;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

/// The HTTP-push specialization of both [ConnectionTransport] and [PublishTransport] (§4.5):
/// `do_connect`/`do_disconnect`/`do_test_connection` are no-ops beyond the client's own TCP
/// pre-check, since HTTP push holds no persistent connection — the transport-level half of
/// `TestConnection` is a best-effort `HEAD` against the configured target.
#[derive(Clone)]
pub struct HttpPushTransport {
    target: HttpPushTarget,
    client: Client<HttpConnector, Full<Bytes>>,
    response_read_timeout: Duration,
}

impl HttpPushTransport {
    pub fn new(target: HttpPushTarget) -> Self {
        HttpPushTransport {
            target,
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            response_read_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_response_read_timeout(mut self, timeout: Duration) -> Self {
        self.response_read_timeout = timeout;
        self
    }
}

#[async_trait]
impl PublishTransport for HttpPushTransport {
    type Request = http::Request<Full<Bytes>>;
    type Response = http::Response<hyper::body::Incoming>;

    async fn build_request(
        &self,
        _signal: &Signal,
        _auto_ack_target: Option<&AutoAckTarget>,
        _publish_target: &PublishTarget,
        external_message: &ExternalMessage,
    ) -> Result<Self::Request, ConnectivityError> {
        build_request(&self.target, external_message).map_err(ConnectivityError::from)
    }

    async fn send(&self, request: Self::Request) -> Result<Self::Response, ConnectivityError> {
        log::debug!(target: "HttpPushTransport", "sending {} {}", request.method(), redact_user_info(request.uri()));
        self.client.request(request).await.map_err(|error| ConnectivityError::from(HttpPushError::from(error)))
    }

    async fn to_outcome(
        &self,
        signal: &Signal,
        auto_ack_target: Option<&AutoAckTarget>,
        response: Self::Response,
        max_total_message_size: usize,
        ack_size_quota: usize,
    ) -> Result<CommandResponseOrAck, ConnectivityError> {
        let label = auto_ack_target
            .map(|target| target.label.clone())
            .unwrap_or_else(|| DIAGNOSTIC_ACK_LABEL.to_string());
        to_outcome(signal, label, response, max_total_message_size, ack_size_quota, self.response_read_timeout)
            .await
            .map_err(ConnectivityError::from)
    }
}

#[async_trait]
impl ConnectionTransport for HttpPushTransport {
    type PublishTransport = HttpPushTransport;

    async fn do_connect(&self, _connection: &Connection) -> Result<(), ConnectivityError> {
        // No persistent connection to establish beyond the client's own TCP pre-check.
        Ok(())
    }

    async fn do_disconnect(&self, _connection: &Connection) -> Result<(), ConnectivityError> {
        Ok(())
    }

    async fn do_test_connection(&self, _connection: &Connection) -> Result<(), ConnectivityError> {
        let request = http::Request::builder()
            .method(http::Method::HEAD)
            .uri(self.target.uri.clone())
            .body(Full::new(Bytes::new()))
            .map_err(HttpPushError::InvalidRequest)?;
        self.client
            .request(request)
            .await
            .map(|_response| ())
            .map_err(|error| ConnectivityError::from(HttpPushError::from(error)))
    }

    fn new_publish_transport(&self, _connection: &Connection) -> Self::PublishTransport {
        self.clone()
    }
}
