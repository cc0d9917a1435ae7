use conn_model::error::ConnectivityError;
use std::time::Duration;
use thiserror::Error;

/// Failures specific to building, sending or decoding an HTTP-push request/response, folded
/// into [ConnectivityError] at the `PublishTransport` boundary so `conn_publisher` never has to
/// know about `hyper` or `http` types.
#[derive(Error, Debug)]
pub enum HttpPushError {
    #[error("invalid http request: {0}")]
    InvalidRequest(#[from] http::Error),

    #[error("http transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("unknown HTTP status {0}")]
    UnknownStatus(u16),

    #[error("response body read failed: {0}")]
    BodyRead(String),

    #[error("timed out reading the response body after {0:?}")]
    ReadTimeout(Duration),
}

impl From<HttpPushError> for ConnectivityError {
    fn from(error: HttpPushError) -> Self {
        ConnectivityError::message_sending_failed(error.to_string())
    }
}
