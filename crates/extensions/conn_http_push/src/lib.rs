//! The HTTP-push specialization of [ConnectionTransport] and [PublishTransport]: a signal's
//! outbound `ExternalMessage` becomes one HTTP request, and the response is decoded back into
//! an acknowledgement or command-response (§4.5).
//!
//! HTTP push holds no persistent connection, so `do_connect`/`do_disconnect` are no-ops beyond
//! the client's own TCP pre-check; `do_test_connection` is a best-effort `HEAD` against the
//! configured target.

#![forbid(unsafe_code)]

mod config;
mod error;
mod request;
mod response;
mod transport;

pub use config::HttpPushTarget;
pub use error::HttpPushError;
pub use request::build_request;
pub use response::redact_user_info;
pub use response::to_outcome;
pub use transport::HttpPushTransport;
