use async_trait::async_trait;
use conn_model::error::ConnectivityError;
use conn_model::signal::AutoAckTarget;
use conn_model::signal::CommandResponseOrAck;
use conn_model::signal::ExternalMessage;
use conn_model::signal::PublishTarget;
use conn_model::signal::Signal;

/// The protocol-specific half of a publish: builds a request from a signal, sends it, and
/// demultiplexes the response into the command-response/acknowledgement pair the result future
/// resolves to.
///
/// One implementation per transport (HTTP push, …); [PublisherPipeline](crate::PublisherPipeline)
/// itself is transport-agnostic and only owns the queue, the backpressure policy and the
/// metrics bookkeeping.
#[async_trait]
pub trait PublishTransport: Send + Sync + 'static {
    /// The protocol-specific request built from a signal, carried through the bounded queue.
    type Request: Send + 'static;

    /// The protocol-specific response returned by [send](Self::send).
    type Response: Send + 'static;

    /// Build the protocol request for `signal`. Failures here (e.g. a malformed target) never
    /// reach the queue: the publish future is completed immediately.
    async fn build_request(
        &self,
        signal: &Signal,
        auto_ack_target: Option<&AutoAckTarget>,
        publish_target: &PublishTarget,
        external_message: &ExternalMessage,
    ) -> Result<Self::Request, ConnectivityError>;

    /// Dispatch one request. A failure here means no response was ever received (connection
    /// refused, timed out, …).
    async fn send(&self, request: Self::Request) -> Result<Self::Response, ConnectivityError>;

    /// Turn a received response into the outcome of the publish call. A failure here means a
    /// response was received but could not be turned into a usable acknowledgement (unknown
    /// status code, oversized body, …).
    async fn to_outcome(
        &self,
        signal: &Signal,
        auto_ack_target: Option<&AutoAckTarget>,
        response: Self::Response,
        max_total_message_size: usize,
        ack_size_quota: usize,
    ) -> Result<CommandResponseOrAck, ConnectivityError>;
}
