use conn_model::error::ConnectivityError;
use conn_model::signal::AutoAckTarget;
use conn_model::signal::CommandResponseOrAck;
use conn_model::signal::ExternalMessage;
use conn_model::signal::Signal;
use tokio::sync::oneshot;

/// The result of one `publish` call: an acknowledgement (plus, for message commands, a matching
/// command response), or a typed failure.
pub type PublishOutcome = Result<CommandResponseOrAck, ConnectivityError>;

/// In-flight publish descriptor, carried alongside the protocol request from enqueue until a
/// response arrives or the pipeline fails it.
///
/// `result_sender` is wrapped in an `Option` so completion is idempotent: the first [complete]
/// call takes the sender and sends; any later call is a silent no-op, mirroring
/// `conn_actors::channels`'s own `Option<oneshot::Sender<M>>` `Sender` impl, whose `send` does
/// the same.
///
/// [complete]: PublishContext::complete
pub struct PublishContext {
    pub signal: Signal,
    pub auto_ack_target: Option<AutoAckTarget>,
    pub external_message: ExternalMessage,
    pub max_total_message_size: usize,
    pub ack_size_quota: usize,
    result_sender: Option<oneshot::Sender<PublishOutcome>>,
}

impl PublishContext {
    pub fn new(
        signal: Signal,
        auto_ack_target: Option<AutoAckTarget>,
        external_message: ExternalMessage,
        max_total_message_size: usize,
        ack_size_quota: usize,
        result_sender: oneshot::Sender<PublishOutcome>,
    ) -> Self {
        PublishContext {
            signal,
            auto_ack_target,
            external_message,
            max_total_message_size,
            ack_size_quota,
            result_sender: Some(result_sender),
        }
    }

    /// Complete the result future. Idempotent: a second call, or a call after the receiving end
    /// has been dropped, is silently ignored.
    pub fn complete(&mut self, outcome: PublishOutcome) {
        if let Some(sender) = self.result_sender.take() {
            let _ = sender.send(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conn_model::connection::DittoHeaders;
    use conn_model::signal::ExternalPayload;
    use std::collections::BTreeMap;

    fn sample_context(tx: oneshot::Sender<PublishOutcome>) -> PublishContext {
        PublishContext::new(
            Signal::Event {
                ditto_headers: DittoHeaders::new(),
            },
            None,
            ExternalMessage {
                headers: BTreeMap::new(),
                payload: ExternalPayload::Text(String::new()),
            },
            1024,
            1024,
            tx,
        )
    }

    #[tokio::test]
    async fn completion_is_idempotent() {
        let (tx, rx) = oneshot::channel();
        let mut ctx = sample_context(tx);

        ctx.complete(Err(ConnectivityError::message_sending_failed("first")));
        ctx.complete(Err(ConnectivityError::message_sending_failed("second")));

        let outcome = rx.await.unwrap();
        assert!(matches!(
            outcome,
            Err(ConnectivityError::MessageSendingFailed { description }) if description == "first"
        ));
    }

    #[tokio::test]
    async fn completion_after_receiver_is_dropped_does_not_panic() {
        let (tx, rx) = oneshot::channel();
        let mut ctx = sample_context(tx);
        drop(rx);

        ctx.complete(Err(ConnectivityError::message_sending_failed("too late")));
    }
}
