use crate::connection::ConnectionId;
use crate::error::ConnectivityError;
use crate::signal::ExternalMessage;
use crate::signal::Signal;
use mockall::automock;

/// Pure transform between external wire messages and internal signals.
///
/// This is an external collaborator: the connectivity service consumes a `MessageMapper`
/// implementation, but its actual mapping logic (how bytes become signals) is out of scope
/// here. The trait is still defined in full, with an initialization contract, because the
/// client state machine depends on that contract: mapper construction can fail, and that
/// failure must be reported to the command origin the same way a transport failure would be.
#[automock]
pub trait MessageMapper: Send + 'static {
    /// Translate one external message into zero or more internal signals.
    fn map_incoming(&mut self, external: &ExternalMessage) -> Vec<Signal>;

    /// Translate one outbound signal into its external wire representation.
    fn map_outgoing(&mut self, signal: &Signal) -> ExternalMessage;
}

/// Constructs a [MessageMapper] for a connection, given its optional mapping context.
///
/// Modeled as a trait rather than a plain function pointer so test doubles can be supplied
/// through `mockall::automock` the same way the `Clock` trait is mocked in [clock].
#[automock]
pub trait MessageMapperFactory: Send + Sync + 'static {
    fn try_new(
        &self,
        connection_id: &ConnectionId,
        mapping_context: Option<&serde_json::Value>,
    ) -> Result<Box<dyn MessageMapper>, ConnectivityError>;
}
