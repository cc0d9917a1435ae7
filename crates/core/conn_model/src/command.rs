use crate::client::ClientState;
use crate::connection::Connection;
use crate::connection::ConnectionId;
use crate::connection::DittoHeaders;
use crate::error::ConnectivityError;

/// Lifecycle commands delivered from the signal bus into a client. Each carries the
/// connection id and headers of the originating request, used to address the reply.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientCommand {
    CreateConnection {
        connection: Connection,
        ditto_headers: DittoHeaders,
    },
    ModifyConnection {
        connection: Connection,
        ditto_headers: DittoHeaders,
    },
    OpenConnection {
        ditto_headers: DittoHeaders,
    },
    CloseConnection {
        ditto_headers: DittoHeaders,
    },
    DeleteConnection {
        ditto_headers: DittoHeaders,
    },
    TestConnection {
        connection: Connection,
        ditto_headers: DittoHeaders,
    },
    RetrieveConnectionMetrics {
        ditto_headers: DittoHeaders,
    },
}

impl ClientCommand {
    pub fn ditto_headers(&self) -> &DittoHeaders {
        match self {
            ClientCommand::CreateConnection { ditto_headers, .. }
            | ClientCommand::ModifyConnection { ditto_headers, .. }
            | ClientCommand::OpenConnection { ditto_headers }
            | ClientCommand::CloseConnection { ditto_headers }
            | ClientCommand::DeleteConnection { ditto_headers }
            | ClientCommand::TestConnection { ditto_headers, .. }
            | ClientCommand::RetrieveConnectionMetrics { ditto_headers } => ditto_headers,
        }
    }
}

/// Internal events fed back into a client's event loop, typically the outcome of a
/// long-running operation (TCP pre-check, `do_connect`, mapper init) executed off the event
/// loop so it never blocks serial command processing.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    ClientConnected,
    ClientDisconnected,
    ConnectionFailure {
        origin: Option<String>,
        description: String,
    },
    /// Fired by the state-timeout timer when no terminal event arrived in time.
    StateTimeout,
    /// Fired once after actor start, to let a freshly created client self-send
    /// `OpenConnection` if its desired status is already `Open`.
    InitTimeout,
}

/// A reply sent back to the origin of a [ClientCommand].
#[derive(Clone, Debug, PartialEq)]
pub enum ClientReply {
    Success {
        state: ClientState,
    },
    Failure {
        error: ConnectivityError,
    },
    RetrieveConnectionMetricsResponse {
        connection_id: ConnectionId,
        metrics: crate::metrics::ConnectionMetricsSnapshot,
    },
}
