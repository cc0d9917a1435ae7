use crate::connection::Connection;
use crate::connection::ConnectionId;
use crate::connection::DesiredStatus;
use crate::connection::DittoHeaders;
use clock::Timestamp;

/// The finite set of states a client's lifecycle moves through.
///
/// Initial state is [ClientState::Unknown]; the only terminal state (self-stop) is reached by
/// successful completion of [ClientState::Testing].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClientState {
    Unknown,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Testing,
}

impl ClientState {
    /// Lower-cased name, used verbatim in `SignalInIllegalState` replies.
    pub fn as_lowercase_str(&self) -> &'static str {
        match self {
            ClientState::Unknown => "unknown",
            ClientState::Connecting => "connecting",
            ClientState::Connected => "connected",
            ClientState::Disconnecting => "disconnecting",
            ClientState::Disconnected => "disconnected",
            ClientState::Testing => "testing",
        }
    }
}

/// What the client has actually observed about the remote endpoint, as opposed to what its
/// owner desires ([DesiredStatus]).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObservedStatus {
    Open,
    Closed,
    Failed,
    Unknown,
}

/// Free-text description of the current status, with the time it was recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusDetails {
    pub description: String,
    pub recorded_at: Timestamp,
}

/// Identifies who issued the last state-changing command, so the reply can be addressed back.
///
/// `None` means no command has been processed yet (the connection was created internally, not
/// in response to a command from the bus).
pub type Origin = Option<String>;

/// Immutable snapshot of a connection's observable state plus the context needed to reply to
/// the command that produced it.
///
/// Always replaced as a whole on a transition; never mutated in place; this makes every state
/// transition a pure `(ClientData, Event) -> ClientData` function, easy to unit test in
/// isolation from the actor plumbing that drives it.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientData {
    pub connection_id: ConnectionId,
    pub connection: Connection,
    pub observed_status: ObservedStatus,
    pub desired_status: DesiredStatus,
    pub status_details: Option<StatusDetails>,
    pub in_status_since: Timestamp,
    pub origin: Origin,
    pub last_command_headers: Option<DittoHeaders>,
}

impl ClientData {
    pub fn new(connection: Connection, now: Timestamp) -> Self {
        let desired_status = connection.desired_status;
        ClientData {
            connection_id: connection.id.clone(),
            connection,
            observed_status: ObservedStatus::Unknown,
            desired_status,
            status_details: None,
            in_status_since: now,
            origin: None,
            last_command_headers: None,
        }
    }

    /// Replace the observed status, recording the transition time and an optional detail
    /// message; this is the only way `ClientData` changes — always a wholesale replacement,
    /// matching the invariant that it is never mutated field-by-field in place.
    pub fn with_observed_status(
        mut self,
        observed_status: ObservedStatus,
        description: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        self.observed_status = observed_status;
        self.status_details = Some(StatusDetails {
            description: description.into(),
            recorded_at: now,
        });
        self.in_status_since = now;
        self
    }

    pub fn with_origin(mut self, origin: Origin, headers: Option<DittoHeaders>) -> Self {
        self.origin = origin;
        self.last_command_headers = headers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Uri;

    fn sample_connection() -> Connection {
        Connection {
            id: "conn-1".to_string(),
            uri: Uri {
                host: "svc".to_string(),
                port: 80,
            },
            desired_status: DesiredStatus::Open,
            sources: vec![],
            targets: vec![],
            mapping_context: None,
            processor_pool_size: 1,
        }
    }

    #[test]
    fn new_client_data_starts_unknown_with_the_connections_desired_status() {
        use clock::Clock;
        let now = clock::WallClock.now();
        let data = ClientData::new(sample_connection(), now);
        assert_eq!(data.observed_status, ObservedStatus::Unknown);
        assert_eq!(data.desired_status, DesiredStatus::Open);
        assert!(data.origin.is_none());
    }

    #[test]
    fn with_observed_status_replaces_the_whole_snapshot() {
        use clock::Clock;
        let t0 = clock::WallClock.now();
        let data = ClientData::new(sample_connection(), t0);
        let t1 = t0 + time::Duration::seconds(1);
        let data = data.with_observed_status(ObservedStatus::Failed, "boom", t1);
        assert_eq!(data.observed_status, ObservedStatus::Failed);
        assert_eq!(data.in_status_since, t1);
        assert_eq!(data.status_details.unwrap().description, "boom");
    }

    #[test]
    fn state_names_are_lowercase_for_illegal_signal_replies() {
        assert_eq!(ClientState::Connecting.as_lowercase_str(), "connecting");
        assert_eq!(ClientState::Disconnected.as_lowercase_str(), "disconnected");
    }
}
