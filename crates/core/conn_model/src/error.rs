use thiserror::Error;

/// Typed error taxonomy surfaced by the connectivity service.
///
/// Every error reported to a command origin, or completing a publish result, is one of these
/// variants — never a bare string or an opaque `anyhow::Error`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectivityError {
    /// A lifecycle command arrived while the client was in a state that cannot handle it.
    #[error("signal illegal in state {state}, retry within {timeout_secs}s")]
    SignalInIllegalState { state: String, timeout_secs: u64 },

    /// Transport-level failure establishing or maintaining a connection.
    #[error("connection to {host_port} failed: {description}")]
    ConnectionFailed {
        host_port: String,
        description: String,
    },

    /// `TestConnection` timed out, or the transport reported unreachability.
    #[error("connection unavailable: {description}")]
    ConnectionUnavailable { description: String },

    /// A publish-time failure: queue overflow, unknown status code, body size exceeded,
    /// stream terminated.
    #[error("message sending failed: {description}")]
    MessageSendingFailed { description: String },

    /// The configured mapper failed to initialize. Transient: the supervisor may retry.
    #[error("mapper configuration error: {description}")]
    MapperConfigurationError { description: String },

    /// Two subscribers declared the same acknowledgement label across the cluster.
    #[error("acknowledgement label {label} is not unique")]
    AcknowledgementLabelNotUnique { label: String },
}

impl ConnectivityError {
    pub fn signal_in_illegal_state(state: &str) -> Self {
        ConnectivityError::SignalInIllegalState {
            state: state.to_string(),
            timeout_secs: 10,
        }
    }

    pub fn connection_failed(host_port: impl Into<String>, description: impl Into<String>) -> Self {
        ConnectivityError::ConnectionFailed {
            host_port: host_port.into(),
            description: description.into(),
        }
    }

    pub fn message_sending_failed(description: impl Into<String>) -> Self {
        ConnectivityError::MessageSendingFailed {
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_in_illegal_state_always_carries_the_ten_second_hint() {
        let error = ConnectivityError::signal_in_illegal_state("connected");
        match error {
            ConnectivityError::SignalInIllegalState { state, timeout_secs } => {
                assert_eq!(state, "connected");
                assert_eq!(timeout_secs, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn connection_failed_carries_the_host_port() {
        let error = ConnectivityError::connection_failed("svc:80", "refused");
        assert_eq!(
            error.to_string(),
            "connection to svc:80 failed: refused"
        );
    }
}
