use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Opaque identifier of a configured [Connection].
pub type ConnectionId = String;

/// Whether the owner of a connection wants it open or closed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredStatus {
    Open,
    Closed,
}

/// An inbound address declaration: messages arriving here are mapped into signals and
/// dispatched to the bus.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub address: String,
    pub authorization_context: Vec<String>,
    pub consumer_count: usize,
    pub filters: Vec<String>,
}

/// An outbound address declaration: signals addressed here are mapped and published.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub address: String,
    pub topics: Vec<String>,
    pub authorization_context: Vec<String>,
}

/// Host and port of the transport endpoint a [Connection] talks to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Uri {
    pub host: String,
    pub port: u16,
}

impl Uri {
    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Immutable configuration of one connection between the signal bus and an external endpoint.
///
/// Replaced wholesale on `ModifyConnection`: there is no partial update, only a full
/// replacement semantically equivalent to delete-then-create.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub uri: Uri,
    pub desired_status: DesiredStatus,
    pub sources: Vec<Source>,
    pub targets: Vec<Target>,
    pub mapping_context: Option<serde_json::Value>,
    pub processor_pool_size: usize,
}

impl Connection {
    /// `processor_pool_size` must be at least one publisher worth of concurrency.
    pub fn with_minimum_pool_size(mut self) -> Self {
        if self.processor_pool_size == 0 {
            self.processor_pool_size = 1;
        }
        self
    }
}

/// Extra tunables that are not part of the connection record itself, but configure the
/// components built around one. Kept separate from [Connection] because these are
/// deployment-wide defaults, not per-connection configuration supplied by the connection owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    pub max_queue_size: usize,
    pub connecting_timeout_secs: u64,
    pub tcp_precheck_timeout_secs: u64,
    pub response_read_timeout_secs: u64,
    pub max_total_message_size: usize,
    pub ack_size_quota: usize,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        ConnectivityConfig {
            max_queue_size: 100,
            connecting_timeout_secs: 10,
            tcp_precheck_timeout_secs: 2,
            response_read_timeout_secs: 10,
            max_total_message_size: 256 * 1024,
            ack_size_quota: 100 * 1024,
        }
    }
}

/// Headers carried by a Ditto-style signal: free-form string map plus the well-known
/// correlation id used to route replies back to the command origin.
pub type DittoHeaders = BTreeMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_pool_size_is_normalized_to_one() {
        let connection = sample_connection().with_minimum_pool_size();
        assert_eq!(connection.processor_pool_size, 1);
    }

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
            processor_pool_size: 0,
        }
    }
}
