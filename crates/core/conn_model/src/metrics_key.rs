use crate::connection::ConnectionId;
use serde::Deserialize;
use serde::Serialize;

/// The reserved address used to aggregate response traffic that cannot be attributed to a
/// single configured [Source](crate::connection::Source) or [Target](crate::connection::Target).
///
/// Must never collide with a user-configured address.
pub const RESPONSES_ADDRESS: &str = "_responses";

/// What kind of event a counter tracks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Metric {
    Consumed,
    Mapped,
    Filtered,
    Dropped,
    Published,
}

/// Whether the counted event happened on the inbound (source) or outbound (target) side of a
/// connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Identifies one [SlidingWindowCounter](../conn_metrics/struct.SlidingWindowCounter.html) in
/// the registry: every counter is keyed by connection, metric kind, direction and address.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CounterKey {
    pub connection_id: ConnectionId,
    pub metric: Metric,
    pub direction: Direction,
    pub address: String,
}

impl CounterKey {
    pub fn new(
        connection_id: impl Into<ConnectionId>,
        metric: Metric,
        direction: Direction,
        address: impl Into<String>,
    ) -> Self {
        CounterKey {
            connection_id: connection_id.into(),
            metric,
            direction,
            address: address.into(),
        }
    }

    pub fn responses(
        connection_id: impl Into<ConnectionId>,
        metric: Metric,
        direction: Direction,
    ) -> Self {
        CounterKey::new(connection_id, metric, direction, RESPONSES_ADDRESS)
    }
}
