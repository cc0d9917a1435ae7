use crate::client::ObservedStatus;
use crate::client::StatusDetails;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// The observed success/failure count for one window, as reported by a
/// `SlidingWindowCounter`, plus the timestamp the window started at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub count: u64,
    pub window_start_epoch_millis: i64,
}

/// Per-window success and failure measurements for one address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddressMetric {
    pub status: ObservedStatusDto,
    pub status_details: Option<String>,
    pub in_status_since_epoch_millis: i64,
    pub success_measurements: BTreeMap<String, Measurement>,
    pub failure_measurements: BTreeMap<String, Measurement>,
}

/// A serde-friendly mirror of [ObservedStatus], since the latter has no serde impls (it is an
/// internal FSM detail, not a wire type).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ObservedStatusDto {
    Open,
    Closed,
    Failed,
    Unknown,
}

impl From<ObservedStatus> for ObservedStatusDto {
    fn from(status: ObservedStatus) -> Self {
        match status {
            ObservedStatus::Open => ObservedStatusDto::Open,
            ObservedStatus::Closed => ObservedStatusDto::Closed,
            ObservedStatus::Failed => ObservedStatusDto::Failed,
            ObservedStatus::Unknown => ObservedStatusDto::Unknown,
        }
    }
}

impl AddressMetric {
    pub fn from_status(status: ObservedStatus, details: &Option<StatusDetails>, in_status_since_epoch_millis: i64) -> Self {
        AddressMetric {
            status: status.into(),
            status_details: details.as_ref().map(|d| d.description.clone()),
            in_status_since_epoch_millis,
            success_measurements: BTreeMap::new(),
            failure_measurements: BTreeMap::new(),
        }
    }
}

/// `address -> AddressMetric` map, one instance for sources and one for targets.
pub type SourceMetrics = BTreeMap<String, AddressMetric>;
pub type TargetMetrics = BTreeMap<String, AddressMetric>;

/// The payload of a `RetrieveConnectionMetricsResponse`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionMetricsSnapshot {
    pub sources: SourceMetrics,
    pub targets: TargetMetrics,
}
