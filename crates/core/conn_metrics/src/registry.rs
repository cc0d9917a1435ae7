use crate::sliding_window_counter::SlidingWindowCounter;
use clock::Timestamp;
use conn_model::client::ObservedStatus;
use conn_model::client::StatusDetails;
use conn_model::connection::ConnectionId;
use conn_model::metrics::AddressMetric;
use conn_model::metrics::SourceMetrics;
use conn_model::metrics::TargetMetrics;
use conn_model::metrics_key::CounterKey;
use conn_model::metrics_key::Direction;
use conn_model::metrics_key::Metric;
use dashmap::DashMap;
use std::sync::Arc;

/// Per-connection, per-address, per-(metric, direction) sliding-window counters.
///
/// Backed by a [DashMap] for lock-free concurrent get-or-create: many publisher and consumer
/// actors record against the same registry from different tasks, and none of them should block
/// on another's unrelated counter. Grounded on the actor registry pattern used across the wider
/// example pack rather than anything in the teacher itself, which has no component that shares
/// mutable state across tasks this way (see DESIGN.md).
#[derive(Clone)]
pub struct MetricsRegistry {
    counters: Arc<DashMap<CounterKey, SlidingWindowCounter>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        MetricsRegistry {
            counters: Arc::new(DashMap::new()),
        }
    }

    /// Record one event against the counter identified by `key`, creating it on first use.
    pub fn record(&self, key: CounterKey, success: bool, now: Timestamp) {
        self.counters
            .entry(key)
            .or_insert_with(SlidingWindowCounter::new)
            .increment(success, now);
    }

    pub fn consumed(&self, connection_id: &ConnectionId, address: &str, now: Timestamp) {
        self.record(
            CounterKey::new(connection_id.clone(), Metric::Consumed, Direction::Inbound, address),
            true,
            now,
        );
    }

    pub fn mapped(&self, connection_id: &ConnectionId, direction: Direction, address: &str, success: bool, now: Timestamp) {
        self.record(
            CounterKey::new(connection_id.clone(), Metric::Mapped, direction, address),
            success,
            now,
        );
    }

    pub fn filtered(&self, connection_id: &ConnectionId, direction: Direction, address: &str, now: Timestamp) {
        self.record(
            CounterKey::new(connection_id.clone(), Metric::Filtered, direction, address),
            true,
            now,
        );
    }

    pub fn dropped(&self, connection_id: &ConnectionId, direction: Direction, address: &str, now: Timestamp) {
        self.record(
            CounterKey::new(connection_id.clone(), Metric::Dropped, direction, address),
            true,
            now,
        );
    }

    pub fn published(&self, connection_id: &ConnectionId, address: &str, success: bool, now: Timestamp) {
        self.record(
            CounterKey::new(connection_id.clone(), Metric::Published, Direction::Outbound, address),
            success,
            now,
        );
    }

    /// Aggregate every `Inbound` counter for `connection_id` into one [AddressMetric] per
    /// source address. `statuses` supplies the observed status to attach to each address;
    /// addresses with no status entry fall back to [ObservedStatus::Unknown].
    pub fn aggregate_sources(
        &self,
        connection_id: &ConnectionId,
        statuses: &dashmap::DashMap<String, (ObservedStatus, Option<StatusDetails>, Timestamp)>,
        now: Timestamp,
    ) -> SourceMetrics {
        self.aggregate(connection_id, Direction::Inbound, statuses, now)
    }

    /// Same as [Self::aggregate_sources] but over `Outbound` counters, producing one entry per
    /// target address (plus the reserved `_responses` address when response traffic for this
    /// connection has been recorded).
    pub fn aggregate_targets(
        &self,
        connection_id: &ConnectionId,
        statuses: &dashmap::DashMap<String, (ObservedStatus, Option<StatusDetails>, Timestamp)>,
        now: Timestamp,
    ) -> TargetMetrics {
        self.aggregate(connection_id, Direction::Outbound, statuses, now)
    }

    fn aggregate(
        &self,
        connection_id: &ConnectionId,
        direction: Direction,
        statuses: &dashmap::DashMap<String, (ObservedStatus, Option<StatusDetails>, Timestamp)>,
        now: Timestamp,
    ) -> std::collections::BTreeMap<String, AddressMetric> {
        let mut result = std::collections::BTreeMap::new();
        for entry in self.counters.iter() {
            let key = entry.key();
            if &key.connection_id != connection_id || key.direction != direction {
                continue;
            }
            let address_metric = result.entry(key.address.clone()).or_insert_with(|| {
                let (status, details, in_status_since) = statuses
                    .get(&key.address)
                    .map(|entry| entry.value().clone())
                    .unwrap_or((ObservedStatus::Unknown, None, now));
                AddressMetric::from_status(status, &details, in_status_since.unix_timestamp() * 1000)
            });
            for (label, measurement) in entry.value().measurement(true, now) {
                address_metric.success_measurements.insert(
                    label.to_string(),
                    conn_model::metrics::Measurement {
                        count: measurement.count,
                        window_start_epoch_millis: measurement.window_start_epoch_millis,
                    },
                );
            }
            for (label, measurement) in entry.value().measurement(false, now) {
                address_metric.failure_measurements.insert(
                    label.to_string(),
                    conn_model::metrics::Measurement {
                        count: measurement.count,
                        window_start_epoch_millis: measurement.window_start_epoch_millis,
                    },
                );
            }
        }
        result
    }

    /// Remove every counter recorded for `connection_id`. Called once a connection is deleted,
    /// so its counters do not linger in the registry forever.
    pub fn strip_for_connection(&self, connection_id: &ConnectionId) {
        self.counters.retain(|key, _| &key.connection_id != connection_id);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.counters.len()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clock::Clock;

    #[test]
    fn record_creates_the_counter_on_first_use() {
        let registry = MetricsRegistry::new();
        let now = clock::WallClock.now();
        registry.consumed(&"conn-1".to_string(), "mqtt/topic", now);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn strip_for_connection_removes_only_that_connections_counters() {
        let registry = MetricsRegistry::new();
        let now = clock::WallClock.now();
        registry.consumed(&"conn-1".to_string(), "a", now);
        registry.consumed(&"conn-2".to_string(), "a", now);

        registry.strip_for_connection(&"conn-1".to_string());

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn aggregate_sources_reports_one_entry_per_address() {
        let registry = MetricsRegistry::new();
        let now = clock::WallClock.now();
        registry.consumed(&"conn-1".to_string(), "a", now);
        registry.consumed(&"conn-1".to_string(), "b", now);
        registry.dropped(&"conn-1".to_string(), Direction::Outbound, "b", now);

        let statuses = DashMap::new();
        let sources = registry.aggregate_sources(&"conn-1".to_string(), &statuses, now);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources["a"].success_measurements["1m"].count, 1);
    }
}
