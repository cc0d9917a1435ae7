use async_trait::async_trait;
use clock::Timestamp;
use conn_metrics::MetricsRegistry;
use conn_model::client::ClientData;
use conn_model::connection::Connection;
use conn_model::error::ConnectivityError;
use conn_model::metrics::AddressMetric;
use conn_model::metrics::SourceMetrics;
use conn_model::metrics::TargetMetrics;
use conn_model::metrics_key::Direction;
use conn_publisher::PublishTransport;
use dashmap::DashMap;

/// The protocol-specific behavior a [BaseClient](crate::BaseClient) is generic over: everything
/// that actually touches the network, injected as a type parameter (not a trait object) so the
/// common single-transport-per-binary case pays no dynamic dispatch overhead.
///
/// One implementation per protocol (HTTP push lives in `conn_http_push`); `BaseClient` itself
/// knows nothing about wire formats, only how to sequence calls into these five hooks plus
/// [new_publish_transport](Self::new_publish_transport).
#[async_trait]
pub trait ConnectionTransport: Send + Sync + 'static {
    /// The [PublishTransport] this protocol hands to `conn_publisher` for the publisher pool.
    type PublishTransport: PublishTransport;

    /// Establish the connection. Run off the event loop; its outcome is delivered back as
    /// `ClientConnected` / `ConnectionFailure`.
    async fn do_connect(&self, connection: &Connection) -> Result<(), ConnectivityError>;

    /// Tear the connection down. Always followed by `ClientDisconnected`, even on `Err` (logged,
    /// not escalated: a client already on its way out has nowhere better to report to).
    async fn do_disconnect(&self, connection: &Connection) -> Result<(), ConnectivityError>;

    /// The transport half of `TestConnection`, run concurrently with mapper construction.
    async fn do_test_connection(&self, connection: &Connection) -> Result<(), ConnectivityError>;

    /// Build a fresh publish transport for `connection`, one per `do_connect` (and again per
    /// `ModifyConnection`, since the publisher pool is always rebuilt from scratch on reconnect).
    fn new_publish_transport(&self, connection: &Connection) -> Self::PublishTransport;

    /// Aggregate the configured sources' metrics. The default zero-seeds every configured source
    /// address absent from the registry (no traffic observed yet) with the connection's current
    /// observed status, then overlays whatever the registry actually recorded. Transports whose
    /// protocol exposes richer native per-address statistics may override this.
    fn get_source_metrics(&self, data: &ClientData, registry: &MetricsRegistry, now: Timestamp) -> SourceMetrics {
        seeded_address_metrics(
            data,
            registry,
            Direction::Inbound,
            data.connection.sources.iter().map(|source| source.address.as_str()),
            now,
        )
    }

    /// Same as [get_source_metrics](Self::get_source_metrics), for the configured targets.
    fn get_target_metrics(&self, data: &ClientData, registry: &MetricsRegistry, now: Timestamp) -> TargetMetrics {
        seeded_address_metrics(
            data,
            registry,
            Direction::Outbound,
            data.connection.targets.iter().map(|target| target.address.as_str()),
            now,
        )
    }
}

fn seeded_address_metrics<'a>(
    data: &ClientData,
    registry: &MetricsRegistry,
    direction: Direction,
    configured_addresses: impl Iterator<Item = &'a str>,
    now: Timestamp,
) -> std::collections::BTreeMap<String, AddressMetric> {
    let statuses: DashMap<String, _> = configured_addresses
        .map(|address| {
            (
                address.to_string(),
                (data.observed_status, data.status_details.clone(), data.in_status_since),
            )
        })
        .collect();

    let mut aggregated = match direction {
        Direction::Inbound => registry.aggregate_sources(&data.connection_id, &statuses, now),
        Direction::Outbound => registry.aggregate_targets(&data.connection_id, &statuses, now),
    };

    for address in statuses.iter().map(|entry| entry.key().clone()) {
        aggregated.entry(address).or_insert_with(|| {
            AddressMetric::from_status(
                data.observed_status,
                &data.status_details,
                data.in_status_since.unix_timestamp() * 1000,
            )
        });
    }
    aggregated
}
