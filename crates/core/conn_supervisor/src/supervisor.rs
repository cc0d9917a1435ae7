//! Spawn, restart and shut down one [BaseClient] per configured [Connection].
//!
//! This is the "Supervisor glue" of §4.7: intentionally thin, a restart policy and some
//! lifecycle bookkeeping sitting on top of [conn_actors::Runtime], not a scheduler.

use clock::Clock;
use conn_actors::futures::channel::mpsc;
use conn_actors::futures::StreamExt;
use conn_actors::DynSender;
use conn_actors::Runtime;
use conn_actors::RuntimeError;
use conn_actors::RuntimeEvent;
use conn_actors::RuntimeHandle;
use conn_actors::Sender;
use conn_client::ClientBuilder;
use conn_client::ClientOutput;
use conn_client::ConnectionTransport;
use conn_client::Input;
use conn_metrics::MetricsRegistry;
use conn_model::command::ClientCommand;
use conn_model::connection::Connection;
use conn_model::connection::ConnectionId;
use conn_model::connection::ConnectivityConfig;
use conn_model::connection::DesiredStatus;
use conn_model::connection::DittoHeaders;
use conn_model::mapper::MessageMapperFactory;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Builds a protocol-specific [ConnectionTransport] for a [Connection].
///
/// A transport (e.g. `conn_http_push::HttpPushTransport`) is usually tied to one target's
/// configuration, not the whole `Connection` record; this trait is the seam the supervisor
/// uses to construct one per connection without itself knowing the protocol.
pub trait TransportFactory<T: ConnectionTransport>: Send + Sync + 'static {
    fn build(&self, connection: &Connection) -> T;
}

fn client_task_name(connection_id: &ConnectionId) -> String {
    format!("BaseClient({connection_id})")
}

fn connection_id_from_task_name(name: &str) -> Option<ConnectionId> {
    name.strip_prefix("BaseClient(")?.strip_suffix(')').map(str::to_string)
}

struct ConnectionEntry {
    connection: Connection,
    sender: DynSender<Input>,
}

/// Shared state reachable both from the `Supervisor` handle and from the background task that
/// watches for aborted clients and restarts them.
struct Shared<T: ConnectionTransport, F: TransportFactory<T>> {
    transport_factory: F,
    mapper_factory: Arc<dyn MessageMapperFactory>,
    config: ConnectivityConfig,
    metrics: MetricsRegistry,
    clock: Arc<dyn Clock>,
    output_sender: DynSender<ClientOutput>,
    connections: AsyncMutex<HashMap<ConnectionId, ConnectionEntry>>,
}

impl<T: ConnectionTransport, F: TransportFactory<T>> Shared<T, F> {
    async fn spawn_client(
        self: &Arc<Self>,
        runtime_handle: &mut RuntimeHandle,
        connection: Connection,
    ) -> Result<DynSender<Input>, RuntimeError> {
        let connection_id = connection.id.clone();
        let transport = self.transport_factory.build(&connection);
        let mut builder = ClientBuilder::new(
            connection.clone(),
            transport,
            self.mapper_factory.clone(),
            self.config.clone(),
            self.metrics.clone(),
            self.clock.clone(),
        );
        let sender = builder.sender();
        builder.set_output(self.output_sender.sender_clone());

        runtime_handle.spawn(&client_task_name(&connection_id), builder).await?;

        let mut connections = self.connections.lock().await;
        connections.insert(
            connection_id,
            ConnectionEntry {
                connection,
                sender: sender.sender_clone(),
            },
        );
        Ok(sender)
    }
}

/// Owns one [Runtime] and, for each configured [Connection], the [BaseClient](conn_client::BaseClient)
/// task (and, transitively, its publisher pool) that drives it.
///
/// Restart policy: when a client task aborts (a transport or mapper panic escaping its own
/// error handling — the ordinary failure paths never reach this far, see §7), the supervisor
/// logs it, strips the connection's metrics (a dead connection's counters would otherwise sit
/// in the registry forever), and respawns a fresh client from the connection record last seen,
/// provided its `desired_status` is still `Open`.
pub struct Supervisor<T: ConnectionTransport, F: TransportFactory<T>> {
    runtime: Runtime,
    shared: Arc<Shared<T, F>>,
}

impl<T: ConnectionTransport, F: TransportFactory<T>> Supervisor<T, F> {
    pub async fn try_new(
        transport_factory: F,
        mapper_factory: Arc<dyn MessageMapperFactory>,
        config: ConnectivityConfig,
        metrics: MetricsRegistry,
        clock: Arc<dyn Clock>,
        output_sender: DynSender<ClientOutput>,
    ) -> Result<Self, RuntimeError> {
        let (events_sender, events_receiver) = mpsc::channel(16);
        let runtime = Runtime::try_new(Some(Box::new(events_sender))).await?;

        let shared = Arc::new(Shared {
            transport_factory,
            mapper_factory,
            config,
            metrics,
            clock,
            output_sender,
            connections: AsyncMutex::new(HashMap::new()),
        });

        tokio::spawn(watch_events(events_receiver, runtime.get_handle(), shared.clone()));

        Ok(Supervisor { runtime, shared })
    }

    /// Spawn a client for `connection`. If a connection with the same id is already tracked,
    /// its bookkeeping entry is replaced (the previous task is left running — callers that mean
    /// to replace a connection should route through `ModifyConnection` on the existing client
    /// instead of calling this twice for the same id).
    pub async fn spawn_connection(&mut self, connection: Connection) -> Result<DynSender<Input>, RuntimeError> {
        let mut handle = self.runtime.get_handle();
        self.shared.spawn_client(&mut handle, connection).await
    }

    /// The sender a caller can use to deliver commands to a tracked connection's client.
    pub async fn sender_for(&self, connection_id: &ConnectionId) -> Option<DynSender<Input>> {
        let connections = self.shared.connections.lock().await;
        connections.get(connection_id).map(|entry| entry.sender.sender_clone())
    }

    /// Send `DeleteConnection` to the targeted client and stop tracking it.
    ///
    /// The client task itself is left running (this actor substrate only supports an
    /// all-actors broadcast shutdown, see `conn_actors::Runtime`): once untracked it is no
    /// longer a respawn candidate and holds no resources beyond its own idle task, reclaimed
    /// when the process's `Runtime` is shut down. See DESIGN.md for the rationale.
    pub async fn shutdown_connection(&mut self, connection_id: &ConnectionId) {
        let mut connections = self.shared.connections.lock().await;
        if let Some(mut entry) = connections.remove(connection_id) {
            let _ = entry
                .sender
                .send(Input::Command(ClientCommand::DeleteConnection {
                    ditto_headers: DittoHeaders::new(),
                }))
                .await;
        }
    }

    /// Broadcast a shutdown request to every running actor and wait for the runtime to drain.
    pub async fn shutdown(self) -> Result<(), RuntimeError> {
        let mut handle = self.runtime.get_handle();
        handle.shutdown().await?;
        self.runtime.run_to_completion().await
    }
}

async fn watch_events<T: ConnectionTransport, F: TransportFactory<T>>(
    mut events_receiver: mpsc::Receiver<RuntimeEvent>,
    mut runtime_handle: RuntimeHandle,
    shared: Arc<Shared<T, F>>,
) {
    while let Some(event) = events_receiver.next().await {
        match event {
            RuntimeEvent::Started { task } => {
                log::debug!(target: "Supervisor", "{task} started");
            }
            RuntimeEvent::Stopped { task } => {
                log::debug!(target: "Supervisor", "{task} stopped");
            }
            RuntimeEvent::Aborted { task, error } => {
                log::error!(target: "Supervisor", "{task} aborted: {error}");
                let Some(connection_id) = connection_id_from_task_name(&task) else {
                    continue;
                };
                shared.metrics.strip_for_connection(&connection_id);
                let stale = {
                    let mut connections = shared.connections.lock().await;
                    connections.remove(&connection_id)
                };
                if let Some(entry) = stale {
                    if entry.connection.desired_status == DesiredStatus::Open {
                        log::info!(target: "Supervisor", "respawning {connection_id} after abort");
                        if let Err(error) = shared.spawn_client(&mut runtime_handle, entry.connection).await {
                            log::error!(target: "Supervisor", "failed to respawn {connection_id}: {error}");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conn_model::connection::DesiredStatus;
    use conn_model::connection::Source;
    use conn_model::connection::Target;
    use conn_model::connection::Uri;
    use conn_model::error::ConnectivityError;
    use conn_model::mapper::MockMessageMapper;
    use conn_model::mapper::MockMessageMapperFactory;
    use conn_model::signal::AutoAckTarget;
    use conn_model::signal::CommandResponseOrAck;
    use conn_model::signal::ExternalMessage;
    use conn_model::signal::PublishTarget;
    use conn_model::signal::Signal;
    use conn_publisher::PublishTransport;
    use conn_model::command::ClientReply;

    struct NoopPublishTransport;

    #[async_trait]
    impl PublishTransport for NoopPublishTransport {
        type Request = ();
        type Response = ();

        async fn build_request(
            &self,
            _signal: &Signal,
            _auto_ack_target: Option<&AutoAckTarget>,
            _publish_target: &PublishTarget,
            _external_message: &ExternalMessage,
        ) -> Result<Self::Request, ConnectivityError> {
            Ok(())
        }

        async fn send(&self, _request: Self::Request) -> Result<Self::Response, ConnectivityError> {
            Ok(())
        }

        async fn to_outcome(
            &self,
            _signal: &Signal,
            _auto_ack_target: Option<&AutoAckTarget>,
            _response: Self::Response,
            _max_total_message_size: usize,
            _ack_size_quota: usize,
        ) -> Result<CommandResponseOrAck, ConnectivityError> {
            unreachable!("not exercised by these tests")
        }
    }

    #[derive(Clone)]
    struct AlwaysOkTransport;

    #[async_trait]
    impl ConnectionTransport for AlwaysOkTransport {
        type PublishTransport = NoopPublishTransport;

        async fn do_connect(&self, _connection: &Connection) -> Result<(), ConnectivityError> {
            Ok(())
        }

        async fn do_disconnect(&self, _connection: &Connection) -> Result<(), ConnectivityError> {
            Ok(())
        }

        async fn do_test_connection(&self, _connection: &Connection) -> Result<(), ConnectivityError> {
            Ok(())
        }

        fn new_publish_transport(&self, _connection: &Connection) -> Self::PublishTransport {
            NoopPublishTransport
        }
    }

    struct AlwaysOkTransportFactory;

    impl TransportFactory<AlwaysOkTransport> for AlwaysOkTransportFactory {
        fn build(&self, _connection: &Connection) -> AlwaysOkTransport {
            AlwaysOkTransport
        }
    }

    fn mapper_factory_always_ok() -> Arc<dyn MessageMapperFactory> {
        let mut factory = MockMessageMapperFactory::new();
        factory.expect_try_new().returning(|_, _| Ok(Box::new(MockMessageMapper::new())));
        Arc::new(factory)
    }

    fn sample_connection(id: &str, desired_status: DesiredStatus) -> Connection {
        Connection {
            id: id.to_string(),
            uri: Uri {
                host: "127.0.0.1".to_string(),
                port: 1,
            },
            desired_status,
            sources: vec![Source {
                address: "a".to_string(),
                authorization_context: vec![],
                consumer_count: 1,
                filters: vec![],
            }],
            targets: vec![Target {
                address: "b".to_string(),
                topics: vec![],
                authorization_context: vec![],
            }],
            mapping_context: None,
            processor_pool_size: 1,
        }
    }

    #[tokio::test]
    async fn spawning_a_connection_tracks_it_and_returns_a_working_sender() {
        let (output_sender, _output_receiver) = mpsc::channel::<ClientOutput>(8);
        let mut supervisor = Supervisor::try_new(
            AlwaysOkTransportFactory,
            mapper_factory_always_ok(),
            ConnectivityConfig::default(),
            MetricsRegistry::new(),
            Arc::new(clock::WallClock),
            Box::new(output_sender),
        )
        .await
        .unwrap();

        let connection = sample_connection("conn-1", DesiredStatus::Closed);
        let sender = supervisor.spawn_connection(connection).await.unwrap();
        let _ = sender;

        assert!(supervisor.sender_for(&"conn-1".to_string()).await.is_some());
        assert!(supervisor.sender_for(&"conn-missing".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn shutdown_connection_untracks_it() {
        let (output_sender, mut output_receiver) = mpsc::channel::<ClientOutput>(8);
        let mut supervisor = Supervisor::try_new(
            AlwaysOkTransportFactory,
            mapper_factory_always_ok(),
            ConnectivityConfig::default(),
            MetricsRegistry::new(),
            Arc::new(clock::WallClock),
            Box::new(output_sender),
        )
        .await
        .unwrap();

        let connection = sample_connection("conn-1", DesiredStatus::Closed);
        supervisor.spawn_connection(connection).await.unwrap();

        supervisor.shutdown_connection(&"conn-1".to_string()).await;
        assert!(supervisor.sender_for(&"conn-1".to_string()).await.is_none());

        let (_, reply) = output_receiver.next().await.expect("a reply is sent");
        assert!(matches!(reply, ClientReply::Success { .. }));
    }
}
