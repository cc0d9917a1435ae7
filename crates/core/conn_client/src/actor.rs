use crate::fsm::Action;
use crate::fsm::BaseClientFsm;
use crate::fsm::Input;
use crate::transport::ConnectionTransport;
use async_trait::async_trait;
use clock::Clock;
use conn_actors::Actor;
use conn_actors::Builder;
use conn_actors::ChannelError;
use conn_actors::CloneSender;
use conn_actors::DynSender;
use conn_actors::RuntimeRequest;
use conn_actors::RuntimeRequestSink;
use conn_actors::Sender;
use conn_actors::SimpleMessageBox;
use conn_actors::SimpleMessageBoxBuilder;
use conn_metrics::MetricsRegistry;
use conn_model::command::ClientCommand;
use conn_model::command::ClientEvent;
use conn_model::command::ClientReply;
use conn_model::connection::Connection;
use conn_model::connection::ConnectionId;
use conn_model::connection::ConnectivityConfig;
use conn_model::connection::DittoHeaders;
use conn_model::mapper::MessageMapper;
use conn_model::mapper::MessageMapperFactory;
use conn_model::metrics::ConnectionMetricsSnapshot;
use conn_publisher::PublisherHandle;
use conn_publisher::PublisherPipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

impl From<ClientCommand> for Input {
    fn from(command: ClientCommand) -> Self {
        Input::Command(command)
    }
}

impl From<ClientEvent> for Input {
    fn from(event: ClientEvent) -> Self {
        Input::Event(event)
    }
}

/// Output of a client, addressed by the connection it concerns so a demultiplexing peer can
/// route the reply without itself knowing which client produced it.
pub type ClientOutput = (ConnectionId, ClientReply);

/// Builds a [BaseClient] and the wiring peers need to talk to it.
pub struct ClientBuilder<T: ConnectionTransport> {
    connection: Connection,
    transport: Arc<T>,
    mapper_factory: Arc<dyn MessageMapperFactory>,
    config: ConnectivityConfig,
    metrics: MetricsRegistry,
    clock: Arc<dyn Clock>,
    box_builder: SimpleMessageBoxBuilder<Input, ClientOutput>,
}

impl<T: ConnectionTransport> ClientBuilder<T> {
    pub fn new(
        connection: Connection,
        transport: T,
        mapper_factory: Arc<dyn MessageMapperFactory>,
        config: ConnectivityConfig,
        metrics: MetricsRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let name = format!("BaseClient({})", connection.id);
        ClientBuilder {
            connection,
            transport: Arc::new(transport),
            mapper_factory,
            config,
            metrics,
            clock,
            box_builder: SimpleMessageBoxBuilder::new(&name, 16),
        }
    }

    /// Sender peers use to deliver commands and events to the client under construction.
    pub fn sender(&self) -> DynSender<Input> {
        self.box_builder.sender()
    }

    /// Tell the client where to send its replies.
    pub fn set_output(&mut self, output_sender: DynSender<ClientOutput>) {
        self.box_builder.set_output(output_sender);
    }
}

impl<T: ConnectionTransport> RuntimeRequestSink for ClientBuilder<T> {
    fn get_signal_sender(&self) -> DynSender<RuntimeRequest> {
        self.box_builder.signal_sender()
    }
}

impl<T: ConnectionTransport> Builder<BaseClient<T>> for ClientBuilder<T> {
    type Error = std::convert::Infallible;

    fn try_build(self) -> Result<BaseClient<T>, Self::Error> {
        let self_sender = self.box_builder.sender();
        let now = self.clock.now();
        Ok(BaseClient {
            fsm: BaseClientFsm::new(self.connection, now),
            transport: self.transport,
            mapper_factory: self.mapper_factory,
            config: self.config,
            metrics: self.metrics,
            clock: self.clock,
            messages: self.box_builder.build(),
            self_sender,
            state_timeout: None,
            mapper: None,
            publisher: None,
            publisher_monitor: None,
        })
    }
}

/// One Tokio task per connection, driving a [BaseClientFsm] and performing the side effects
/// ([Action]s) it returns: TCP pre-check, connect/disconnect/test, mapper construction, the
/// publisher pool, and the state-timeout.
///
/// Generic over [ConnectionTransport] rather than holding a `dyn` trait object: a process
/// embedding this crate picks one transport per binary, so the indirection buys nothing but
/// cost.
pub struct BaseClient<T: ConnectionTransport> {
    fsm: BaseClientFsm,
    transport: Arc<T>,
    mapper_factory: Arc<dyn MessageMapperFactory>,
    config: ConnectivityConfig,
    metrics: MetricsRegistry,
    clock: Arc<dyn Clock>,
    messages: SimpleMessageBox<Input, ClientOutput>,
    self_sender: DynSender<Input>,

    /// Aborted and replaced on every `InstallStateTimeout`; aborted and cleared on every
    /// `CancelStateTimeout`. Rendered as a directly spawned `tokio::time::sleep`-backed task
    /// rather than wired through `conn_timer_ext`'s request/response service: this client has
    /// at most one outstanding timeout at a time, so the extra `ClientMessageBox` demultiplexing
    /// machinery buys nothing (see DESIGN.md).
    state_timeout: Option<JoinHandle<()>>,

    /// Present from a successful `StartMapper` until the matching `StopMapper`.
    mapper: Option<Box<dyn MessageMapper>>,

    /// The handle signal-bus dispatch uses to publish outbound signals once connected.
    publisher: Option<PublisherHandle<T::PublishTransport>>,

    /// Watches the publisher pool's termination future; aborted before a deliberate
    /// `StopMapper` so that tearing down the pool ourselves never looks like a catastrophic
    /// stream failure.
    publisher_monitor: Option<JoinHandle<()>>,
}

#[async_trait]
impl<T: ConnectionTransport> Actor for BaseClient<T> {
    fn name(&self) -> &str {
        self.messages.name()
    }

    async fn run(&mut self) -> Result<(), ChannelError> {
        self.self_send(Input::Event(ClientEvent::InitTimeout)).await;

        while let Some(input) = self.messages.recv().await {
            let input = match input {
                Input::Command(ClientCommand::RetrieveConnectionMetrics { ditto_headers }) => {
                    self.reply_metrics(ditto_headers).await?;
                    continue;
                }
                other => other,
            };

            let now = self.clock.now();
            let actions = self.fsm.apply(input, now);
            let mut should_stop = false;
            for action in actions {
                if matches!(action, Action::Stop) {
                    should_stop = true;
                    continue;
                }
                self.execute(action).await?;
            }
            if should_stop {
                break;
            }
        }
        Ok(())
    }
}

impl<T: ConnectionTransport> BaseClient<T> {
    async fn execute(&mut self, action: Action) -> Result<(), ChannelError> {
        match action {
            Action::Reply(reply) => {
                let connection_id = self.fsm.data.connection_id.clone();
                self.messages.send((connection_id, reply)).await?;
            }
            Action::SelfSend(command) => self.self_send(Input::Command(command)).await,
            Action::RunPrecheck => self.run_precheck(),
            Action::RunConnect => self.run_connect(),
            Action::RunDisconnect => self.run_disconnect(),
            Action::RunTest => self.run_test(),
            Action::StartMapper => self.start_mapper(),
            Action::StopMapper => self.stop_mapper(),
            Action::InstallStateTimeout => self.install_state_timeout(),
            Action::CancelStateTimeout => self.cancel_state_timeout(),
            Action::Stop => unreachable!("Stop is drained by the caller before execute is reached"),
        }
        Ok(())
    }

    async fn self_send(&mut self, input: Input) {
        let _ = self.self_sender.send(input).await;
    }

    async fn reply_metrics(&mut self, ditto_headers: DittoHeaders) -> Result<(), ChannelError> {
        // The reply carries no headers of its own (see `ClientReply::RetrieveConnectionMetricsResponse`);
        // the query's headers only ever mattered for routing, already handled by the caller.
        let _ = ditto_headers;
        let now = self.clock.now();
        let sources = self.transport.get_source_metrics(&self.fsm.data, &self.metrics, now);
        let targets = self.transport.get_target_metrics(&self.fsm.data, &self.metrics, now);
        let connection_id = self.fsm.data.connection_id.clone();
        self.messages
            .send((
                connection_id.clone(),
                ClientReply::RetrieveConnectionMetricsResponse {
                    connection_id,
                    metrics: ConnectionMetricsSnapshot { sources, targets },
                },
            ))
            .await
    }

    fn run_precheck(&mut self) {
        let host_port = self.fsm.data.connection.uri.host_port();
        let timeout = Duration::from_secs(self.config.tcp_precheck_timeout_secs);
        let mut sender = self.self_sender.sender_clone();
        tokio::spawn(async move {
            let input = match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&host_port)).await {
                Ok(Ok(_)) => Input::PrecheckSucceeded,
                Ok(Err(error)) => Input::PrecheckFailed(format!("{host_port} unreachable: {error}")),
                Err(_) => Input::PrecheckFailed(format!("{host_port} unreachable: timed out after {timeout:?}")),
            };
            let _ = sender.send(input).await;
        });
    }

    fn run_connect(&mut self) {
        let transport = self.transport.clone();
        let connection = self.fsm.data.connection.clone();
        let mut sender = self.self_sender.sender_clone();
        tokio::spawn(async move {
            let input = match transport.do_connect(&connection).await {
                Ok(()) => Input::Event(ClientEvent::ClientConnected),
                Err(error) => Input::Event(ClientEvent::ConnectionFailure {
                    origin: None,
                    description: error.to_string(),
                }),
            };
            let _ = sender.send(input).await;
        });
    }

    fn run_disconnect(&mut self) {
        let transport = self.transport.clone();
        let connection = self.fsm.data.connection.clone();
        let mut sender = self.self_sender.sender_clone();
        tokio::spawn(async move {
            if let Err(error) = transport.do_disconnect(&connection).await {
                log::warn!(target: "BaseClient", "do_disconnect for {} failed: {error}", connection.id);
            }
            let _ = sender.send(Input::Event(ClientEvent::ClientDisconnected)).await;
        });
    }

    fn run_test(&mut self) {
        let transport = self.transport.clone();
        let mapper_factory = self.mapper_factory.clone();
        let connection = self.fsm.data.connection.clone();
        let mut sender = self.self_sender.sender_clone();
        tokio::spawn(async move {
            let mapper_check = async {
                mapper_factory
                    .try_new(&connection.id, connection.mapping_context.as_ref())
                    .map(|_mapper| ())
            };
            let (transport_outcome, mapper_outcome) = tokio::join!(transport.do_test_connection(&connection), mapper_check);
            let _ = sender.send(Input::TestOutcome(transport_outcome.and(mapper_outcome))).await;
        });
    }

    fn start_mapper(&mut self) {
        let connection = self.fsm.data.connection.clone();
        match self.mapper_factory.try_new(&connection.id, connection.mapping_context.as_ref()) {
            Ok(mapper) => {
                self.mapper = Some(mapper);

                let publish_transport = self.transport.new_publish_transport(&connection);
                let (handle, pipeline) = PublisherPipeline::spawn(
                    connection.id.clone(),
                    publish_transport,
                    self.config.max_queue_size,
                    connection.processor_pool_size,
                    self.metrics.clone(),
                    self.clock.clone(),
                );

                let mut monitor_sender = self.self_sender.sender_clone();
                let monitor = tokio::spawn(async move {
                    if let Err(join_error) = pipeline.termination().await {
                        let _ = monitor_sender
                            .send(Input::Event(ClientEvent::ConnectionFailure {
                                origin: None,
                                description: format!("publisher pool terminated unexpectedly: {join_error}"),
                            }))
                            .await;
                    }
                });

                self.publisher = Some(handle);
                self.publisher_monitor = Some(monitor);
            }
            Err(error) => {
                let mut sender = self.self_sender.sender_clone();
                tokio::spawn(async move {
                    let _ = sender
                        .send(Input::Event(ClientEvent::ConnectionFailure {
                            origin: None,
                            description: error.to_string(),
                        }))
                        .await;
                });
            }
        }
    }

    fn stop_mapper(&mut self) {
        self.mapper = None;
        // Abort the watcher first: tearing the pool down ourselves must never be mistaken for
        // the catastrophic termination it otherwise watches for.
        if let Some(monitor) = self.publisher_monitor.take() {
            monitor.abort();
        }
        // Dropping the last `PublisherHandle` drops its queue sender, closing the queue and
        // letting the worker pool drain and stop on its own.
        self.publisher = None;
    }

    fn install_state_timeout(&mut self) {
        self.cancel_state_timeout();
        let duration = Duration::from_secs(self.config.connecting_timeout_secs);
        let mut sender = self.self_sender.sender_clone();
        self.state_timeout = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = sender.send(Input::Event(ClientEvent::StateTimeout)).await;
        }));
    }

    fn cancel_state_timeout(&mut self) {
        if let Some(handle) = self.state_timeout.take() {
            handle.abort();
        }
    }
}
