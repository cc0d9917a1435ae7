//! Message boxes are the only way for actors to interact with each other.
//!
//! When an [Actor](crate::Actor) is spawned, it owns a message box that collects its input
//! [Messages](crate::Message) and forwards its output [Messages](crate::Message).
//!
//! Conceptually, a message box is a receiver of input messages combined with a sender of
//! output messages.
//! * The receiver is connected to the senders of peer actors; and reciprocally the sender is
//!   connected to receivers of peer actors.
//! * The receivers are [mpsc::Receiver] that collect messages from several sources, and
//!   deliver them to the actor in the order they were received.
//! * The senders are [DynSender] that adapt the messages sent to match the constraints of
//!   the receivers.
//!
//! A [SimpleMessageBox] implements exactly this conceptual view:
//!
//! ```ascii
//!                    input_senders: DynSender<Input> ...
//!
//!                                   │
//!         ┌─────────────────────────┴───────────────────────────┐
//!         │                         ▼                           │
//!         │         input_receiver: mpsc::Receiver<Input>       │
//!         │                                                     │
//!         │                         │                           │
//!         │                         ▼                           │
//!         │                    actor: Actor                     │
//!         │                                                     │
//!         │                         │                           │
//!         │                         ▼                           │
//!         │          output_sender: DynSender<Output>           │
//!         │                                                     │
//!         └─────────────────────────┬───────────────────────────┘
//!                                   │
//!                                   ▼
//!                output_receivers: mpsc::Receiver<Output> ...
//! ```
//!
//! This crate provides several built-in message box shapes:
//!
//! - [SimpleMessageBox] for actors that simply process messages in turn,
//! - [ServerMessageBox] for server actors that deliver a request-response service,
//! - [ConcurrentServerMessageBox] for server actors that process requests concurrently,
//! - [ClientMessageBox] for client actors that use a request-response service from a server
//!   actor.

use crate::ChannelError;
use crate::DynSender;
use crate::Message;
use crate::NoConfig;
use crate::RuntimeRequest;
use crate::ServiceProvider;
use crate::SimpleMessageBoxBuilder;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use log::debug;
use log::info;
use std::fmt::Debug;

/// Either a message or a [RuntimeRequest].
pub enum WrappedInput<Input> {
    Message(Input),
    RuntimeRequest(RuntimeRequest),
}

#[async_trait]
pub trait ReceiveMessages<Input> {
    /// Return the next received message if any, returning [RuntimeRequest]'s as errors.
    /// Returning a [RuntimeRequest] takes priority over messages.
    async fn try_recv(&mut self) -> Result<Option<Input>, RuntimeRequest>;

    /// Returns [Some] [WrappedInput] the next time a message is received. Returns [None] if
    /// the underlying channels are closed.
    async fn recv_message(&mut self) -> Option<WrappedInput<Input>>;

    /// Returns [Some] message the next time a message is received. Returns [None] if the
    /// underlying channels are closed, or if a [RuntimeRequest] is received first: handling a
    /// runtime request takes priority over delivering a message.
    async fn recv(&mut self) -> Option<Input>;
}

/// The basic message box: one input receiver, one output sender.
pub struct SimpleMessageBox<Input, Output> {
    name: String,
    input_receiver: CombinedReceiver<Input>,
    output_sender: DynSender<Output>,
    logging_is_on: bool,
}

impl<Input: Message, Output: Message> SimpleMessageBox<Input, Output> {
    pub fn new(
        name: String,
        input_receiver: CombinedReceiver<Input>,
        output_sender: DynSender<Output>,
    ) -> Self {
        SimpleMessageBox {
            name,
            input_receiver,
            output_sender,
            logging_is_on: true,
        }
    }

    pub async fn send(&mut self, message: Output) -> Result<(), ChannelError> {
        self.log_output(&message);
        self.output_sender.send(message).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn turn_logging_on(&mut self, on: bool) {
        self.logging_is_on = on;
    }

    fn log_input(&self, message: &impl Debug) {
        if self.logging_is_on {
            info!(target: &self.name, "recv {:?}", message);
        }
    }

    fn log_output(&self, message: &impl Debug) {
        if self.logging_is_on {
            debug!(target: &self.name, "send {:?}", message);
        }
    }
}

#[async_trait]
impl<Input: Message, Output: Message> ReceiveMessages<Input> for SimpleMessageBox<Input, Output> {
    async fn try_recv(&mut self) -> Result<Option<Input>, RuntimeRequest> {
        self.input_receiver.try_recv().await
    }

    async fn recv_message(&mut self) -> Option<WrappedInput<Input>> {
        self.input_receiver.recv_message().await
    }

    async fn recv(&mut self) -> Option<Input> {
        match self.input_receiver.recv().await {
            Some(message) => {
                self.log_input(&message);
                Some(message)
            }
            None => None,
        }
    }
}

/// Combines a regular input channel with a higher-priority runtime-request channel.
pub struct CombinedReceiver<Input> {
    input_receiver: mpsc::Receiver<Input>,
    signal_receiver: mpsc::Receiver<RuntimeRequest>,
}

impl<Input> CombinedReceiver<Input> {
    pub fn new(
        input_receiver: mpsc::Receiver<Input>,
        signal_receiver: mpsc::Receiver<RuntimeRequest>,
    ) -> Self {
        Self {
            input_receiver,
            signal_receiver,
        }
    }
}

#[async_trait]
impl<Input: Send> ReceiveMessages<Input> for CombinedReceiver<Input> {
    async fn try_recv(&mut self) -> Result<Option<Input>, RuntimeRequest> {
        match self.recv_message().await {
            Some(WrappedInput::Message(message)) => Ok(Some(message)),
            Some(WrappedInput::RuntimeRequest(runtime_request)) => Err(runtime_request),
            None => Ok(None),
        }
    }

    async fn recv_message(&mut self) -> Option<WrappedInput<Input>> {
        tokio::select! {
            biased;

            Some(runtime_request) = self.signal_receiver.next() => {
                Some(WrappedInput::RuntimeRequest(runtime_request))
            }
            Some(message) = self.input_receiver.next() => {
                Some(WrappedInput::Message(message))
            }
            else => None
        }
    }

    async fn recv(&mut self) -> Option<Input> {
        match self.recv_message().await {
            Some(WrappedInput::Message(message)) => Some(message),
            _ => None,
        }
    }
}

/// A message box for a request-response server.
pub type ServerMessageBox<Request, Response> =
    SimpleMessageBox<(ClientId, Request), (ClientId, Response)>;

/// Internal id assigned to a client actor of a server actor.
pub type ClientId = usize;

/// A message box for services that handle requests concurrently.
pub struct ConcurrentServerMessageBox<Request, Response> {
    max_concurrency: usize,
    clients: ServerMessageBox<Request, Response>,
    pending_responses: futures::stream::FuturesUnordered<PendingResult<(ClientId, Response)>>,
}

type PendingResult<R> = tokio::task::JoinHandle<R>;

impl<Request: Message, Response: Message> ConcurrentServerMessageBox<Request, Response> {
    pub fn new(max_concurrency: usize, clients: ServerMessageBox<Request, Response>) -> Self {
        ConcurrentServerMessageBox {
            max_concurrency,
            clients,
            pending_responses: futures::stream::FuturesUnordered::new(),
        }
    }

    pub async fn recv(&mut self) -> Option<(ClientId, Request)> {
        self.next_request().await
    }

    pub async fn send(&mut self, message: (ClientId, Response)) -> Result<(), ChannelError> {
        self.clients.send(message).await
    }

    async fn next_request(&mut self) -> Option<(ClientId, Request)> {
        self.await_idle_processor().await;
        loop {
            tokio::select! {
                Some(request) = self.clients.recv() => {
                    return Some(request);
                }
                Some(result) = self.pending_responses.next() => {
                    self.send_result(result).await;
                }
                else => {
                    return None
                }
            }
        }
    }

    async fn await_idle_processor(&mut self) {
        if self.pending_responses.len() >= self.max_concurrency {
            if let Some(result) = self.pending_responses.next().await {
                self.send_result(result).await;
            }
        }
    }

    pub fn send_response_once_done(&mut self, pending_result: PendingResult<(ClientId, Response)>) {
        self.pending_responses.push(pending_result);
    }

    async fn send_result(&mut self, result: Result<(ClientId, Response), tokio::task::JoinError>) {
        match result {
            Ok(response) => {
                let _ = self.clients.send(response).await;
            }
            Err(join_error) => {
                log::error!(target: self.clients.name(), "a request handler panicked: {join_error}");
            }
        }
    }
}

/// Client side handler of requests/responses sent to a service actor.
///
/// Note this message box sends requests and receives responses: from its own point of view,
/// `Request` is its output and `Response` is its input.
pub struct ClientMessageBox<Request, Response> {
    messages: SimpleMessageBox<Response, Request>,
}

impl<Request: Message, Response: Message> ClientMessageBox<Request, Response> {
    /// Create a new `ClientMessageBox` connected to the given service.
    pub fn new(
        client_name: &str,
        service: &mut impl ServiceProvider<Request, Response, NoConfig>,
    ) -> Self {
        let capacity = 1; // At most one response is ever expected at a time
        let messages = SimpleMessageBoxBuilder::new(client_name, capacity)
            .with_connection(service, NoConfig)
            .build();
        ClientMessageBox { messages }
    }

    /// Send the request and await the response.
    pub async fn await_response(&mut self, request: Request) -> Result<Response, ChannelError> {
        self.messages.send(request).await?;
        self.messages.recv().await.ok_or(ChannelError::ReceiveError())
    }
}
