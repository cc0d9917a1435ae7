use crate::ChannelError;
use crate::ClientId;
use crate::ConcurrentServerMessageBox;
use crate::Message;
use crate::ServerMessageBox;
use async_trait::async_trait;

/// Enables a struct to be run as an actor by the [Runtime](crate::Runtime).
///
/// The actor owns its message box as a field and drives its own event loop in [run](Actor::run):
/// processing input messages in turn, updating internal state, and sending output messages.
#[async_trait]
pub trait Actor: 'static + Sized + Send + Sync {
    /// Name used for logging and task identification.
    fn name(&self) -> &str;

    /// Run the actor to completion: normal return means the actor's inputs were exhausted.
    async fn run(&mut self) -> Result<(), ChannelError>;
}

/// An actor that wraps a request-response [Server], processing requests one at a time.
pub struct ServerActor<S: Server> {
    server: S,
    messages: ServerMessageBox<S::Request, S::Response>,
}

impl<S: Server> ServerActor<S> {
    pub fn new(server: S, messages: ServerMessageBox<S::Request, S::Response>) -> Self {
        ServerActor { server, messages }
    }
}

/// Defines how a server processes requests sent by client actors.
#[async_trait]
pub trait Server: 'static + Sized + Send + Sync {
    type Request: Message;
    type Response: Message;

    fn name(&self) -> &str;

    /// Handle one request, updating server state and returning the response.
    async fn handle(&mut self, request: Self::Request) -> Self::Response;
}

#[async_trait]
impl<S: Server> Actor for ServerActor<S> {
    fn name(&self) -> &str {
        self.server.name()
    }

    async fn run(&mut self) -> Result<(), ChannelError> {
        while let Some((client_id, request)) = self.messages.recv().await {
            let response = self.server.handle(request).await;
            self.messages.send((client_id, response)).await?;
        }
        Ok(())
    }
}

/// An actor that wraps a [Server] whose requests are handled concurrently, up to the message
/// box's configured concurrency limit.
pub struct ConcurrentServerActor<S: Server + Clone> {
    server: S,
    messages: ConcurrentServerMessageBox<S::Request, S::Response>,
}

impl<S: Server + Clone> ConcurrentServerActor<S> {
    pub fn new(server: S, messages: ConcurrentServerMessageBox<S::Request, S::Response>) -> Self {
        ConcurrentServerActor { server, messages }
    }
}

#[async_trait]
impl<S: Server + Clone> Actor for ConcurrentServerActor<S> {
    fn name(&self) -> &str {
        self.server.name()
    }

    async fn run(&mut self) -> Result<(), ChannelError> {
        while let Some((client_id, request)) = self.messages.recv().await {
            let mut server = self.server.clone();
            let pending: ClientId = client_id;
            let handle = tokio::spawn(async move {
                let response = server.handle(request).await;
                (pending, response)
            });
            self.messages.send_response_once_done(handle);
        }
        Ok(())
    }
}
