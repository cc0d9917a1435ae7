//! Builders used to construct actors and connect them to their peers before they run.
//!
//! An actor never exposes its internal message box structure. Instead its builder exposes
//! a sender peers can use to deliver input messages, and accepts the sender it should use
//! to deliver its own output, so actors can be wired together with no knowledge of how each
//! one organizes its mailboxes internally.

use crate::DynSender;
use crate::Message;
use crate::NullSender;
use crate::SimpleMessageBox;
use futures::channel::mpsc;

/// Builds a `T`, possibly failing.
pub trait Builder<T>: Sized {
    type Error: std::error::Error;

    /// Build the entity, or return an error.
    fn try_build(self) -> Result<T, Self::Error>;

    /// Build the entity, panicking on error.
    ///
    /// Builder errors are only raised by malformed wiring, which is a programming error,
    /// so the panic is appropriate outside of test code too.
    fn build(self) -> T {
        self.try_build()
            .unwrap_or_else(|err| panic!("failed to build the entity: {err}"))
    }
}

/// Placeholder config for builders with no specific connection parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoConfig;

/// Declares that a builder under construction provides a service for `Request`/`Response`
/// messages, configured per-consumer by a value of type `Config`.
///
/// The configuration value is supplied by the consumer to restrict or filter the scope of
/// the service provided to it (e.g. which topics of an address a source forwards).
pub trait ServiceProvider<Request: Message, Response: Message, Config> {
    /// Register a new consumer of this service.
    ///
    /// `response_sender` is where this service must send its responses to that consumer;
    /// the returned sender is where the consumer must send its requests.
    fn connect_consumer(
        &mut self,
        config: Config,
        response_sender: DynSender<Response>,
    ) -> DynSender<Request>;
}

/// A builder of [SimpleMessageBox](crate::SimpleMessageBox) instances.
pub struct SimpleMessageBoxBuilder<Input, Output> {
    name: String,
    input_sender: mpsc::Sender<Input>,
    input_receiver: mpsc::Receiver<Input>,
    signal_sender: mpsc::Sender<crate::RuntimeRequest>,
    signal_receiver: mpsc::Receiver<crate::RuntimeRequest>,
    output_sender: DynSender<Output>,
}

impl<Input: Message, Output: Message> SimpleMessageBoxBuilder<Input, Output> {
    pub fn new(name: &str, capacity: usize) -> Self {
        let (input_sender, input_receiver) = mpsc::channel(capacity);
        let (signal_sender, signal_receiver) = mpsc::channel(4);
        SimpleMessageBoxBuilder {
            name: name.to_string(),
            input_sender,
            input_receiver,
            signal_sender,
            signal_receiver,
            output_sender: Box::new(NullSender),
        }
    }

    /// Return a sender peers can use to deliver input messages to the box under construction.
    pub fn sender(&self) -> DynSender<Input> {
        Box::new(self.input_sender.clone())
    }

    /// Return a sender peers can use to deliver runtime requests with priority.
    pub fn signal_sender(&self) -> DynSender<crate::RuntimeRequest> {
        Box::new(self.signal_sender.clone())
    }

    /// Tell this box where to send its output messages.
    pub fn set_output(&mut self, output_sender: DynSender<Output>) {
        self.output_sender = output_sender;
    }

    /// Connect this box, as the sole consumer of the given service provider: the provider
    /// learns where to send its responses, and this box is wired to send its requests there.
    pub fn with_connection<Config>(
        mut self,
        provider: &mut impl ServiceProvider<Output, Input, Config>,
        config: Config,
    ) -> Self {
        let response_sender = self.sender();
        self.output_sender = provider.connect_consumer(config, response_sender);
        self
    }

    pub fn build(self) -> SimpleMessageBox<Input, Output> {
        SimpleMessageBox::new(
            self.name,
            crate::CombinedReceiver::new(self.input_receiver, self.signal_receiver),
            self.output_sender,
        )
    }
}

impl<Req: Message, Res: Message> Builder<SimpleMessageBox<Req, Res>>
    for SimpleMessageBoxBuilder<Req, Res>
{
    type Error = std::convert::Infallible;

    fn try_build(self) -> Result<SimpleMessageBox<Req, Res>, Self::Error> {
        Ok(self.build())
    }
}

/// A box builder is itself the simplest possible service provider: a single consumer connects,
/// handing over where its responses should go and receiving the sender to submit its requests
/// on. Later connections simply replace the prior consumer's output wiring, so this is only
/// appropriate for single-consumer services (a client's private timer, a test harness box, …);
/// multi-consumer services need `ClientId`-tagged demultiplexing instead.
impl<Req: Message, Res: Message, Config> ServiceProvider<Req, Res, Config>
    for SimpleMessageBoxBuilder<Req, Res>
{
    fn connect_consumer(&mut self, _config: Config, response_sender: DynSender<Res>) -> DynSender<Req> {
        self.set_output(response_sender);
        self.sender()
    }
}

/// Lets a builder declare the runtime signal sender of the actor it builds, so the runtime
/// can deliver shutdown requests to it.
pub trait RuntimeRequestSink {
    fn get_signal_sender(&self) -> DynSender<crate::RuntimeRequest>;
}
