//! A library to define, compose and run actors.
//!
//! ## Implementing an actor
//!
//! Actors are processing units that interact using asynchronous messages.
//!
//! The behavior of an [Actor] is defined by:
//! - a state owned and freely updated by the actor,
//! - a [message box](crate::message_boxes) connected to peer actors,
//! - input [messages](crate::Message) that the actor receives from its peers and processes in
//!   turn,
//! - output [messages](crate::Message) that the actor produces and sends to its peers,
//! - an event loop, the [Actor::run] method.
//!
//! ```
//! # use conn_actors::{Actor, ChannelError, SimpleMessageBox};
//! # use async_trait::async_trait;
//! #
//! /// State of the calculator actor along with its message box
//! struct Calculator {
//!     /// The actor state. Here a simple number.
//!     state: i64,
//!
//!     /// This actor uses a simple message box, receiving input messages and sending
//!     /// output messages independently of their producer or consumer.
//!     messages: SimpleMessageBox<Operation, Update>,
//! }
//!
//! /// Input messages of the calculator actor
//! #[derive(Debug, Eq, PartialEq)]
//! enum Operation {
//!     Add(i64),
//!     Multiply(i64),
//! }
//!
//! /// Output messages of the calculator actor
//! #[derive(Debug, Eq, PartialEq)]
//! struct Update {
//!     from: i64,
//!     to: i64,
//! }
//!
//! #[async_trait]
//! impl Actor for Calculator {
//!     fn name(&self) -> &str {
//!         "Calculator"
//!     }
//!
//!     async fn run(&mut self) -> Result<(), ChannelError> {
//!         while let Some(op) = self.messages.recv().await {
//!             let from = self.state;
//!             let to = match op {
//!                Operation::Add(x) => from + x,
//!                Operation::Multiply(x) => from * x,
//!             };
//!             self.state = to;
//!             self.messages.send(Update { from, to }).await?
//!         }
//!         Ok(())
//!     }
//! }
//! ```
//!
//! This crate provides specific `Actor` implementations:
//! - [ServerActor] wraps a [Server], implementing a request-response communication pattern
//!   with a set of connected client actors.
//! - [ConcurrentServerActor] is the same, processing requests concurrently.
//! - [ConvertingActor] wraps a [Converter], translating each input message into a sequence of
//!   output messages.
//!
//! ## Connecting actors
//!
//! Actors don't work in isolation: a key step before running them is wiring their message
//! boxes together, using [actor and message box builders](crate::builders).
//!
//! The [ServiceProvider] trait is implemented by the builder of any actor that provides a
//! request-response service: `connect_consumer` registers a new consumer's response sender
//! and returns the sender the consumer should use to submit requests.
//!
//! ```no_run
//! # use conn_actors::{DynSender, ServiceProvider};
//! # #[derive(Default)]
//! # struct SomeActorBuilder;
//! # #[derive(Debug)]
//! # struct SomeInput;
//! # #[derive(Debug)]
//! # struct SomeOutput;
//! # struct SomeConfig;
//! impl ServiceProvider<SomeInput, SomeOutput, SomeConfig> for SomeActorBuilder {
//!     fn connect_consumer(&mut self, config: SomeConfig, response_sender: DynSender<SomeOutput>)
//!         -> DynSender<SomeInput> {
//!          todo!()
//!      }
//! }
//! ```
//!
//! ## Running actors
//!
//! An [Actor] can [run](Actor::run) without any specific runtime. However, running the actors
//! of an application under the [Runtime] has several benefits:
//! - The runtime monitors all running actors, catching normal terminations, aborts and panics.
//! - The runtime can send a [RuntimeRequest] to all running actors, notably to trigger a
//!   graceful shutdown.
//! - An actor can subscribe to the [RuntimeEvent]s published by the runtime, to be notified of
//!   starts, terminations or crashes of its peers.
//!
//! ```no_run
//! # use std::convert::Infallible;
//! # use conn_actors::{Actor, Builder, ChannelError, DynSender, Runtime, RuntimeError, RuntimeRequest, RuntimeRequestSink};
//! struct MyActor;
//! #[derive(Default)]
//! struct MyActorBuilder;
//!
//! #[async_trait::async_trait]
//! impl Actor for MyActor {
//!    fn name(&self) -> &str {
//!         "MyActor"
//!     }
//!
//!     async fn run(&mut self) -> Result<(), ChannelError> {
//!         Ok(())
//!     }
//! }
//!
//! impl Builder<MyActor> for MyActorBuilder {
//!     type Error = Infallible;
//!
//!     fn try_build(self) -> Result<MyActor, Self::Error> {
//!         Ok(MyActor)
//!     }
//! }
//!
//! impl RuntimeRequestSink for MyActorBuilder {
//!     fn get_signal_sender(&self) -> DynSender<RuntimeRequest> {
//!        todo!()
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), RuntimeError> {
//! let mut runtime = Runtime::try_new(None).await?;
//! runtime.spawn("MyActor", MyActorBuilder).await?;
//! runtime.run_to_completion().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod actors;
pub mod builders;
pub mod channels;
pub mod converter;
mod errors;
pub mod message_boxes;
mod message;
pub mod runtime;

pub use actors::*;
pub use builders::*;
pub use channels::*;
pub use converter::*;
pub use errors::*;
pub use message::*;
pub use message_boxes::*;
pub use runtime::*;

pub use futures;

#[macro_use]
mod macros;
pub use macros::*;

#[cfg(test)]
mod tests;
