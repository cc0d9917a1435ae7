//! Per-connection client spawn/restart/shutdown glue, plus the ambient tracing setup a binary
//! embedding this workspace needs.
//!
//! This crate is deliberately thin (§4.7): [Supervisor] owns one [conn_actors::Runtime] and
//! a restart policy for aborted client tasks. It is not a scheduler, a config loader, or a
//! persistence layer for `Connection` records — those are out of scope (§1).

#![forbid(unsafe_code)]

mod logging;
mod supervisor;

pub use logging::initialise_tracing_subscriber;
pub use supervisor::Supervisor;
pub use supervisor::TransportFactory;
