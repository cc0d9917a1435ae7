//! The publisher pipeline: a bounded queue of outbound signals, a protocol-specific transport
//! that turns each into a request and sends it, and a per-publish result channel that completes
//! exactly once with an acknowledgement/command-response pair or a typed failure.
//!
//! This crate is transport-agnostic: it owns the queue, the backpressure policy (drop-newest)
//! and the metrics bookkeeping; [PublishTransport] supplies the protocol-specific request
//! construction, dispatch and response demultiplexing (see `conn_http_push` for the HTTP-push
//! specialization).

#![forbid(unsafe_code)]

mod context;
mod pipeline;
mod transport;

pub use context::PublishContext;
pub use context::PublishOutcome;
pub use pipeline::PublisherHandle;
pub use pipeline::PublisherPipeline;
pub use transport::PublishTransport;
