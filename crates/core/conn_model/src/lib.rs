//! Data model shared by the client state machine, the publisher pipeline and the metrics
//! registry: connection configuration, client lifecycle snapshots, the signal/acknowledgement
//! shapes the publisher specializes over, and the typed error taxonomy.
//!
//! This crate owns no behavior — it is the vocabulary the other `conn_*` crates are built
//! against, kept dependency-light (`serde`, `thiserror`, `clock`) so it can sit at the bottom
//! of the dependency graph.

#![forbid(unsafe_code)]

pub mod client;
pub mod command;
pub mod connection;
pub mod error;
pub mod mapper;
pub mod metrics;
pub mod metrics_key;
pub mod signal;

pub use client::ClientData;
pub use client::ClientState;
pub use client::ObservedStatus;
pub use command::ClientCommand;
pub use command::ClientEvent;
pub use command::ClientReply;
pub use connection::Connection;
pub use connection::ConnectionId;
pub use connection::ConnectivityConfig;
pub use connection::DesiredStatus;
pub use connection::Source;
pub use connection::Target;
pub use error::ConnectivityError;
pub use mapper::MessageMapper;
pub use mapper::MessageMapperFactory;
pub use metrics_key::CounterKey;
pub use metrics_key::Direction;
pub use metrics_key::Metric;
pub use metrics_key::RESPONSES_ADDRESS;
pub use signal::Acknowledgement;
pub use signal::AutoAckTarget;
pub use signal::CommandResponseOrAck;
pub use signal::ExternalMessage;
pub use signal::ExternalPayload;
pub use signal::PublishTarget;
pub use signal::Signal;
pub use signal::DIAGNOSTIC_ACK_LABEL;
