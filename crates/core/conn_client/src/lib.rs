//! The connectivity client state machine: one task per connection.
//!
//! [fsm::BaseClientFsm] is the pure transition function; [actor::BaseClient] is the Tokio
//! actor that drives it, performing the side effects ([fsm::Action]) it returns against a
//! [transport::ConnectionTransport].

pub mod actor;
pub mod fsm;
pub mod transport;

pub use actor::BaseClient;
pub use actor::ClientBuilder;
pub use actor::ClientOutput;
pub use fsm::Action;
pub use fsm::BaseClientFsm;
pub use fsm::Input;
pub use transport::ConnectionTransport;
