use std::fmt::Debug;

/// A message exchanged between two actors
///
/// Any type that is `Debug + Send + 'static` can be used as a message: no
/// specific trait needs to be derived by the application types that flow
/// between actors.
pub trait Message: Debug + Send + 'static {}

impl<T: Debug + Send + 'static> Message for T {}

/// A type used to mark an actor input or output that is never produced
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NoMessage {}
