//! Actors that convert each input message into a sequence of output messages.
//!
//! A [Converter] turns one received input message into zero or more output messages. Wrapped
//! as a [ConvertingActor] it drives its message box until the input side is exhausted,
//! converting every message in turn.
//!
//! ```
//! # use std::convert::Infallible;
//! # use conn_actors::Converter;
//! # use conn_actors::ConvertingActor;
//! # use conn_actors::ChannelError;
//! # use conn_actors::SimpleMessageBoxBuilder;
//! struct Repeater;
//!
//! impl Converter for Repeater {
//!     type Input = (u8, i32);
//!     type Output = i32;
//!     type Error = Infallible;
//!
//!     fn convert(&mut self, input: &Self::Input) -> Result<Vec<Self::Output>, Self::Error> {
//!         let (n, msg) = *input;
//!         Ok(std::iter::repeat(msg).take(n as usize).collect())
//!     }
//! }
//! ```

use crate::Actor;
use crate::ChannelError;
use crate::Message;
use crate::SimpleMessageBox;
use async_trait::async_trait;

/// Converts each input message into a sequence of output messages.
pub trait Converter: 'static + Send + Sync {
    /// The input message type.
    type Input: Message;

    /// The output message type.
    type Output: Message;

    /// The type of conversion error.
    type Error: std::error::Error + Send + Sync;

    /// Convert an input message into a vector of output messages.
    fn convert(&mut self, input: &Self::Input) -> Result<Vec<Self::Output>, Self::Error>;
}

/// Wraps a [Converter] as a runnable [Actor].
///
/// Conversion errors are logged and dropped: a converter that cannot map a given input does
/// not stop the actor, it simply produces no output for that input.
pub struct ConvertingActor<C: Converter> {
    name: String,
    converter: C,
    message_box: SimpleMessageBox<C::Input, C::Output>,
}

impl<C: Converter> ConvertingActor<C> {
    pub fn new(name: &str, converter: C, message_box: SimpleMessageBox<C::Input, C::Output>) -> Self {
        ConvertingActor {
            name: name.to_string(),
            converter,
            message_box,
        }
    }
}

#[async_trait]
impl<C: Converter> Actor for ConvertingActor<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&mut self) -> Result<(), ChannelError> {
        while let Some(input) = self.message_box.recv().await {
            match self.converter.convert(&input) {
                Ok(outputs) => {
                    for output in outputs {
                        self.message_box.send(output).await?;
                    }
                }
                Err(error) => {
                    log::error!(target: &self.name, "dropping input, conversion failed: {error}");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimpleMessageBoxBuilder;
    use std::convert::Infallible;

    struct Repeater;

    impl Converter for Repeater {
        type Input = (u8, i32);
        type Output = i32;
        type Error = Infallible;

        fn convert(&mut self, input: &Self::Input) -> Result<Vec<Self::Output>, Self::Error> {
            let (n, msg) = *input;
            Ok(std::iter::repeat(msg).take(n as usize).collect())
        }
    }

    #[tokio::test]
    async fn converts_each_input_into_a_sequence_of_outputs() {
        let mut actor_box_builder = SimpleMessageBoxBuilder::<(u8, i32), i32>::new("repeater", 16);
        let mut test_box = SimpleMessageBoxBuilder::<i32, (u8, i32)>::new("test", 16)
            .with_connection(&mut actor_box_builder, crate::NoConfig)
            .build();
        let actor_box = actor_box_builder.build();
        let mut actor = ConvertingActor::new("repeater", Repeater, actor_box);
        tokio::spawn(async move { actor.run().await });

        test_box.send((3, 42)).await.unwrap();
        assert_eq!(test_box.recv().await, Some(42));
        assert_eq!(test_box.recv().await, Some(42));
        assert_eq!(test_box.recv().await, Some(42));

        test_box.send((0, 55)).await.unwrap();
        test_box.send((2, 1234)).await.unwrap();
        assert_eq!(test_box.recv().await, Some(1234));
        assert_eq!(test_box.recv().await, Some(1234));
    }
}
