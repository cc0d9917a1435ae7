use crate::Actor;
use crate::ChannelError;
use crate::NoConfig;
use crate::SimpleMessageBox;
use crate::SimpleMessageBoxBuilder;
use async_trait::async_trait;

/// An actor that uppercases each string it receives.
struct UppercaseConverter {
    messages: SimpleMessageBox<String, String>,
}

#[async_trait]
impl Actor for UppercaseConverter {
    fn name(&self) -> &str {
        "UppercaseConverter"
    }

    async fn run(&mut self) -> Result<(), ChannelError> {
        while let Some(input) = self.messages.recv().await {
            self.messages.send(input.to_uppercase()).await?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn an_actor_processes_its_input_messages_in_turn() {
    let mut actor_box_builder = SimpleMessageBoxBuilder::<String, String>::new("converter", 16);
    let mut test_box = SimpleMessageBoxBuilder::<String, String>::new("test", 16)
        .with_connection(&mut actor_box_builder, NoConfig)
        .build();
    let messages = actor_box_builder.build();
    let mut actor = UppercaseConverter { messages };
    tokio::spawn(async move { actor.run().await });

    for word in ["foo", "bar", "zoo"] {
        test_box.send(word.to_string()).await.unwrap();
        assert_eq!(test_box.recv().await, Some(word.to_uppercase()));
    }
}

#[tokio::test]
async fn dropping_the_test_box_stops_the_actor() {
    let mut actor_box_builder = SimpleMessageBoxBuilder::<String, String>::new("converter", 16);
    let test_box = SimpleMessageBoxBuilder::<String, String>::new("test", 16)
        .with_connection(&mut actor_box_builder, NoConfig)
        .build();
    let messages = actor_box_builder.build();
    let mut actor = UppercaseConverter { messages };
    let handle = tokio::spawn(async move { actor.run().await });

    drop(test_box);

    handle.await.unwrap().unwrap();
}
