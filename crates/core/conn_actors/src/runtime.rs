//! Supervise the actors of an application
use crate::Actor;
use crate::Builder;
use crate::DynSender;
use crate::RuntimeError;
use crate::RuntimeRequestSink;
use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use futures::SinkExt;
use futures::StreamExt;
use log::debug;
use log::error;
use log::info;
use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Requests sent by the runtime to a running actor, delivered with priority over regular
/// input messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeRequest {
    Shutdown,
}

/// Events published by the runtime as actors start, stop, or crash.
#[derive(Debug)]
pub enum RuntimeEvent {
    Started { task: String },
    Stopped { task: String },
    Aborted { task: String, error: RuntimeError },
}

enum RuntimeAction {
    Spawn(BoxFuture<'static, Result<(), RuntimeError>>, String, DynSender<RuntimeRequest>),
    Shutdown,
}

/// The actor runtime: spawns actors as background tasks, watches them run to completion,
/// and can broadcast a shutdown request to all of them.
pub struct Runtime {
    handle: RuntimeHandle,
    bg_task: JoinHandle<()>,
}

impl Runtime {
    pub async fn try_new(
        events_sender: Option<DynSender<RuntimeEvent>>,
    ) -> Result<Runtime, RuntimeError> {
        let (actions_sender, actions_receiver) = mpsc::channel(16);
        let runtime_actor = RuntimeActor {
            actions: actions_receiver,
            events: events_sender,
            tasks: FuturesUnordered::new(),
            running_actors: HashMap::new(),
        };
        let bg_task = tokio::spawn(runtime_actor.run());
        Ok(Runtime {
            handle: RuntimeHandle { actions_sender },
            bg_task,
        })
    }

    pub fn get_handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Spawn an actor onto the runtime, registering its signal sender so it can be shut down.
    pub async fn spawn<T, A>(&mut self, name: &str, builder: T) -> Result<(), RuntimeError>
    where
        T: Builder<A> + RuntimeRequestSink,
        A: Actor,
    {
        self.handle.spawn(name, builder).await
    }

    /// Run until a `Shutdown` action is sent, or all handle clones have been dropped and all
    /// spawned actors have reached completion.
    pub async fn run_to_completion(self) -> Result<(), RuntimeError> {
        self.bg_task.await.map_err(|err| {
            if err.is_panic() {
                RuntimeError::RuntimePanic
            } else {
                RuntimeError::RuntimeCancellation
            }
        })
    }
}

/// A cloneable handle actors use to interact with the runtime that spawned them.
#[derive(Clone)]
pub struct RuntimeHandle {
    actions_sender: mpsc::Sender<RuntimeAction>,
}

impl RuntimeHandle {
    pub async fn shutdown(&mut self) -> Result<(), RuntimeError> {
        self.actions_sender
            .send(RuntimeAction::Shutdown)
            .await
            .map_err(RuntimeError::RuntimeSendError)
    }

    pub async fn spawn<T, A>(&mut self, name: &str, builder: T) -> Result<(), RuntimeError>
    where
        T: Builder<A> + RuntimeRequestSink,
        A: Actor,
    {
        let signal_sender = builder.get_signal_sender();
        let mut actor = builder.build();
        let task_name = name.to_string();
        let running = task_name.clone();
        let fut = async move {
            actor.run().await.map_err(RuntimeError::ChannelError)
        }
        .boxed();
        self.actions_sender
            .send(RuntimeAction::Spawn(fut, task_name, signal_sender))
            .await
            .map_err(RuntimeError::RuntimeSendError)?;
        debug!(target: "Runtime", "registered signal sender for {running}");
        Ok(())
    }
}

struct RuntimeActor {
    actions: mpsc::Receiver<RuntimeAction>,
    events: Option<DynSender<RuntimeEvent>>,
    tasks: FuturesUnordered<JoinHandle<(String, Result<(), RuntimeError>)>>,
    running_actors: HashMap<String, DynSender<RuntimeRequest>>,
}

impl RuntimeActor {
    async fn run(mut self) {
        info!(target: "Runtime", "started");
        loop {
            tokio::select! {
                action = self.actions.next() => {
                    match action {
                        Some(RuntimeAction::Spawn(fut, name, signal_sender)) => {
                            self.running_actors.insert(name.clone(), signal_sender);
                            self.send_event(RuntimeEvent::Started { task: name.clone() }).await;
                            let task_name = name.clone();
                            self.tasks.push(tokio::spawn(async move { (task_name, fut.await) }));
                        }
                        Some(RuntimeAction::Shutdown) => {
                            info!(target: "Runtime", "shutting down");
                            shutdown_actors(&mut self.running_actors).await;
                            break;
                        }
                        None => {
                            info!(target: "Runtime", "actions channel closed, stopping");
                            shutdown_actors(&mut self.running_actors).await;
                            break;
                        }
                    }
                }
                Some(result) = self.tasks.next(), if !self.tasks.is_empty() => {
                    self.handle_task_result(result).await;
                }
                else => break,
            }
        }
        while let Some(result) = self.tasks.next().await {
            self.handle_task_result(result).await;
        }
    }

    async fn handle_task_result(
        &mut self,
        result: Result<(String, Result<(), RuntimeError>), tokio::task::JoinError>,
    ) {
        match result {
            Ok((name, Ok(()))) => {
                self.running_actors.remove(&name);
                info!(target: "Runtime", "{name} stopped");
                self.send_event(RuntimeEvent::Stopped { task: name }).await;
            }
            Ok((name, Err(error))) => {
                self.running_actors.remove(&name);
                error!(target: "Runtime", "{name} aborted: {error}");
                self.send_event(RuntimeEvent::Aborted { task: name, error }).await;
            }
            Err(join_error) => {
                error!(target: "Runtime", "a task panicked: {join_error}");
            }
        }
    }

    async fn send_event(&mut self, event: RuntimeEvent) {
        if let Some(sender) = self.events.as_mut() {
            use crate::Sender;
            let _ = sender.send(event).await;
        }
    }
}

async fn shutdown_actors(running_actors: &mut HashMap<String, DynSender<RuntimeRequest>>) {
    use crate::Sender;
    for (name, sender) in running_actors.iter_mut() {
        match sender.send(RuntimeRequest::Shutdown).await {
            Ok(()) => info!(target: "Runtime", "sent shutdown request to {name}"),
            Err(error) => error!(target: "Runtime", "failed to send shutdown request to {name}: {error}"),
        }
    }
}
