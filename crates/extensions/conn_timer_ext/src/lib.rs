//! A timer service: a client sends [SetTimeout], and receives the matching [Timeout] back once
//! `duration` has elapsed. Built on `tokio::time::sleep`, with no wheel or external scheduler —
//! one sleeping task per outstanding timeout.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use conn_actors::Message;
use conn_actors::Server;
use std::marker::PhantomData;
use std::time::Duration;

/// Ask for a [Timeout] carrying `event` back after `duration` elapses.
#[derive(Clone, Debug)]
pub struct SetTimeout<Event: Message> {
    pub duration: Duration,
    pub event: Event,
}

impl<Event: Message> SetTimeout<Event> {
    pub fn new(duration: Duration, event: Event) -> Self {
        SetTimeout { duration, event }
    }
}

/// The response to a [SetTimeout], delivered once `duration` has elapsed.
#[derive(Clone, Debug)]
pub struct Timeout<Event: Message> {
    pub event: Event,
}

/// A stateless timer service. Implemented as a [Server] so it can be driven by a
/// `ConcurrentServerActor`, letting independent timeouts elapse concurrently rather than
/// queueing behind whichever `SetTimeout` was requested first.
#[derive(Debug)]
pub struct TimerService<Event> {
    _event: PhantomData<Event>,
}

impl<Event> TimerService<Event> {
    pub fn new() -> Self {
        TimerService { _event: PhantomData }
    }
}

impl<Event> Default for TimerService<Event> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Event> Clone for TimerService<Event> {
    fn clone(&self) -> Self {
        TimerService { _event: PhantomData }
    }
}

#[async_trait]
impl<Event: Message + Clone> Server for TimerService<Event> {
    type Request = SetTimeout<Event>;
    type Response = Timeout<Event>;

    fn name(&self) -> &str {
        "Timer"
    }

    async fn handle(&mut self, request: SetTimeout<Event>) -> Timeout<Event> {
        tokio::time::sleep(request.duration).await;
        Timeout { event: request.event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Eq, PartialEq)]
    struct StateTimeoutFired;

    #[tokio::test]
    async fn a_timeout_is_delivered_after_its_duration_elapses() {
        let mut timer = TimerService::<StateTimeoutFired>::new();
        let response = timer
            .handle(SetTimeout::new(Duration::from_millis(1), StateTimeoutFired))
            .await;
        assert_eq!(response.event, StateTimeoutFired);
    }
}
