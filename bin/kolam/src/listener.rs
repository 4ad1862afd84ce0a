use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, trace};
use tokio::time::sleep;
use transport::Topic;

use crate::{Handler, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    Dial,
    Established,
    Subscribed,
    Lost,
}

impl ListenerState {
    pub fn on(self, event: LinkEvent) -> Self {
        use ListenerState::*;

        match (self, event) {
            (_, LinkEvent::Dial) => Connecting,
            (Connecting, LinkEvent::Established) => Connected,
            (Connected, LinkEvent::Subscribed) => Subscribed,
            (_, LinkEvent::Lost) => Disconnected,
            (state, _) => state,
        }
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Subscribed => "subscribed",
        };

        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Message { topic: String, payload: Vec<u8> },
    ConnectionLost,
}

/// Broker connection as seen by the listener.
#[async_trait]
pub trait Session: Send {
    /// Opens the connection, or reopens it after a loss.
    async fn connect(&mut self) -> Result<()>;
    async fn subscribe(&mut self, topic: &Topic) -> Result<()>;
    /// `None` once the session can never produce events again.
    async fn next_event(&mut self) -> Option<SessionEvent>;
    async fn disconnect(&mut self) -> Result<()>;
}

pub struct Listener<S> {
    session: S,
    topic: Topic,
    handler: Handler,
    reconnect_delay: Duration,
    state: ListenerState,
}

impl<S: Session> Listener<S> {
    pub fn new(session: S, topic: Topic, handler: Handler, reconnect_delay: Duration) -> Self {
        Self {
            session,
            topic,
            handler,
            reconnect_delay,
            state: ListenerState::Disconnected,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    fn transition(&mut self, event: LinkEvent) {
        let next = self.state.on(event);

        if next != self.state {
            debug!("listener {} -> {next}", self.state);
            self.state = next;
        }
    }

    pub(crate) async fn start(&mut self) {
        self.transition(LinkEvent::Dial);

        while let Err(err) = self.session.connect().await {
            error!("Error MQTT connecting: {err}");
            sleep(self.reconnect_delay).await;
        }

        self.transition(LinkEvent::Established);
        info!("connected mqtt");

        match self.session.subscribe(&self.topic).await {
            Ok(()) => {
                self.transition(LinkEvent::Subscribed);
                info!("Subscribed to topic: {}", self.topic);
            }
            Err(err) => error!("Error subscribing to {}: {err}", self.topic),
        }
    }

    /// Connects if needed and feeds every inbound message to the handler,
    /// reconnecting whenever the connection drops. Returns only when the
    /// session stops producing events.
    pub async fn run(&mut self) {
        if self.state == ListenerState::Disconnected {
            self.start().await;
        }

        while let Some(event) = self.session.next_event().await {
            match event {
                SessionEvent::Message { topic, payload } => {
                    trace!("got {} bytes on {topic}", payload.len());
                    self.handler.handle(&payload);
                }
                SessionEvent::ConnectionLost => {
                    self.transition(LinkEvent::Lost);
                    error!("Lost MQTT connection. Attempting reconnect.");

                    sleep(self.reconnect_delay).await;
                    self.start().await;
                }
            }
        }

        self.transition(LinkEvent::Lost);
        info!("mqtt event stream closed");
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == ListenerState::Disconnected {
            return Ok(());
        }

        self.transition(LinkEvent::Lost);
        self.session.disconnect().await
    }
}
