use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use log::debug;
use paho_mqtt::{AsyncClient, ConnectOptions, Message, QOS_0};
use transport::{MqttConfig, Topic};

use crate::{Result, Session, SessionEvent};

/// [`Session`] backed by a paho-mqtt client.
pub struct MqttSession {
    client: AsyncClient,
    stream: BoxStream<'static, Option<Message>>,
    connect_options: ConnectOptions,
    has_connected: bool,
}

impl MqttSession {
    pub fn new(config: &MqttConfig) -> Result<Self> {
        let mut client = AsyncClient::new(config.create_options())?;
        // must be taken before connecting, otherwise early messages are lost
        let stream = client.get_stream(None).boxed();

        Ok(Self {
            client,
            stream,
            connect_options: config.connect_options(),
            has_connected: false,
        })
    }
}

#[async_trait]
impl Session for MqttSession {
    async fn connect(&mut self) -> Result<()> {
        if self.has_connected {
            self.client.reconnect().await?;
        } else {
            self.client.connect(self.connect_options.clone()).await?;
            self.has_connected = true;
        }

        Ok(())
    }

    async fn subscribe(&mut self, topic: &Topic) -> Result<()> {
        self.client.subscribe(topic.as_str(), QOS_0).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<SessionEvent> {
        match self.stream.next().await? {
            Some(message) => Some(SessionEvent::Message {
                topic: message.topic().to_string(),
                payload: message.payload().to_vec(),
            }),
            None => Some(SessionEvent::ConnectionLost),
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        debug!("disconnecting from {}", self.client.server_uri());
        self.client.disconnect(None).await?;
        Ok(())
    }
}
