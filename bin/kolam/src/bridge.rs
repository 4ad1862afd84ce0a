use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::{
    Config, Dispatcher, FirestoreStore, Handler, Listener, MqttSession, Result, Session, Store,
};

/// Broker session, handler and store wired together for the lifetime of the process.
pub struct Bridge<S> {
    listener: Listener<S>,
    dispatcher: Arc<Dispatcher>,
    shutdown_timeout: Duration,
}

impl Bridge<MqttSession> {
    /// Creates the store client and the broker session. The broker is
    /// dialled by [`Bridge::run`].
    pub async fn init(config: Config) -> Result<Self> {
        let store = FirestoreStore::from_config(&config.store)?;

        match store.authorize().await {
            Ok(()) => info!("authorized firestore client"),
            Err(err) => warn!("unable to authorize firestore client, will retry on write: {err}"),
        }

        let session = MqttSession::new(&config.mqtt)?;
        info!(
            "mqtt broker {} as {}",
            config.mqtt.server_uri(),
            config.mqtt.client_id
        );

        Ok(Self::with_session(config, Arc::new(store), session))
    }
}

impl<S: Session> Bridge<S> {
    pub fn with_session(config: Config, store: Arc<dyn Store>, session: S) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(store, config.write_order));
        let handler = Handler::new(dispatcher.clone());
        let listener = Listener::new(session, config.topic, handler, config.reconnect_delay);

        Self {
            listener,
            dispatcher,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    pub async fn run(&mut self) {
        self.listener.run().await
    }

    /// Disconnects from the broker and waits for issued writes. Returns
    /// `false` if some writes were still running when the timeout hit.
    pub async fn shutdown(&mut self) -> bool {
        if let Err(err) = self.listener.disconnect().await {
            error!("Error MQTT disconnecting: {err}");
        }

        self.dispatcher.shutdown(self.shutdown_timeout).await
    }
}
