mod bridge;
pub use bridge::Bridge;

mod config;
pub use config::{Config, ConfigError, StoreConfig};

mod dispatcher;
pub use dispatcher::{Dispatcher, WriteOrder, WriteTicket};

mod error;
pub use error::Error;

mod handler;
pub use handler::{Disposition, Handler, Rejection};

mod listener;
pub use listener::{LinkEvent, Listener, ListenerState, Session, SessionEvent};

mod mqtt_session;
pub use mqtt_session::MqttSession;

mod store;
pub use store::{FirestoreStore, Store, StoredRecord};

pub type Result<T> = std::result::Result<T, Error>;
