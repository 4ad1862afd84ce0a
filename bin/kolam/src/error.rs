use std::fmt;

use crate::ConfigError;

#[derive(Debug)]
pub enum Error {
    Config(ConfigError),
    Mqtt(paho_mqtt::Error),
    Firestore(firestore::Error),
    WriteAbandoned,
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<paho_mqtt::Error> for Error {
    fn from(err: paho_mqtt::Error) -> Self {
        Self::Mqtt(err)
    }
}

impl From<firestore::Error> for Error {
    fn from(err: firestore::Error) -> Self {
        Self::Firestore(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "config error: {err}"),
            Self::Mqtt(err) => write!(f, "mqtt error: {err}"),
            Self::Firestore(err) => write!(f, "firestore error: {err}"),
            Self::WriteAbandoned => write!(f, "write was abandoned before completing"),
        }
    }
}

impl std::error::Error for Error {}
