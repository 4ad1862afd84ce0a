use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use transport::{default_client_id, MqttConfig, Topic, DEFAULT_HOST, DEFAULT_PORT};

use crate::WriteOrder;

const EMULATOR_PROJECT_ID: &str = "demo-kolam";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub topic: Topic,
    pub store: StoreConfig,
    pub write_order: WriteOrder,
    pub reconnect_delay: Duration,
    pub shutdown_timeout: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreConfig {
    ServiceAccount {
        key_path: PathBuf,
        project_id: Option<String>,
    },
    Emulator {
        host: String,
        project_id: String,
    },
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let mqtt = MqttConfig {
            host: var("MQTT_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(&var, "MQTT_PORT")?.unwrap_or(DEFAULT_PORT),
            client_id: var("MQTT_CLIENT_ID").unwrap_or_else(default_client_id),
            username: var("MQTT_USER"),
            password: var("MQTT_PASS"),
            use_tls: parse_var(&var, "MQTT_TLS")?.unwrap_or(false),
        };

        let topic = parse_var(&var, "MQTT_TOPIC")?.unwrap_or_default();

        let project_id = var("FIREBASE_PROJECT_ID");
        let store = if let Some(host) = var("FIRESTORE_EMULATOR_HOST") {
            StoreConfig::Emulator {
                host,
                project_id: project_id.unwrap_or_else(|| EMULATOR_PROJECT_ID.to_string()),
            }
        } else {
            let key_path = var("FIREBASE_SERVICE_ACCOUNT")
                .or_else(|| var("GOOGLE_APPLICATION_CREDENTIALS"))
                .ok_or(ConfigError::MissingVar("FIREBASE_SERVICE_ACCOUNT"))?;

            StoreConfig::ServiceAccount {
                key_path: PathBuf::from(key_path),
                project_id,
            }
        };

        let write_order = parse_var(&var, "WRITE_ORDER")?.unwrap_or_default();
        let reconnect_delay = parse_var(&var, "RECONNECT_DELAY_SECS")?.unwrap_or(1);
        let shutdown_timeout = parse_var(&var, "SHUTDOWN_TIMEOUT_SECS")?.unwrap_or(10);

        Ok(Config {
            mqtt,
            topic,
            store,
            write_order,
            reconnect_delay: Duration::from_secs(reconnect_delay),
            shutdown_timeout: Duration::from_secs(shutdown_timeout),
        })
    }
}

fn parse_var<T: FromStr>(
    var: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match var(name) {
        Some(value) => match value.parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::InvalidVar { name, value }),
        },
        None => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(name) => write!(f, "set ENV variable {name}"),
            Self::InvalidVar { name, value } => write!(f, "invalid value of {name}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}
