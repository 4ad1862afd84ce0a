use std::time::Duration;

use paho_mqtt::{ConnectOptions, ConnectOptionsBuilder, CreateOptions, CreateOptionsBuilder, SslOptions};
use uuid::Uuid;

pub const DEFAULT_HOST: &str = "broker.emqx.io";
pub const DEFAULT_PORT: u16 = 1883;

#[derive(Clone, Debug, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            client_id: default_client_id(),
            username: None,
            password: None,
            use_tls: false,
        }
    }
}

impl MqttConfig {
    pub fn server_uri(&self) -> String {
        let scheme = if self.use_tls { "ssl" } else { "tcp" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    pub fn create_options(&self) -> CreateOptions {
        CreateOptionsBuilder::new_v3()
            .server_uri(self.server_uri())
            .client_id(&self.client_id)
            .finalize()
    }

    pub fn connect_options(&self) -> ConnectOptions {
        let mut builder = ConnectOptionsBuilder::new_v3();
        builder
            .keep_alive_interval(Duration::from_secs(30))
            .clean_session(true);

        if let Some(username) = &self.username {
            builder.user_name(username.as_str());
        }

        if let Some(password) = &self.password {
            builder.password(password.as_str());
        }

        if self.use_tls {
            builder.ssl_options(SslOptions::new());
        }

        builder.finalize()
    }
}

pub fn default_client_id() -> String {
    format!("kolam-{}", Uuid::new_v4().simple())
}
