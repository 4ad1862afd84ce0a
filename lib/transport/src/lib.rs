mod mqtt;
pub use mqtt::{default_client_id, MqttConfig, DEFAULT_HOST, DEFAULT_PORT};

mod pond_id;
pub use pond_id::{PondId, ValidationError};

mod sensor_record;
pub use sensor_record::SensorRecord;

mod telemetry;
pub use telemetry::Telemetry;

mod topic;
pub use topic::Topic;
