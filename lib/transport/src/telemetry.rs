use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{PondId, ValidationError};

/// Raw payload published by a pond controller.
///
/// Every field is kept as an untyped JSON value: controllers send readings as
/// numbers, as strings, or not at all.
#[derive(Debug, Deserialize, PartialEq)]
pub struct Telemetry {
    pub kolam: Option<Value>,
    #[serde(rename = "suhu")]
    pub temperature: Option<Value>,
    #[serde(rename = "do")]
    pub dissolved_oxygen: Option<Value>,
    pub ph: Option<Value>,
    #[serde(rename = "berat_pakan")]
    pub feed_weight: Option<Value>,
    #[serde(rename = "level_air")]
    pub water_level: Option<Value>,
}

impl Telemetry {
    /// Only a JSON object is accepted. A repeated key keeps its last value.
    pub fn from_slice(payload: &[u8]) -> serde_json::Result<Telemetry> {
        let object: Map<String, Value> = serde_json::from_slice(payload)?;
        serde_json::from_value(Value::Object(object))
    }

    pub fn pond_id(&self) -> Result<PondId, ValidationError> {
        PondId::from_kolam(self.kolam.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialization() {
        let payload = br#"{"kolam":"2","suhu":"28.5","do":7,"ph":"bad","extra":true}"#;
        let telemetry = Telemetry::from_slice(payload).unwrap();

        assert_eq!(
            telemetry,
            Telemetry {
                kolam: Some(json!("2")),
                temperature: Some(json!("28.5")),
                dissolved_oxygen: Some(json!(7)),
                ph: Some(json!("bad")),
                feed_weight: None,
                water_level: None,
            }
        );
        assert_eq!(telemetry.pond_id().unwrap().to_string(), "pond_2");
    }

    #[test]
    fn test_repeated_key_keeps_last_value() {
        let telemetry = Telemetry::from_slice(br#"{"kolam":"1","kolam":"4"}"#).unwrap();
        assert_eq!(telemetry.pond_id().unwrap().to_string(), "pond_4");
    }

    #[test]
    fn test_out_of_range_reading_still_decodes() {
        let telemetry = Telemetry::from_slice(br#"{"kolam":"1","suhu":1e400,"ph":7}"#).unwrap();

        assert_eq!(telemetry.pond_id().unwrap().to_string(), "pond_1");
        assert!(telemetry.temperature.is_some());
    }

    #[test]
    fn test_null_kolam_is_missing() {
        let telemetry = Telemetry::from_slice(br#"{"kolam":null,"suhu":25.0}"#).unwrap();
        assert_eq!(telemetry.pond_id(), Err(ValidationError::MissingKolam));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(Telemetry::from_slice(b"").is_err());
        assert!(Telemetry::from_slice(b"{\"kolam\":").is_err());
        assert!(Telemetry::from_slice(b"[1, 2, 3]").is_err());
        assert!(Telemetry::from_slice(br#"["1", 2, 3, 4, 5, 6]"#).is_err());
        assert!(Telemetry::from_slice(b"\"kolam\"").is_err());
        assert!(Telemetry::from_slice(b"\xff\xfe").is_err());
    }
}
