use log::debug;
use serde_json::Value;

use crate::Telemetry;

/// Normalized readings of one telemetry message, ready to be stored.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorRecord {
    pub temperature: f64,
    pub dissolved_oxygen: f64,
    pub ph: f64,
    pub feed_weight: f64,
    pub water_level: f64,
}

impl SensorRecord {
    /// Readings keyed by their stored field names.
    pub fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("suhu", self.temperature),
            ("do", self.dissolved_oxygen),
            ("ph", self.ph),
            ("berat_pakan", self.feed_weight),
            ("level_air", self.water_level),
        ]
    }
}

impl From<&Telemetry> for SensorRecord {
    fn from(telemetry: &Telemetry) -> Self {
        Self {
            temperature: coerce("suhu", telemetry.temperature.as_ref()),
            dissolved_oxygen: coerce("do", telemetry.dissolved_oxygen.as_ref()),
            ph: coerce("ph", telemetry.ph.as_ref()),
            feed_weight: coerce("berat_pakan", telemetry.feed_weight.as_ref()),
            water_level: coerce("level_air", telemetry.water_level.as_ref()),
        }
    }
}

/// Missing, unparsable and non-finite readings all become `0.0`.
fn coerce(field: &str, value: Option<&Value>) -> f64 {
    let parsed = match value {
        None => return 0.0,
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(string)) => parse_leading_float(string),
        Some(_) => None,
    };

    match parsed {
        Some(reading) if reading.is_finite() && reading != 0.0 => reading,
        Some(_) => 0.0,
        None => {
            debug!("{field} is not a number: {}, using 0.0", value.unwrap_or(&Value::Null));
            0.0
        }
    }
}

/// Parses the longest float literal at the start of `input`, ignoring
/// leading whitespace and whatever follows the number (`"28.5 C"` is `28.5`).
fn parse_leading_float(input: &str) -> Option<f64> {
    let input = input.trim_start();
    let bytes = input.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    if input[end..].starts_with("Infinity") {
        return input[..end + "Infinity".len()].parse().ok();
    }

    let integer_digits = count_digits(&bytes[end..]);
    end += integer_digits;

    let mut fraction_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction_digits = count_digits(&bytes[end + 1..]);
        if integer_digits > 0 || fraction_digits > 0 {
            end += 1 + fraction_digits;
        }
    }

    if integer_digits == 0 && fraction_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exponent_end = end + 1;
        if matches!(bytes.get(exponent_end), Some(b'+') | Some(b'-')) {
            exponent_end += 1;
        }

        let exponent_digits = count_digits(&bytes[exponent_end.min(bytes.len())..]);
        if exponent_digits > 0 {
            end = exponent_end + exponent_digits;
        }
    }

    input[..end].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|byte| byte.is_ascii_digit()).count()
}
