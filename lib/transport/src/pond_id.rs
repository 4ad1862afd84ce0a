use std::fmt;

use serde_json::{Number, Value};

/// Storage key of a pond, rendered as `pond_<kolam>`.
///
/// The `kolam` value is used verbatim, so numeric and string identifiers
/// that print the same (`3`, `3.0` and `"3"`) name the same pond.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PondId {
    kolam: String,
}

impl PondId {
    /// Falsy identifiers (`null`, `""`, `0`, `false`) are rejected; `true`
    /// names the pond `pond_true`.
    pub fn from_kolam(kolam: Option<&Value>) -> Result<PondId, ValidationError> {
        let kolam = match kolam {
            None | Some(Value::Null) => return Err(ValidationError::MissingKolam),
            Some(Value::String(kolam)) if kolam.is_empty() => {
                return Err(ValidationError::EmptyKolam)
            }
            Some(Value::String(kolam)) => kolam.clone(),
            Some(Value::Number(number)) => match number_to_kolam(number) {
                Some(kolam) => kolam,
                None => return Err(ValidationError::EmptyKolam),
            },
            Some(Value::Bool(true)) => "true".to_string(),
            Some(Value::Bool(false)) => return Err(ValidationError::EmptyKolam),
            Some(Value::Array(_)) => return Err(ValidationError::UnsupportedKolam("array")),
            Some(Value::Object(_)) => return Err(ValidationError::UnsupportedKolam("object")),
        };

        Ok(PondId { kolam })
    }
}

impl fmt::Display for PondId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pond_{}", self.kolam)
    }
}

/// Renders `number` the way JavaScript prints it; `None` for zero.
fn number_to_kolam(number: &Number) -> Option<String> {
    if let Some(value) = number.as_i64() {
        return (value != 0).then(|| value.to_string());
    }

    if let Some(value) = number.as_u64() {
        return (value != 0).then(|| value.to_string());
    }

    let value = number.as_f64().filter(|value| *value != 0.0)?;

    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return Some(format!("{sign}Infinity"));
    }

    if value.fract() == 0.0 && value.abs() < 1e21 {
        return Some(format!("{value:.0}"));
    }

    Some(value.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingKolam,
    EmptyKolam,
    UnsupportedKolam(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKolam => write!(f, "kolam is missing"),
            Self::EmptyKolam => write!(f, "kolam is empty"),
            Self::UnsupportedKolam(kind) => write!(f, "kolam can not be an {kind}"),
        }
    }
}

impl std::error::Error for ValidationError {}
