use std::fmt;
use std::str::FromStr;

use serde::de::{value, Error};

/// Topic the pond sensors publish their telemetry to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    pub const TELEMETRY: &'static str = "nugra/data/kolam";

    pub fn telemetry() -> Topic {
        Topic(Self::TELEMETRY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Topic {
    fn default() -> Self {
        Self::telemetry()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Topic {
    type Err = value::Error;

    fn from_str(s: &str) -> std::result::Result<Topic, Self::Err> {
        const ERROR_MSG: &str = "topic must be a non-empty name without + or # wildcards";

        if s.is_empty() || s.contains(['+', '#', '\0']) {
            return Err(value::Error::custom(ERROR_MSG));
        }

        Ok(Topic(s.to_string()))
    }
}
