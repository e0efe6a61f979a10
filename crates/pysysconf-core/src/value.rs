use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resolved configuration variables, keyed by name.
pub type ConfigVars = BTreeMap<String, ConfigValue>;

/// A single configuration value: integers stay integers, everything else is text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Str(String),
}

impl ConfigValue {
    /// Coerce raw text: an integer when the trimmed text parses as one, else
    /// the text unchanged.
    pub fn parse(text: &str) -> Self {
        match parse_int(text) {
            Some(n) => ConfigValue::Int(n),
            None => ConfigValue::Str(text.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(n) => Some(*n),
            ConfigValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            ConfigValue::Int(_) => None,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, ConfigValue::Int(_))
    }
}

/// Integer parsing with surrounding whitespace tolerated, matching how the
/// generated files spell numbers (`1`, ` 42 `, `-1`, `+3`).
pub fn parse_int(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Int(n) => write!(f, "{n}"),
            ConfigValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Int(n)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}
