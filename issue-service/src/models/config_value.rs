//! Values stored in the tracker's configuration layers.

use super::{AccessLevel, Threshold};
use serde::{Deserialize, Serialize};

/// Legacy numeric switch values.
pub const ON: i64 = 1;
pub const OFF: i64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Int(i) => Some(*i != OFF),
            ConfigValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "on" | "true" | "1" | "yes" => Some(true),
                "off" | "false" | "0" | "no" | "" => Some(false),
                _ => None,
            },
            ConfigValue::List(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::Bool(b) => Some(i64::from(*b)),
            ConfigValue::Text(s) => s.trim().parse().ok(),
            ConfigValue::List(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_access_level(&self) -> Option<AccessLevel> {
        self.as_int()
            .and_then(|i| u16::try_from(i).ok())
            .map(AccessLevel)
    }

    pub fn as_threshold(&self) -> Option<Threshold> {
        match self {
            ConfigValue::List(items) => items
                .iter()
                .map(ConfigValue::as_access_level)
                .collect::<Option<Vec<_>>>()
                .map(Threshold::AnyOf),
            other => other.as_access_level().map(Threshold::Level),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<AccessLevel> for ConfigValue {
    fn from(value: AccessLevel) -> Self {
        ConfigValue::Int(i64::from(value.0))
    }
}

impl From<Threshold> for ConfigValue {
    fn from(value: Threshold) -> Self {
        match value {
            Threshold::Level(level) => level.into(),
            Threshold::AnyOf(levels) => {
                ConfigValue::List(levels.into_iter().map(ConfigValue::from).collect())
            }
        }
    }
}
