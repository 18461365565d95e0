//! Access levels and the thresholds compared against them.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub u16);

impl AccessLevel {
    pub const ANYBODY: AccessLevel = AccessLevel(0);
    pub const VIEWER: AccessLevel = AccessLevel(10);
    pub const REPORTER: AccessLevel = AccessLevel(25);
    pub const UPDATER: AccessLevel = AccessLevel(40);
    pub const DEVELOPER: AccessLevel = AccessLevel(55);
    pub const MANAGER: AccessLevel = AccessLevel(70);
    pub const ADMINISTRATOR: AccessLevel = AccessLevel(90);
    pub const NOBODY: AccessLevel = AccessLevel(100);

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            AccessLevel::ANYBODY => Some("anybody"),
            AccessLevel::VIEWER => Some("viewer"),
            AccessLevel::REPORTER => Some("reporter"),
            AccessLevel::UPDATER => Some("updater"),
            AccessLevel::DEVELOPER => Some("developer"),
            AccessLevel::MANAGER => Some("manager"),
            AccessLevel::ADMINISTRATOR => Some("administrator"),
            AccessLevel::NOBODY => Some("nobody"),
            _ => None,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Minimum access required for an action.
///
/// Either a floor (`Level`) or an explicit list of accepted levels (`AnyOf`),
/// the latter letting administrators grant an action to e.g. reporters and
/// managers but not to the levels in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Level(AccessLevel),
    AnyOf(Vec<AccessLevel>),
}

impl Threshold {
    pub fn is_met_by(&self, level: AccessLevel) -> bool {
        match self {
            Threshold::Level(min) => level >= *min,
            Threshold::AnyOf(levels) => levels.contains(&level),
        }
    }
}

impl From<AccessLevel> for Threshold {
    fn from(level: AccessLevel) -> Self {
        Threshold::Level(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_threshold_is_a_floor() {
        let threshold = Threshold::Level(AccessLevel::DEVELOPER);
        assert!(threshold.is_met_by(AccessLevel::DEVELOPER));
        assert!(threshold.is_met_by(AccessLevel::ADMINISTRATOR));
        assert!(!threshold.is_met_by(AccessLevel::REPORTER));
    }

    #[test]
    fn list_threshold_requires_membership() {
        let threshold = Threshold::AnyOf(vec![AccessLevel::REPORTER, AccessLevel::MANAGER]);
        assert!(threshold.is_met_by(AccessLevel::REPORTER));
        assert!(threshold.is_met_by(AccessLevel::MANAGER));
        assert!(!threshold.is_met_by(AccessLevel::DEVELOPER));
        assert!(!threshold.is_met_by(AccessLevel::ADMINISTRATOR));
    }

    #[test]
    fn anybody_threshold_admits_guests() {
        assert!(Threshold::Level(AccessLevel::ANYBODY).is_met_by(AccessLevel::ANYBODY));
    }

    #[test]
    fn threshold_deserializes_from_number_or_list() {
        let single: Threshold = serde_json::from_str("55").unwrap();
        assert_eq!(single, Threshold::Level(AccessLevel::DEVELOPER));

        let list: Threshold = serde_json::from_str("[25, 70]").unwrap();
        assert_eq!(
            list,
            Threshold::AnyOf(vec![AccessLevel::REPORTER, AccessLevel::MANAGER])
        );
    }
}
