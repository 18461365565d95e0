//! User accounts as seen by the issue tracker.

use super::{AccessLevel, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Display name.
    pub realname: String,
    /// Global access level, used where no project-specific level exists.
    pub access_level: AccessLevel,
}

impl User {
    pub fn new(id: u32, username: &str, realname: &str, access_level: AccessLevel) -> Self {
        Self {
            id: UserId(id),
            username: username.to_string(),
            realname: realname.to_string(),
            access_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_account_fields_only() {
        let user = User::new(3, "mona", "Mona Manager", AccessLevel::MANAGER);

        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            serde_json::json!({
                "id": 3,
                "username": "mona",
                "realname": "Mona Manager",
                "access_level": 70
            })
        );
    }
}
