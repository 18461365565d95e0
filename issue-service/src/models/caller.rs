use serde::Serialize;

use super::UserId;

/// Who is making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Caller {
    /// No identity at all.
    Guest,
    /// Logged in as the shared anonymous account.
    Anonymous(UserId),
    User(UserId),
}

impl Caller {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Caller::Guest => None,
            Caller::Anonymous(id) | Caller::User(id) => Some(*id),
        }
    }

    /// Only real accounts count as authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Caller::User(_))
    }
}
