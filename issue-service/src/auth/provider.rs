//! Per-user selection of authentication flags.

use std::collections::HashMap;

use super::AuthFlags;
use crate::models::{User, UserId};

/// Supplies the flags that apply to a user, or to a request with no user
/// when `user` is `None`. Returning `None` selects the stock flags.
pub trait AuthFlagsProvider: Send + Sync {
    fn flags_for(&self, user: Option<&User>) -> Option<AuthFlags>;
}

/// One set of flags for everybody.
impl AuthFlagsProvider for AuthFlags {
    fn flags_for(&self, _user: Option<&User>) -> Option<AuthFlags> {
        Some(self.clone())
    }
}

/// Flags chosen per user, falling back to a shared set.
#[derive(Debug, Clone, Default)]
pub struct PerUserAuthFlags {
    fallback: AuthFlags,
    users: HashMap<UserId, AuthFlags>,
}

impl PerUserAuthFlags {
    pub fn new(fallback: AuthFlags) -> Self {
        Self {
            fallback,
            users: HashMap::new(),
        }
    }

    pub fn insert(&mut self, user: UserId, flags: AuthFlags) {
        self.users.insert(user, flags);
    }
}

impl AuthFlagsProvider for PerUserAuthFlags {
    fn flags_for(&self, user: Option<&User>) -> Option<AuthFlags> {
        let flags = user
            .and_then(|u| self.users.get(&u.id))
            .unwrap_or(&self.fallback);
        Some(flags.clone())
    }
}

/// Effective flags for `user`.
pub fn auth_flags_for(provider: &dyn AuthFlagsProvider, user: Option<&User>) -> AuthFlags {
    provider.flags_for(user).unwrap_or_default()
}
