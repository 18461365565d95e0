//! Handles to every collaborator a command or handler needs.

use std::sync::Arc;

use tracker_core::error::AppError;

use super::access::{AccessEvaluator, ProjectAccess};
use super::lang::{Localizer, MessageCatalog};
use super::memory::MemoryTracker;
use super::settings::{ConfigResolver, LayeredSettings};
use super::store::{IssueStore, UserStore};
use crate::auth::{auth_flags_for, AuthFlags, AuthFlagsProvider};
use crate::models::{User, UserId};

#[derive(Clone)]
pub struct Tracker {
    pub issues: Arc<dyn IssueStore>,
    pub users: Arc<dyn UserStore>,
    pub settings: Arc<dyn ConfigResolver>,
    pub messages: Arc<dyn Localizer>,
    pub auth_flags: Arc<dyn AuthFlagsProvider>,
    pub access: Arc<dyn AccessEvaluator>,
}

impl Tracker {
    /// Wires the default [`ProjectAccess`] evaluator over `users` and `settings`.
    pub fn new(
        issues: Arc<dyn IssueStore>,
        users: Arc<dyn UserStore>,
        settings: Arc<dyn ConfigResolver>,
        messages: Arc<dyn Localizer>,
        auth_flags: Arc<dyn AuthFlagsProvider>,
    ) -> Self {
        let access = Arc::new(ProjectAccess::new(users.clone(), settings.clone()));
        Self {
            issues,
            users,
            settings,
            messages,
            auth_flags,
            access,
        }
    }

    pub fn with_access_evaluator(mut self, access: Arc<dyn AccessEvaluator>) -> Self {
        self.access = access;
        self
    }

    pub fn in_memory(
        store: Arc<MemoryTracker>,
        settings: Arc<LayeredSettings>,
        auth_flags: Arc<dyn AuthFlagsProvider>,
    ) -> Self {
        Self::new(
            store.clone(),
            store,
            settings,
            Arc::new(MessageCatalog::english()),
            auth_flags,
        )
    }

    /// Flags in effect for `user`, or for a request without a user.
    pub fn flags_for(&self, user: Option<&User>) -> AuthFlags {
        auth_flags_for(self.auth_flags.as_ref(), user)
    }

    /// True when `user` is the shared anonymous account and anonymous login
    /// is enabled.
    pub async fn is_anonymous(&self, user: UserId) -> Result<bool, AppError> {
        let Some(account) = self.users.find_user(user).await? else {
            return Ok(false);
        };
        let flags = self.flags_for(Some(&account));
        let settings = self.settings.as_ref();
        Ok(flags.anonymous_enabled(settings) && account.username == flags.anonymous_account(settings))
    }

    /// Id of the anonymous account when anonymous login is enabled and the
    /// account exists.
    pub async fn anonymous_user(&self) -> Result<Option<UserId>, AppError> {
        let flags = self.flags_for(None);
        let settings = self.settings.as_ref();
        if !flags.anonymous_enabled(settings) {
            return Ok(None);
        }
        let name = flags.anonymous_account(settings);
        if name.is_empty() {
            return Ok(None);
        }
        self.users.find_id_by_login(&name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessLevel;
    use crate::services::settings::{ALLOW_ANONYMOUS_LOGIN, ANONYMOUS_ACCOUNT};

    fn tracker(flags: AuthFlags) -> Tracker {
        let store = Arc::new(MemoryTracker::new());
        store.insert_user(User::new(1, "alice", "Alice A", AccessLevel::REPORTER));
        store.insert_user(User::new(9, "guest", "Guest", AccessLevel::VIEWER));
        let mut settings = LayeredSettings::new();
        settings.set_global(ANONYMOUS_ACCOUNT, "guest".into());
        Tracker::in_memory(store, Arc::new(settings), Arc::new(flags))
    }

    #[tokio::test]
    async fn anonymous_requires_enabled_login() {
        let tracker = tracker(AuthFlags::new());
        assert!(!tracker.is_anonymous(UserId(9)).await.unwrap());
        assert_eq!(tracker.anonymous_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn anonymous_account_matches_by_username() {
        let mut flags = AuthFlags::new();
        flags.set_anonymous_enabled(true);
        let tracker = tracker(flags);

        assert!(tracker.is_anonymous(UserId(9)).await.unwrap());
        assert!(!tracker.is_anonymous(UserId(1)).await.unwrap());
        assert!(!tracker.is_anonymous(UserId(42)).await.unwrap());
        assert_eq!(tracker.anonymous_user().await.unwrap(), Some(UserId(9)));
    }

    #[tokio::test]
    async fn global_setting_enables_anonymous_login() {
        let store = Arc::new(MemoryTracker::new());
        store.insert_user(User::new(9, "nobody", "Nobody", AccessLevel::VIEWER));
        let mut settings = LayeredSettings::new();
        settings.set_global(ALLOW_ANONYMOUS_LOGIN, crate::models::ConfigValue::Int(1));
        settings.set_global(ANONYMOUS_ACCOUNT, "nobody".into());
        let tracker = Tracker::in_memory(store, Arc::new(settings), Arc::new(AuthFlags::new()));

        assert!(tracker.is_anonymous(UserId(9)).await.unwrap());
    }
}
