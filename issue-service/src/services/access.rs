//! Access checks against per-project thresholds.

use std::sync::Arc;

use async_trait::async_trait;
use tracker_core::error::AppError;

use super::settings::{ConfigResolver, ConfigResolverExt, PRIVATE_BUG_THRESHOLD};
use super::store::UserStore;
use crate::models::{AccessLevel, Caller, Issue, ProjectId, Threshold};

#[async_trait]
pub trait AccessEvaluator: Send + Sync {
    /// Whether `caller` meets `threshold` on `issue`, evaluated in `project`.
    async fn caller_meets_threshold(
        &self,
        caller: &Caller,
        threshold: &Threshold,
        issue: &Issue,
        project: ProjectId,
    ) -> Result<bool, AppError>;
}

pub struct ProjectAccess {
    users: Arc<dyn UserStore>,
    settings: Arc<dyn ConfigResolver>,
}

impl ProjectAccess {
    pub fn new(users: Arc<dyn UserStore>, settings: Arc<dyn ConfigResolver>) -> Self {
        Self { users, settings }
    }

    /// Level of `caller` in `project`; guests and unknown users get ANYBODY.
    pub async fn effective_level(
        &self,
        caller: &Caller,
        project: ProjectId,
    ) -> Result<AccessLevel, AppError> {
        let Some(user) = caller.user_id() else {
            return Ok(AccessLevel::ANYBODY);
        };
        Ok(self
            .users
            .access_level(user, project)
            .await?
            .unwrap_or(AccessLevel::ANYBODY))
    }
}

#[async_trait]
impl AccessEvaluator for ProjectAccess {
    async fn caller_meets_threshold(
        &self,
        caller: &Caller,
        threshold: &Threshold,
        issue: &Issue,
        project: ProjectId,
    ) -> Result<bool, AppError> {
        let level = self.effective_level(caller, project).await?;

        if issue.private && caller.user_id() != Some(issue.reporter_id) {
            let private_threshold = self
                .settings
                .threshold(PRIVATE_BUG_THRESHOLD, caller.user_id(), Some(project))
                .unwrap_or(Threshold::Level(AccessLevel::DEVELOPER));
            if !private_threshold.is_met_by(level) {
                tracing::debug!(
                    issue_id = %issue.id,
                    level = %level,
                    "Private issue not visible to caller"
                );
                return Ok(false);
            }
        }

        Ok(threshold.is_met_by(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, UserId};
    use crate::services::memory::MemoryTracker;
    use crate::services::settings::LayeredSettings;

    fn setup() -> (Arc<MemoryTracker>, Arc<LayeredSettings>, ProjectAccess) {
        let store = Arc::new(MemoryTracker::new());
        store.insert_user(User::new(1, "rita", "Rita Reporter", AccessLevel::REPORTER));
        store.insert_user(User::new(2, "dev", "Dana Dev", AccessLevel::DEVELOPER));
        store.insert_user(User::new(3, "vic", "Vic Viewer", AccessLevel::VIEWER));
        let settings = Arc::new(LayeredSettings::new());
        let access = ProjectAccess::new(store.clone(), settings.clone());
        (store, settings, access)
    }

    #[tokio::test]
    async fn public_issue_uses_plain_threshold() {
        let (_, _, access) = setup();
        let issue = Issue::new(5, 1, 1, "Public");
        let reporter = Threshold::Level(AccessLevel::REPORTER);

        assert!(access
            .caller_meets_threshold(&Caller::User(UserId(1)), &reporter, &issue, ProjectId(1))
            .await
            .unwrap());
        assert!(!access
            .caller_meets_threshold(&Caller::User(UserId(3)), &reporter, &issue, ProjectId(1))
            .await
            .unwrap());
        assert!(!access
            .caller_meets_threshold(&Caller::Guest, &reporter, &issue, ProjectId(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn private_issue_requires_reporter_or_private_threshold() {
        let (store, _, access) = setup();
        store.insert_user(User::new(4, "rob", "Rob Reporter", AccessLevel::REPORTER));
        let issue = Issue::new(6, 1, 1, "Secret").private();
        let viewer = Threshold::Level(AccessLevel::VIEWER);

        // Reporter of the issue
        assert!(access
            .caller_meets_threshold(&Caller::User(UserId(1)), &viewer, &issue, ProjectId(1))
            .await
            .unwrap());
        // Developer meets private_bug_threshold
        assert!(access
            .caller_meets_threshold(&Caller::User(UserId(2)), &viewer, &issue, ProjectId(1))
            .await
            .unwrap());
        // Another reporter does not
        assert!(!access
            .caller_meets_threshold(&Caller::User(UserId(4)), &viewer, &issue, ProjectId(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn project_levels_and_overrides_apply() {
        let (store, settings, access) = setup();
        store.set_project_access(ProjectId(2), UserId(3), AccessLevel::MANAGER);
        settings.set(
            PRIVATE_BUG_THRESHOLD,
            AccessLevel::MANAGER.into(),
            UserId::ALL_USERS,
            ProjectId(2),
        );
        let issue = Issue::new(7, 2, 1, "Secret").private();
        let viewer = Threshold::Level(AccessLevel::VIEWER);

        assert!(access
            .caller_meets_threshold(&Caller::User(UserId(3)), &viewer, &issue, ProjectId(2))
            .await
            .unwrap());
        assert!(!access
            .caller_meets_threshold(&Caller::User(UserId(2)), &viewer, &issue, ProjectId(2))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn private_threshold_honours_caller_override() {
        let (store, settings, access) = setup();
        store.insert_user(User::new(4, "rob", "Rob Reporter", AccessLevel::REPORTER));
        settings.set(
            PRIVATE_BUG_THRESHOLD,
            AccessLevel::REPORTER.into(),
            UserId(4),
            ProjectId::ALL_PROJECTS,
        );
        let issue = Issue::new(8, 1, 1, "Secret").private();
        let viewer = Threshold::Level(AccessLevel::VIEWER);

        assert!(access
            .caller_meets_threshold(&Caller::User(UserId(4)), &viewer, &issue, ProjectId(1))
            .await
            .unwrap());
        // The override is scoped to Rob only.
        assert!(!access
            .caller_meets_threshold(&Caller::User(UserId(3)), &viewer, &issue, ProjectId(1))
            .await
            .unwrap());
    }
}
