//! Storage contracts for issues, monitors and users.

use async_trait::async_trait;
use tracker_core::error::AppError;

use crate::models::{AccessLevel, Issue, IssueId, ProjectId, User, UserId};

#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn find_issue(&self, id: IssueId) -> Result<Option<Issue>, AppError>;

    async fn issue_exists(&self, id: IssueId) -> Result<bool, AppError> {
        Ok(self.find_issue(id).await?.is_some())
    }

    async fn issue_project(&self, id: IssueId) -> Result<Option<ProjectId>, AppError> {
        Ok(self.find_issue(id).await?.map(|issue| issue.project_id))
    }

    /// Register `user` as a monitor of `issue`. Returns `false` when the user
    /// was already monitoring it.
    async fn add_monitor(&self, issue: IssueId, user: UserId) -> Result<bool, AppError>;

    /// Monitors of `issue`, ordered by user id.
    async fn monitors(&self, issue: IssueId) -> Result<Vec<UserId>, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, AppError>;

    async fn user_exists(&self, id: UserId) -> Result<bool, AppError> {
        Ok(self.find_user(id).await?.is_some())
    }

    async fn find_id_by_login(&self, username: &str) -> Result<Option<UserId>, AppError>;

    async fn find_id_by_realname(&self, realname: &str) -> Result<Option<UserId>, AppError>;

    /// Owner of an API token, looked up by the token's digest.
    async fn find_id_by_api_token(&self, token: &str) -> Result<Option<UserId>, AppError>;

    /// Effective level of `user` in `project`: the project-specific level if
    /// one is assigned, else the user's global level. `None` for unknown users.
    async fn access_level(
        &self,
        user: UserId,
        project: ProjectId,
    ) -> Result<Option<AccessLevel>, AppError>;
}
