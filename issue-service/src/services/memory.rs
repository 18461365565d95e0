//! In-process store used by tests and by the service when no database is
//! configured.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use tracker_core::error::AppError;

use super::store::{IssueStore, UserStore};
use crate::models::{AccessLevel, Issue, IssueId, ProjectId, User, UserId};
use crate::utils::hash_api_token;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    project_levels: HashMap<(ProjectId, UserId), AccessLevel>,
    api_tokens: HashMap<String, UserId>,
    issues: HashMap<IssueId, Issue>,
    monitors: HashMap<IssueId, BTreeSet<UserId>>,
}

#[derive(Default)]
pub struct MemoryTracker {
    tables: RwLock<Tables>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        if let Ok(mut tables) = self.tables.write() {
            tables.users.insert(user.id, user);
        }
    }

    pub fn insert_issue(&self, issue: Issue) {
        if let Ok(mut tables) = self.tables.write() {
            tables.issues.insert(issue.id, issue);
        }
    }

    pub fn set_project_access(&self, project: ProjectId, user: UserId, level: AccessLevel) {
        if let Ok(mut tables) = self.tables.write() {
            tables.project_levels.insert((project, user), level);
        }
    }

    pub fn insert_api_token(&self, token: &str, user: UserId) {
        if let Ok(mut tables) = self.tables.write() {
            tables.api_tokens.insert(hash_api_token(token), user);
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, AppError> {
        self.tables
            .read()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Store lock poisoned: {}", e)))
    }
}

#[async_trait]
impl IssueStore for MemoryTracker {
    async fn find_issue(&self, id: IssueId) -> Result<Option<Issue>, AppError> {
        Ok(self.read()?.issues.get(&id).cloned())
    }

    async fn add_monitor(&self, issue: IssueId, user: UserId) -> Result<bool, AppError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Store lock poisoned: {}", e)))?;
        Ok(tables.monitors.entry(issue).or_default().insert(user))
    }

    async fn monitors(&self, issue: IssueId) -> Result<Vec<UserId>, AppError> {
        Ok(self
            .read()?
            .monitors
            .get(&issue)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl UserStore for MemoryTracker {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, AppError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_id_by_login(&self, username: &str) -> Result<Option<UserId>, AppError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| u.id))
    }

    async fn find_id_by_realname(&self, realname: &str) -> Result<Option<UserId>, AppError> {
        let tables = self.read()?;
        let mut matches = tables.users.values().filter(|u| u.realname == realname);
        // Display names are not unique; an ambiguous name resolves to nobody.
        match (matches.next(), matches.next()) {
            (Some(user), None) => Ok(Some(user.id)),
            _ => Ok(None),
        }
    }

    async fn find_id_by_api_token(&self, token: &str) -> Result<Option<UserId>, AppError> {
        Ok(self.read()?.api_tokens.get(&hash_api_token(token)).copied())
    }

    async fn access_level(
        &self,
        user: UserId,
        project: ProjectId,
    ) -> Result<Option<AccessLevel>, AppError> {
        let tables = self.read()?;
        let Some(account) = tables.users.get(&user) else {
            return Ok(None);
        };
        Ok(Some(
            tables
                .project_levels
                .get(&(project, user))
                .copied()
                .unwrap_or(account.access_level),
        ))
    }
}
