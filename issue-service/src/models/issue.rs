use super::{IssueId, ProjectId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub project_id: ProjectId,
    pub reporter_id: UserId,
    pub summary: String,
    /// Private issues are only visible to their reporter and to users meeting
    /// the project's `private_bug_threshold`.
    pub private: bool,
}

impl Issue {
    pub fn new(id: u32, project_id: u32, reporter_id: u32, summary: &str) -> Self {
        Self {
            id: IssueId(id),
            project_id: ProjectId(project_id),
            reporter_id: UserId(reporter_id),
            summary: summary.to_string(),
            private: false,
        }
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }
}

/// Monitor list response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonitorList {
    pub issue_id: IssueId,
    pub monitors: Vec<UserId>,
}
