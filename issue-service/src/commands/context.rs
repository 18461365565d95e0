use crate::models::{Caller, ProjectId};

/// Per-request session state handed to commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    caller: Caller,
    project: ProjectId,
    project_override: Option<ProjectId>,
}

impl RequestContext {
    pub fn new(caller: Caller, project: ProjectId) -> Self {
        Self {
            caller,
            project,
            project_override: None,
        }
    }

    pub fn caller(&self) -> Caller {
        self.caller
    }

    /// Project selected by the request, or the override once one is set.
    pub fn current_project(&self) -> ProjectId {
        self.project_override.unwrap_or(self.project)
    }

    /// Switch the current project for the rest of this request only.
    pub fn override_project(&mut self, project: ProjectId) {
        self.project_override = Some(project);
    }

    pub fn project_override(&self) -> Option<ProjectId> {
        self.project_override
    }
}
