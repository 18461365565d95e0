//! Validate-then-process operations.
//!
//! A command is built from request input, checked by [`Command::validate`]
//! without side effects, then carried out by [`Command::process`].

pub mod context;
pub mod monitor;

use async_trait::async_trait;
use tracker_core::error::AppError;

use crate::services::Tracker;

pub use context::RequestContext;
pub use monitor::{
    MonitorCommand, MonitorOutcome, MonitorRequest, SkipReason, SkippedUser, UserDescriptor,
};

/// Lifecycle of a command. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Created,
    Validated,
    Executed,
    Failed,
}

#[async_trait]
pub trait Command: Send {
    type Output: Send;

    async fn validate(&mut self, tracker: &Tracker, ctx: &RequestContext) -> Result<(), AppError>;

    /// Must only be called after a successful [`Command::validate`].
    async fn process(
        &mut self,
        tracker: &Tracker,
        ctx: &mut RequestContext,
    ) -> Result<Self::Output, AppError>;

    async fn execute(
        &mut self,
        tracker: &Tracker,
        ctx: &mut RequestContext,
    ) -> Result<Self::Output, AppError> {
        self.validate(tracker, ctx).await?;
        self.process(tracker, ctx).await
    }
}
