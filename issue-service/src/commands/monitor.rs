//! Registering users as monitors of an issue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracker_core::error::{AppError, ErrorCode};
use utoipa::ToSchema;

use super::{Command, CommandState, RequestContext};
use crate::models::{AccessLevel, Caller, Issue, IssueId, ProjectId, Threshold, UserId};
use crate::services::metrics::{MONITORS_ADDED, MONITOR_CANDIDATES_SKIPPED};
use crate::services::settings::{
    ConfigResolverExt, MONITOR_ADD_OTHERS_BUG_THRESHOLD, MONITOR_BUG_THRESHOLD,
};
use crate::services::Tracker;

/// Raw command input. `issue_id` stays untyped so that malformed values can
/// be reported with the right error code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorRequest {
    #[serde(default)]
    pub issue_id: Option<Value>,
    #[serde(default)]
    pub users: Option<Vec<UserDescriptor>>,
}

/// A user reference. The first field present wins, in declaration order.
///
/// `id` is kept as raw JSON so a malformed id only drops its own entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<u32>)]
    pub id: Option<Value>,
    /// Login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    /// Login name, falling back to display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_or_realname: Option<String>,
}

impl UserDescriptor {
    pub fn by_id(id: UserId) -> Self {
        Self {
            id: Some(Value::from(id.0)),
            ..Self::default()
        }
    }

    pub fn by_name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn by_real_name(real_name: &str) -> Self {
        Self {
            real_name: Some(real_name.to_string()),
            ..Self::default()
        }
    }

    pub fn by_name_or_realname(value: &str) -> Self {
        Self {
            name_or_realname: Some(value.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No user matches the descriptor.
    Unresolved,
    /// The descriptor names a user id that does not exist.
    UnknownUser,
    AnonymousAccount,
    /// The caller may not add this user.
    AccessDenied,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Unresolved => "unresolved",
            SkipReason::UnknownUser => "unknown_user",
            SkipReason::AnonymousAccount => "anonymous_account",
            SkipReason::AccessDenied => "access_denied",
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SkipReason::Unresolved => ErrorCode::UserByNameNotFound,
            SkipReason::UnknownUser => ErrorCode::UserByIdNotFound,
            SkipReason::AnonymousAccount => ErrorCode::ProtectedAccount,
            SkipReason::AccessDenied => ErrorCode::AccessDenied,
        }
    }
}

/// A candidate that was left out of the add-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SkippedUser {
    pub descriptor: UserDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub reason: SkipReason,
    pub code: u32,
}

impl SkippedUser {
    fn new(descriptor: UserDescriptor, user_id: Option<UserId>, reason: SkipReason) -> Self {
        Self {
            descriptor,
            user_id,
            reason,
            code: reason.code().number(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonitorOutcome {
    pub issue_id: IssueId,
    pub project_id: ProjectId,
    /// Users registered as monitors, in request order.
    pub added: Vec<UserId>,
    pub skipped: Vec<SkippedUser>,
}

#[derive(Debug, Clone)]
struct ValidatedMonitor {
    issue: Issue,
    add_list: Vec<UserId>,
    skipped: Vec<SkippedUser>,
}

pub struct MonitorCommand {
    request: MonitorRequest,
    state: CommandState,
    validated: Option<ValidatedMonitor>,
}

impl MonitorCommand {
    pub fn new(request: MonitorRequest) -> Self {
        Self {
            request,
            state: CommandState::Created,
            validated: None,
        }
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Users that will be added, available once validation succeeded.
    pub fn add_list(&self) -> Option<&[UserId]> {
        self.validated.as_ref().map(|v| v.add_list.as_slice())
    }

    pub fn skipped(&self) -> Option<&[SkippedUser]> {
        self.validated.as_ref().map(|v| v.skipped.as_slice())
    }

    /// Project of the target issue, available once validation succeeded.
    pub fn project(&self) -> Option<ProjectId> {
        self.validated.as_ref().map(|v| v.issue.project_id)
    }

    async fn check(
        &self,
        tracker: &Tracker,
        ctx: &RequestContext,
    ) -> Result<ValidatedMonitor, AppError> {
        let issue_id = parse_issue_id(self.request.issue_id.as_ref())?;
        let issue = tracker
            .issues
            .find_issue(issue_id)
            .await?
            .ok_or_else(|| issue_not_found(issue_id))?;
        let project = issue.project_id;

        let caller = ctx.caller();
        let descriptors = match &self.request.users {
            Some(users) => users.clone(),
            None => match caller {
                Caller::User(id) => vec![UserDescriptor::by_id(id)],
                _ => {
                    return Err(AppError::bad_request(
                        ErrorCode::GpcVarNotFound,
                        "user_id missing",
                    ))
                }
            },
        };

        let mut add_list = Vec::with_capacity(descriptors.len());
        let mut skipped = Vec::new();

        for descriptor in descriptors {
            let user_id = match resolve_descriptor(tracker, &descriptor).await? {
                Ok(user_id) => user_id,
                Err(reason) => {
                    skip(&mut skipped, issue_id, descriptor, None, reason);
                    continue;
                }
            };

            if tracker.is_anonymous(user_id).await? {
                skip(&mut skipped, issue_id, descriptor, Some(user_id), SkipReason::AnonymousAccount);
                continue;
            }

            let (key, fallback) = if caller.user_id() == Some(user_id) {
                (MONITOR_BUG_THRESHOLD, AccessLevel::REPORTER)
            } else {
                (MONITOR_ADD_OTHERS_BUG_THRESHOLD, AccessLevel::DEVELOPER)
            };
            let threshold = tracker
                .settings
                .threshold(key, caller.user_id(), Some(project))
                .unwrap_or(Threshold::Level(fallback));

            if !tracker
                .access
                .caller_meets_threshold(&caller, &threshold, &issue, project)
                .await?
            {
                skip(&mut skipped, issue_id, descriptor, Some(user_id), SkipReason::AccessDenied);
                continue;
            }

            add_list.push(user_id);
        }

        Ok(ValidatedMonitor {
            issue,
            add_list,
            skipped,
        })
    }
}

#[async_trait]
impl Command for MonitorCommand {
    type Output = MonitorOutcome;

    async fn validate(&mut self, tracker: &Tracker, ctx: &RequestContext) -> Result<(), AppError> {
        if self.state != CommandState::Created {
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Monitor command validated twice (state {:?})",
                self.state
            )));
        }

        match self.check(tracker, ctx).await {
            Ok(validated) => {
                tracing::debug!(
                    issue_id = %validated.issue.id,
                    to_add = validated.add_list.len(),
                    skipped = validated.skipped.len(),
                    "Monitor command validated"
                );
                self.validated = Some(validated);
                self.state = CommandState::Validated;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Monitor command rejected");
                self.state = CommandState::Failed;
                Err(e)
            }
        }
    }

    async fn process(
        &mut self,
        tracker: &Tracker,
        ctx: &mut RequestContext,
    ) -> Result<MonitorOutcome, AppError> {
        let validated = match (self.state, self.validated.take()) {
            (CommandState::Validated, Some(validated)) => validated,
            (state, _) => {
                return Err(AppError::InternalError(anyhow::anyhow!(
                    "Monitor command processed before validation (state {:?})",
                    state
                )))
            }
        };

        let issue_id = validated.issue.id;
        let project = validated.issue.project_id;

        if ctx.current_project() != project {
            tracing::debug!(
                from = %ctx.current_project(),
                to = %project,
                "Switching request project to the issue's project"
            );
            ctx.override_project(project);
        }

        for user_id in &validated.add_list {
            match tracker.issues.add_monitor(issue_id, *user_id).await {
                Ok(true) => {
                    metrics::counter!(MONITORS_ADDED).increment(1);
                    tracing::info!(issue_id = %issue_id, user_id = %user_id, "User now monitoring issue");
                }
                Ok(false) => {
                    tracing::debug!(issue_id = %issue_id, user_id = %user_id, "User already monitoring issue");
                }
                Err(e) => {
                    tracing::error!(issue_id = %issue_id, user_id = %user_id, error = %e, "Failed to add monitor");
                    self.state = CommandState::Failed;
                    return Err(e);
                }
            }
        }

        self.state = CommandState::Executed;
        Ok(MonitorOutcome {
            issue_id,
            project_id: project,
            added: validated.add_list,
            skipped: validated.skipped,
        })
    }
}

/// Issue id from a JSON number or a numeric string.
///
/// Signs, fractions and exponents are accepted and truncated towards zero.
pub fn parse_issue_id(value: Option<&Value>) -> Result<IssueId, AppError> {
    let value = match value {
        None | Some(Value::Null) => {
            return Err(AppError::bad_request(
                ErrorCode::GpcVarNotFound,
                "issue_id missing",
            ))
        }
        Some(value) => value,
    };

    let number = numeric_value(value).ok_or_else(not_a_number)?;
    // Numeric but negative or too large: no such issue can exist.
    as_id(number)
        .map(IssueId)
        .ok_or_else(|| issue_not_found(display_number(value, number)))
}

/// The number carried by a JSON number or a numeric string, if any.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

/// Decimal number with optional sign, fraction and exponent, surrounded by
/// optional whitespace. Hex, `inf` and `nan` are rejected.
fn parse_numeric(raw: &str) -> Option<f64> {
    let text = raw.trim();
    let bytes = text.as_bytes();
    let mut pos = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }
    let int_digits = count_digits(&bytes[pos..]);
    pos += int_digits;
    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        frac_digits = count_digits(&bytes[pos..]);
        pos += frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return None;
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        let exp_digits = count_digits(&bytes[pos..]);
        if exp_digits == 0 {
            return None;
        }
        pos += exp_digits;
    }
    if pos != bytes.len() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn as_id(number: f64) -> Option<u32> {
    let whole = number.trunc();
    (0.0..=f64::from(u32::MAX)).contains(&whole).then_some(whole as u32)
}

fn display_number(value: &Value, number: f64) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        _ => number.trunc().to_string(),
    }
}

fn not_a_number() -> AppError {
    AppError::bad_request(ErrorCode::GpcNotNumber, "issue_id must be a valid issue id")
}

fn issue_not_found(id: impl std::fmt::Display) -> AppError {
    AppError::not_found(ErrorCode::BugNotFound, format!("Issue id {} not found", id))
}

/// Outer error is a store failure; inner error is why the descriptor names
/// no usable user.
async fn resolve_descriptor(
    tracker: &Tracker,
    descriptor: &UserDescriptor,
) -> Result<Result<UserId, SkipReason>, AppError> {
    let users = &tracker.users;
    let found = if let Some(raw) = &descriptor.id {
        // Numeric ids that cannot belong to any account name an unknown user.
        match numeric_value(raw) {
            Some(number) => match as_id(number) {
                Some(id) => Some(UserId(id)),
                None => return Ok(Err(SkipReason::UnknownUser)),
            },
            None => None,
        }
    } else if let Some(name) = &descriptor.name {
        users.find_id_by_login(name).await?
    } else if let Some(real_name) = &descriptor.real_name {
        users.find_id_by_realname(real_name).await?
    } else if let Some(value) = &descriptor.name_or_realname {
        match users.find_id_by_login(value).await? {
            Some(id) => Some(id),
            None => users.find_id_by_realname(value).await?,
        }
    } else {
        None
    };

    let Some(user_id) = found else {
        return Ok(Err(SkipReason::Unresolved));
    };
    if !users.user_exists(user_id).await? {
        return Ok(Err(SkipReason::UnknownUser));
    }
    Ok(Ok(user_id))
}

fn skip(
    skipped: &mut Vec<SkippedUser>,
    issue_id: IssueId,
    descriptor: UserDescriptor,
    user_id: Option<UserId>,
    reason: SkipReason,
) {
    tracing::debug!(
        issue_id = %issue_id,
        user_id = ?user_id,
        reason = reason.as_str(),
        "Skipping monitor candidate"
    );
    metrics::counter!(MONITOR_CANDIDATES_SKIPPED, "reason" => reason.as_str()).increment(1);
    skipped.push(SkippedUser::new(descriptor, user_id, reason));
}
