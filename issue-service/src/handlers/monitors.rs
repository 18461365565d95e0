use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracker_core::error::{AppError, ErrorCode};
use utoipa::ToSchema;

use crate::commands::monitor::parse_issue_id;
use crate::commands::{Command, MonitorCommand, MonitorOutcome, MonitorRequest, UserDescriptor};
use crate::middleware::Ctx;
use crate::models::{AccessLevel, MonitorList, Threshold};
use crate::AppState;

/// Body of a monitor request. Without `users` the caller monitors the issue
/// themselves.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AddMonitorsRequest {
    #[serde(default)]
    pub users: Option<Vec<UserDescriptor>>,
}

#[utoipa::path(
    post,
    path = "/issues/{issue_id}/monitors",
    tag = "Monitors",
    params(("issue_id" = String, Path, description = "Issue id")),
    request_body(content = AddMonitorsRequest, description = "Users to add; empty body adds the caller"),
    responses(
        (status = 201, description = "Monitors registered", body = MonitorOutcome),
        (status = 400, description = "Missing or malformed input"),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn add_monitors(
    State(state): State<AppState>,
    Ctx(mut ctx): Ctx,
    Path(issue_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let body: AddMonitorsRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AddMonitorsRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            AppError::BadRequest(ErrorCode::Generic, anyhow::anyhow!("Invalid request body: {}", e))
        })?
    };

    let mut command = MonitorCommand::new(MonitorRequest {
        issue_id: Some(Value::String(issue_id)),
        users: body.users,
    });
    let outcome = command.execute(&state.tracker, &mut ctx).await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

#[utoipa::path(
    get,
    path = "/issues/{issue_id}/monitors",
    tag = "Monitors",
    params(("issue_id" = String, Path, description = "Issue id")),
    responses(
        (status = 200, description = "Current monitors", body = MonitorList),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn list_monitors(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(issue_id): Path<String>,
) -> Result<Json<MonitorList>, AppError> {
    let issue_id = parse_issue_id(Some(&Value::String(issue_id)))?;
    let tracker = &state.tracker;

    let issue = tracker.issues.find_issue(issue_id).await?.ok_or_else(|| {
        AppError::not_found(ErrorCode::BugNotFound, format!("Issue id {} not found", issue_id))
    })?;

    let visible = tracker
        .access
        .caller_meets_threshold(
            &ctx.caller(),
            &Threshold::Level(AccessLevel::ANYBODY),
            &issue,
            issue.project_id,
        )
        .await?;
    if !visible {
        return Err(AppError::Forbidden(
            ErrorCode::AccessDenied,
            anyhow::anyhow!("Access denied to issue {}", issue_id),
        ));
    }

    let monitors = tracker.issues.monitors(issue_id).await?;
    Ok(Json(MonitorList { issue_id, monitors }))
}
