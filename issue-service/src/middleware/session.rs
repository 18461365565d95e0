use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracker_core::error::{AppError, ErrorCode};

use crate::commands::RequestContext;
use crate::models::{Caller, ProjectId};
use crate::AppState;

pub const PROJECT_HEADER: &str = "x-project-id";

/// Establish who is calling and which project is selected, and store the
/// resulting [`RequestContext`] in the request extensions.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let project = selected_project(req.headers())?;
    let caller = identify_caller(&state, req.headers()).await?;

    tracing::debug!(caller = ?caller, project = %project, "Session established");
    req.extensions_mut()
        .insert(RequestContext::new(caller, project));

    Ok(next.run(req).await)
}

async fn identify_caller(state: &AppState, headers: &HeaderMap) -> Result<Caller, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
        .filter(|value| !value.is_empty());

    if let Some(token) = token {
        return match state.tracker.users.find_id_by_api_token(token).await? {
            Some(user) => Ok(Caller::User(user)),
            None => {
                tracing::warn!("Rejected unknown API token");
                Err(AppError::Unauthorized(anyhow::anyhow!("Invalid API token")))
            }
        };
    }

    Ok(match state.tracker.anonymous_user().await? {
        Some(user) => Caller::Anonymous(user),
        None => Caller::Guest,
    })
}

fn selected_project(headers: &HeaderMap) -> Result<ProjectId, AppError> {
    let Some(value) = headers.get(PROJECT_HEADER) else {
        return Ok(ProjectId::ALL_PROJECTS);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .map(ProjectId)
        .ok_or_else(|| {
            AppError::bad_request(ErrorCode::GpcNotNumber, "X-Project-Id must be a project id")
        })
}

/// Request context set up by [`session_middleware`].
pub struct Ctx(pub RequestContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Request context missing from request extensions"
            ))
        })?;

        Ok(Ctx(ctx.clone()))
    }
}
