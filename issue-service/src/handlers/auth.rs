use axum::{extract::State, Json};
use serde::Serialize;
use tracker_core::error::AppError;

use crate::auth::ResolvedAuthFlags;
use crate::middleware::Ctx;
use crate::models::{AccessLevel, Caller};
use crate::services::ScopedSettings;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AuthFlagsResponse {
    pub caller: Caller,
    pub access_level: AccessLevel,
    /// Attributes set explicitly rather than taken from configuration.
    pub overridden: Vec<&'static str>,
    pub flags: ResolvedAuthFlags,
    pub can_use_standard_login: bool,
    pub can_set_password: bool,
    pub can_create_api_tokens: bool,
}

#[utoipa::path(
    get,
    path = "/auth/flags",
    tag = "Authentication",
    responses((status = 200, description = "Authentication policy in effect for the caller"))
)]
pub async fn auth_flags(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<Json<AuthFlagsResponse>, AppError> {
    let tracker = &state.tracker;
    let caller = ctx.caller();
    let project = ctx.current_project();

    let user = match caller.user_id() {
        Some(id) => tracker.users.find_user(id).await?,
        None => None,
    };
    let access_level = match caller.user_id() {
        Some(id) => tracker
            .users
            .access_level(id, project)
            .await?
            .unwrap_or(AccessLevel::ANYBODY),
        None => AccessLevel::ANYBODY,
    };

    let flags = tracker.flags_for(user.as_ref());
    let settings = ScopedSettings::new(tracker.settings.as_ref(), caller.user_id(), Some(project));
    let resolved = flags.resolve(&settings, tracker.messages.as_ref());

    Ok(Json(AuthFlagsResponse {
        caller,
        access_level,
        overridden: flags.overridden(),
        can_use_standard_login: resolved.can_use_standard_login(access_level),
        can_set_password: resolved.can_set_password(access_level),
        can_create_api_tokens: resolved.can_create_api_tokens(access_level),
        flags: resolved,
    }))
}
