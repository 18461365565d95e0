pub mod auth;
pub mod commands;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracker_core::error::AppError;
use tracker_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use utoipa::OpenApi;

use crate::config::TrackerConfig;
use crate::services::Tracker;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::monitors::add_monitors,
        handlers::monitors::list_monitors,
        handlers::auth::auth_flags,
    ),
    components(schemas(
        handlers::monitors::AddMonitorsRequest,
        commands::UserDescriptor,
        commands::SkipReason,
        commands::SkippedUser,
        commands::MonitorOutcome,
        models::MonitorList,
        models::IssueId,
        models::ProjectId,
        models::UserId,
    )),
    tags(
        (name = "Monitors", description = "Issue monitoring"),
        (name = "Authentication", description = "Authentication policy"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: TrackerConfig,
    pub tracker: Tracker,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let api = Router::new()
        .route(
            "/issues/:issue_id/monitors",
            get(handlers::monitors::list_monitors).post(handlers::monitors::add_monitors),
        )
        .route("/auth/flags", get(handlers::auth::auth_flags))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ));

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(api)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware));

    Ok(app)
}
