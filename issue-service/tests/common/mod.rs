#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use issue_service::{
    auth::AuthFlags,
    build_router,
    commands::RequestContext,
    config::{Environment, TrackerConfig},
    models::{AccessLevel, Caller, Issue, ProjectId, User, UserId},
    services::{LayeredSettings, MemoryTracker, Tracker},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

pub const RITA: UserId = UserId(1);
pub const DANA: UserId = UserId(2);
pub const MONA: UserId = UserId(3);
pub const VIC: UserId = UserId(4);
pub const ANON: UserId = UserId(5);

pub const RITA_TOKEN: &str = "tok-rita";
pub const DANA_TOKEN: &str = "tok-dana";
pub const VIC_TOKEN: &str = "tok-vic";

/// Public issue in project 1, reported by Rita.
pub const PUBLIC_ISSUE: u32 = 100;
/// Private issue in project 2, reported by Rita.
pub const PRIVATE_ISSUE: u32 = 101;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryTracker>,
    pub settings: Arc<LayeredSettings>,
    pub tracker: Tracker,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::with_flags(AuthFlags::new()).await
    }

    /// Flags letting the `anon` account in as the anonymous user.
    pub async fn with_anonymous_login() -> Self {
        let mut flags = AuthFlags::new();
        flags.set_anonymous_enabled(true);
        flags.set_anonymous_account("anon");
        Self::with_flags(flags).await
    }

    pub async fn with_flags(flags: AuthFlags) -> Self {
        let store = Arc::new(MemoryTracker::new());
        seed(&store);

        let settings = Arc::new(LayeredSettings::new());
        let tracker = Tracker::in_memory(store.clone(), settings.clone(), Arc::new(flags));

        Self::from_tracker(store, settings, tracker).await
    }

    /// App over a hand-assembled tracker; `store` and `settings` should be the
    /// ones the tracker reads from.
    pub async fn from_tracker(
        store: Arc<MemoryTracker>,
        settings: Arc<LayeredSettings>,
        tracker: Tracker,
    ) -> Self {
        let state = AppState {
            config: test_config(),
            tracker: tracker.clone(),
        };
        let router = build_router(state)
            .await
            .expect("Failed to build test router");

        TestApp {
            router,
            store,
            settings,
            tracker,
        }
    }

    pub fn context_for(&self, caller: Caller) -> RequestContext {
        RequestContext::new(caller, ProjectId::ALL_PROJECTS)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, &[], None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, &[], body).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }
}

fn seed(store: &MemoryTracker) {
    store.insert_user(User::new(1, "rita", "Rita Reporter", AccessLevel::REPORTER));
    store.insert_user(User::new(2, "dana", "Dana Dev", AccessLevel::DEVELOPER));
    store.insert_user(User::new(3, "mona", "Mona Manager", AccessLevel::MANAGER));
    store.insert_user(User::new(4, "vic", "Vic Viewer", AccessLevel::VIEWER));
    store.insert_user(User::new(5, "anon", "Anonymous", AccessLevel::VIEWER));
    store.insert_user(User::new(6, "sam1", "Sam Same", AccessLevel::REPORTER));
    store.insert_user(User::new(7, "sam2", "Sam Same", AccessLevel::REPORTER));

    store.insert_issue(Issue::new(PUBLIC_ISSUE, 1, 1, "Crash on save"));
    store.insert_issue(Issue::new(PRIVATE_ISSUE, 2, 1, "Security hole").private());

    store.insert_api_token(RITA_TOKEN, RITA);
    store.insert_api_token(DANA_TOKEN, DANA);
    store.insert_api_token(VIC_TOKEN, VIC);
}

fn test_config() -> TrackerConfig {
    TrackerConfig {
        common: tracker_core::config::Config { port: 0 },
        environment: Environment::Dev,
        service_name: "issue-service-test".to_string(),
        service_version: "0.0.0-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: None,
        settings_file: "tracker-test".to_string(),
    }
}
