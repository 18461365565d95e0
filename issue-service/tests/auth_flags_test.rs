//! AuthFlags attributes and the `/auth/flags` endpoint.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, DANA_TOKEN, RITA_TOKEN};
use issue_service::auth::{AuthFlags, PerUserAuthFlags};
use issue_service::models::{AccessLevel, ConfigValue, ProjectId, Threshold, UserId};
use issue_service::services::lang::PASSWORD_MANAGED_ELSEWHERE_MESSAGE;
use issue_service::services::settings::{
    ALLOW_ANONYMOUS_LOGIN, ALLOW_SIGNUP, COOKIE_TIME_LENGTH, LOGOUT_REDIRECT_PAGE,
    REAUTHENTICATION, REAUTHENTICATION_EXPIRY,
};
use issue_service::services::{LayeredSettings, MessageCatalog};

#[test]
fn unset_flags_use_documented_defaults() {
    let settings = LayeredSettings::new();
    let catalog = MessageCatalog::english();
    let flags = AuthFlags::new();

    assert!(flags.signup_enabled(&settings));
    assert_eq!(flags.signup_access_level(&settings), AccessLevel::REPORTER);
    assert!(!flags.anonymous_enabled(&settings));
    assert_eq!(flags.anonymous_account(&settings), "");
    assert_eq!(flags.set_password_threshold(), Threshold::Level(AccessLevel::ANYBODY));
    assert_eq!(
        flags.password_managed_externally_message(&catalog),
        catalog_message(&catalog)
    );
    assert_eq!(flags.create_api_tokens_threshold(), Threshold::Level(AccessLevel::VIEWER));
    assert_eq!(flags.standard_login_threshold(), Threshold::Level(AccessLevel::ANYBODY));
    assert_eq!(flags.login_page(), "login_page.php");
    assert_eq!(flags.logout_page(), "logout_page.php");
    assert_eq!(flags.logout_redirect_page(&settings), "login_page.php");
    assert_eq!(flags.session_lifetime(), 0);
    assert!(flags.perm_session_enabled(&settings));
    assert_eq!(flags.perm_session_lifetime(&settings), 31_536_000);
    assert!(flags.reauthentication_enabled(&settings));
    assert_eq!(flags.reauthentication_lifetime(&settings), 300);
}

fn catalog_message(catalog: &MessageCatalog) -> Option<String> {
    use issue_service::services::Localizer;
    catalog.message(PASSWORD_MANAGED_ELSEWHERE_MESSAGE)
}

#[test]
fn every_attribute_returns_what_was_set() {
    let settings = LayeredSettings::new();
    let catalog = MessageCatalog::english();
    let mut flags = AuthFlags::new();

    flags.set_signup_enabled(false);
    flags.set_signup_access_level(AccessLevel::UPDATER);
    flags.set_anonymous_enabled(true);
    flags.set_anonymous_account("guest");
    flags.set_set_password_threshold(Threshold::Level(AccessLevel::NOBODY));
    flags.set_password_managed_externally_message("Use the company portal.");
    flags.set_create_api_tokens_threshold(Threshold::AnyOf(vec![AccessLevel::MANAGER]));
    flags.set_standard_login_threshold(Threshold::Level(AccessLevel::ADMINISTRATOR));
    flags.set_login_page("sso_login.php");
    flags.set_logout_page("sso_logout.php");
    flags.set_logout_redirect_page("https://intranet.example/");
    flags.set_session_lifetime(3_600);
    flags.set_perm_session_enabled(false);
    flags.set_perm_session_lifetime(86_400);
    flags.set_reauthentication_enabled(false);
    flags.set_reauthentication_lifetime(120);

    assert!(!flags.signup_enabled(&settings));
    assert_eq!(flags.signup_access_level(&settings), AccessLevel::UPDATER);
    assert!(flags.anonymous_enabled(&settings));
    assert_eq!(flags.anonymous_account(&settings), "guest");
    assert_eq!(flags.set_password_threshold(), Threshold::Level(AccessLevel::NOBODY));
    assert_eq!(
        flags.password_managed_externally_message(&catalog).as_deref(),
        Some("Use the company portal.")
    );
    assert_eq!(
        flags.create_api_tokens_threshold(),
        Threshold::AnyOf(vec![AccessLevel::MANAGER])
    );
    assert_eq!(
        flags.standard_login_threshold(),
        Threshold::Level(AccessLevel::ADMINISTRATOR)
    );
    assert_eq!(flags.login_page(), "sso_login.php");
    assert_eq!(flags.logout_page(), "sso_logout.php");
    assert_eq!(flags.logout_redirect_page(&settings), "https://intranet.example/");
    assert_eq!(flags.session_lifetime(), 3_600);
    assert!(!flags.perm_session_enabled(&settings));
    assert_eq!(flags.perm_session_lifetime(&settings), 86_400);
    assert!(!flags.reauthentication_enabled(&settings));
    assert_eq!(flags.reauthentication_lifetime(&settings), 120);

    assert_eq!(flags.overridden().len(), 16);
}

#[test]
fn setting_twice_keeps_the_last_value() {
    let mut flags = AuthFlags::new();
    flags.set_login_page("first.php");
    flags.set_login_page("second.php");
    assert_eq!(flags.login_page(), "second.php");
}

#[test]
fn delegated_defaults_track_configuration() {
    let mut settings = LayeredSettings::new();
    settings.set_global(ALLOW_SIGNUP, ConfigValue::Int(0));
    settings.set_global(ALLOW_ANONYMOUS_LOGIN, ConfigValue::Bool(true));
    settings.set_global(COOKIE_TIME_LENGTH, ConfigValue::Int(7_200));
    settings.set_global(LOGOUT_REDIRECT_PAGE, "goodbye.php".into());
    settings.set(REAUTHENTICATION, ConfigValue::Int(0), UserId::ALL_USERS, ProjectId::ALL_PROJECTS);
    settings.set(REAUTHENTICATION_EXPIRY, ConfigValue::Int(45), UserId::ALL_USERS, ProjectId::ALL_PROJECTS);

    let flags = AuthFlags::new();

    assert!(!flags.signup_enabled(&settings));
    assert!(flags.anonymous_enabled(&settings));
    assert_eq!(flags.perm_session_lifetime(&settings), 7_200);
    assert_eq!(flags.logout_redirect_page(&settings), "goodbye.php");
    assert!(!flags.reauthentication_enabled(&settings));
    assert_eq!(flags.reauthentication_lifetime(&settings), 45);
}

#[test]
fn missing_catalog_message_is_none() {
    let flags = AuthFlags::new();
    assert_eq!(flags.password_managed_externally_message(&MessageCatalog::default()), None);
}

#[tokio::test]
async fn guest_sees_default_flags() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/auth/flags", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["caller"]["kind"], "guest");
    assert_eq!(body["access_level"], 0);
    assert_eq!(body["flags"]["login_page"], "login_page.php");
    assert_eq!(body["flags"]["perm_session_lifetime"], 31_536_000);
    assert_eq!(body["overridden"], serde_json::json!([]));
    assert_eq!(body["can_use_standard_login"], true);
    assert_eq!(body["can_create_api_tokens"], false);
}

#[tokio::test]
async fn anonymous_login_identifies_the_anonymous_account() {
    let app = TestApp::with_anonymous_login().await;

    let (status, body) = app.get("/auth/flags", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["caller"]["kind"], "anonymous");
    assert_eq!(body["caller"]["user_id"], 5);
    assert_eq!(body["flags"]["anonymous_enabled"], true);
    assert_eq!(body["flags"]["anonymous_account"], "anon");
}

#[tokio::test]
async fn per_user_flags_are_selected_for_the_caller() {
    let mut sso = AuthFlags::new();
    sso.set_login_page("plugin.php?page=Sso/login");
    sso.set_set_password_threshold(Threshold::Level(AccessLevel::NOBODY));
    let mut provider = PerUserAuthFlags::new(AuthFlags::new());
    provider.insert(UserId(2), sso);

    let base = TestApp::spawn().await;
    let tracker = issue_service::services::Tracker {
        auth_flags: std::sync::Arc::new(provider),
        ..base.tracker.clone()
    };
    let app = common::TestApp::from_tracker(base.store.clone(), base.settings.clone(), tracker).await;

    let (_, dana) = app.get("/auth/flags", Some(DANA_TOKEN)).await;
    assert_eq!(dana["flags"]["login_page"], "plugin.php?page=Sso/login");
    assert_eq!(dana["can_set_password"], false);
    assert_eq!(dana["overridden"], serde_json::json!(["set_password_threshold", "login_page"]));

    let (_, rita) = app.get("/auth/flags", Some(RITA_TOKEN)).await;
    assert_eq!(rita["flags"]["login_page"], "login_page.php");
    assert_eq!(rita["can_set_password"], true);
}

#[tokio::test]
async fn flags_resolve_for_the_selected_project() {
    let app = TestApp::spawn().await;
    app.settings.set(
        REAUTHENTICATION_EXPIRY,
        ConfigValue::Int(30),
        UserId::ALL_USERS,
        ProjectId(1),
    );

    let (_, outside) = app.get("/auth/flags", Some(RITA_TOKEN)).await;
    assert_eq!(outside["flags"]["reauthentication_lifetime"], 300);

    let (_, inside) = app
        .send(Method::GET, "/auth/flags", Some(RITA_TOKEN), &[("x-project-id", "1")], None)
        .await;
    assert_eq!(inside["flags"]["reauthentication_lifetime"], 30);
    assert_eq!(inside["access_level"], 25);
}
