//! Authentication policy flags.
//!
//! Every attribute is either overridden explicitly (for example by an
//! integration that owns logins) or resolved from its default source: a fixed
//! constant, the global configuration, the per-user/per-project configuration
//! or the message catalog.

use serde::{Deserialize, Serialize};

use crate::models::{AccessLevel, Threshold};
use crate::services::lang::{Localizer, PASSWORD_MANAGED_ELSEWHERE_MESSAGE};
use crate::services::settings::{
    ConfigResolver, ConfigResolverExt, ALLOW_ANONYMOUS_LOGIN, ALLOW_PERMANENT_COOKIE,
    ALLOW_SIGNUP, ANONYMOUS_ACCOUNT, COOKIE_TIME_LENGTH, DEFAULT_NEW_ACCOUNT_ACCESS_LEVEL,
    LOGOUT_REDIRECT_PAGE, REAUTHENTICATION, REAUTHENTICATION_EXPIRY,
};

pub const DEFAULT_LOGIN_PAGE: &str = "login_page.php";
pub const DEFAULT_LOGOUT_PAGE: &str = "logout_page.php";

/// A value that is either set explicitly or left to its default source.
///
/// Serialized as an optional value: `null`/absent means [`Setting::UseDefault`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<T>", into = "Option<T>")]
pub enum Setting<T: Clone> {
    UseDefault,
    Override(T),
}

impl<T: Clone> Default for Setting<T> {
    fn default() -> Self {
        Setting::UseDefault
    }
}

impl<T: Clone> Setting<T> {
    pub fn is_override(&self) -> bool {
        matches!(self, Setting::Override(_))
    }

    pub fn as_override(&self) -> Option<&T> {
        match self {
            Setting::Override(value) => Some(value),
            Setting::UseDefault => None,
        }
    }

    /// The override, or the default computed on demand.
    pub fn resolve_with(&self, default: impl FnOnce() -> T) -> T {
        match self {
            Setting::Override(value) => value.clone(),
            Setting::UseDefault => default(),
        }
    }
}

impl<T: Clone> From<Option<T>> for Setting<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Setting::Override(v),
            None => Setting::UseDefault,
        }
    }
}

impl<T: Clone> From<Setting<T>> for Option<T> {
    fn from(value: Setting<T>) -> Self {
        match value {
            Setting::Override(v) => Some(v),
            Setting::UseDefault => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthFlags {
    signup_enabled: Setting<bool>,
    signup_access_level: Setting<AccessLevel>,
    anonymous_enabled: Setting<bool>,
    /// Username of the guest account.
    anonymous_account: Setting<String>,
    set_password_threshold: Setting<Threshold>,
    password_managed_externally_message: Setting<String>,
    create_api_tokens_threshold: Setting<Threshold>,
    standard_login_threshold: Setting<Threshold>,
    login_page: Setting<String>,
    logout_page: Setting<String>,
    /// Page shown after logout. May point outside the tracker.
    logout_redirect_page: Setting<String>,
    /// Seconds; 0 means a browser session.
    session_lifetime: Setting<u64>,
    perm_session_enabled: Setting<bool>,
    perm_session_lifetime: Setting<u64>,
    reauthentication_enabled: Setting<bool>,
    reauthentication_lifetime: Setting<u64>,
}

impl AuthFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_signup_enabled(&mut self, enabled: bool) {
        self.signup_enabled = Setting::Override(enabled);
    }

    pub fn signup_enabled(&self, config: &dyn ConfigResolver) -> bool {
        self.signup_enabled
            .resolve_with(|| config.global_flag(ALLOW_SIGNUP).unwrap_or(false))
    }

    pub fn set_signup_access_level(&mut self, access_level: AccessLevel) {
        self.signup_access_level = Setting::Override(access_level);
    }

    pub fn signup_access_level(&self, config: &dyn ConfigResolver) -> AccessLevel {
        self.signup_access_level.resolve_with(|| {
            config
                .access_level(DEFAULT_NEW_ACCOUNT_ACCESS_LEVEL, None)
                .unwrap_or(AccessLevel::REPORTER)
        })
    }

    pub fn set_anonymous_enabled(&mut self, enabled: bool) {
        self.anonymous_enabled = Setting::Override(enabled);
    }

    pub fn anonymous_enabled(&self, config: &dyn ConfigResolver) -> bool {
        self.anonymous_enabled
            .resolve_with(|| config.global_flag(ALLOW_ANONYMOUS_LOGIN).unwrap_or(false))
    }

    pub fn set_anonymous_account(&mut self, username: &str) {
        self.anonymous_account = Setting::Override(username.to_string());
    }

    pub fn anonymous_account(&self, config: &dyn ConfigResolver) -> String {
        self.anonymous_account
            .resolve_with(|| config.global_text(ANONYMOUS_ACCOUNT).unwrap_or_default())
    }

    pub fn set_set_password_threshold(&mut self, threshold: Threshold) {
        self.set_password_threshold = Setting::Override(threshold);
    }

    pub fn set_password_threshold(&self) -> Threshold {
        self.set_password_threshold
            .resolve_with(|| Threshold::Level(AccessLevel::ANYBODY))
    }

    pub fn set_password_managed_externally_message(&mut self, message: &str) {
        self.password_managed_externally_message = Setting::Override(message.to_string());
    }

    /// Message explaining that passwords are managed elsewhere.
    ///
    /// An empty override counts as unset. `None` when the catalog has no
    /// non-empty message either.
    pub fn password_managed_externally_message(&self, messages: &dyn Localizer) -> Option<String> {
        match &self.password_managed_externally_message {
            Setting::Override(message) if !message.is_empty() => Some(message.clone()),
            _ => messages
                .message(PASSWORD_MANAGED_ELSEWHERE_MESSAGE)
                .filter(|m| !m.is_empty()),
        }
    }

    pub fn set_create_api_tokens_threshold(&mut self, threshold: Threshold) {
        self.create_api_tokens_threshold = Setting::Override(threshold);
    }

    pub fn create_api_tokens_threshold(&self) -> Threshold {
        self.create_api_tokens_threshold
            .resolve_with(|| Threshold::Level(AccessLevel::VIEWER))
    }

    pub fn set_standard_login_threshold(&mut self, threshold: Threshold) {
        self.standard_login_threshold = Setting::Override(threshold);
    }

    pub fn standard_login_threshold(&self) -> Threshold {
        self.standard_login_threshold
            .resolve_with(|| Threshold::Level(AccessLevel::ANYBODY))
    }

    pub fn set_login_page(&mut self, page: &str) {
        self.login_page = Setting::Override(page.to_string());
    }

    pub fn login_page(&self) -> String {
        self.login_page
            .resolve_with(|| DEFAULT_LOGIN_PAGE.to_string())
    }

    pub fn set_logout_page(&mut self, page: &str) {
        self.logout_page = Setting::Override(page.to_string());
    }

    pub fn logout_page(&self) -> String {
        self.logout_page
            .resolve_with(|| DEFAULT_LOGOUT_PAGE.to_string())
    }

    pub fn set_logout_redirect_page(&mut self, page: &str) {
        self.logout_redirect_page = Setting::Override(page.to_string());
    }

    pub fn logout_redirect_page(&self, config: &dyn ConfigResolver) -> String {
        self.logout_redirect_page.resolve_with(|| {
            config
                .text(LOGOUT_REDIRECT_PAGE, None, None)
                .unwrap_or_else(|| DEFAULT_LOGIN_PAGE.to_string())
        })
    }

    pub fn set_session_lifetime(&mut self, seconds: u64) {
        self.session_lifetime = Setting::Override(seconds);
    }

    pub fn session_lifetime(&self) -> u64 {
        self.session_lifetime.resolve_with(|| 0)
    }

    pub fn set_perm_session_enabled(&mut self, enabled: bool) {
        self.perm_session_enabled = Setting::Override(enabled);
    }

    pub fn perm_session_enabled(&self, config: &dyn ConfigResolver) -> bool {
        self.perm_session_enabled
            .resolve_with(|| config.global_flag(ALLOW_PERMANENT_COOKIE).unwrap_or(false))
    }

    pub fn set_perm_session_lifetime(&mut self, seconds: u64) {
        self.perm_session_lifetime = Setting::Override(seconds);
    }

    pub fn perm_session_lifetime(&self, config: &dyn ConfigResolver) -> u64 {
        self.perm_session_lifetime
            .resolve_with(|| seconds(config.global_int(COOKIE_TIME_LENGTH)))
    }

    pub fn set_reauthentication_enabled(&mut self, enabled: bool) {
        self.reauthentication_enabled = Setting::Override(enabled);
    }

    pub fn reauthentication_enabled(&self, config: &dyn ConfigResolver) -> bool {
        self.reauthentication_enabled
            .resolve_with(|| config.flag(REAUTHENTICATION, None, None).unwrap_or(true))
    }

    pub fn set_reauthentication_lifetime(&mut self, seconds: u64) {
        self.reauthentication_lifetime = Setting::Override(seconds);
    }

    pub fn reauthentication_lifetime(&self, config: &dyn ConfigResolver) -> u64 {
        self.reauthentication_lifetime
            .resolve_with(|| seconds(config.int(REAUTHENTICATION_EXPIRY, None, None)))
    }

    /// Names of the attributes that carry an explicit override.
    pub fn overridden(&self) -> Vec<&'static str> {
        let flags = [
            ("signup_enabled", self.signup_enabled.is_override()),
            ("signup_access_level", self.signup_access_level.is_override()),
            ("anonymous_enabled", self.anonymous_enabled.is_override()),
            ("anonymous_account", self.anonymous_account.is_override()),
            ("set_password_threshold", self.set_password_threshold.is_override()),
            (
                "password_managed_externally_message",
                self.password_managed_externally_message.is_override(),
            ),
            ("create_api_tokens_threshold", self.create_api_tokens_threshold.is_override()),
            ("standard_login_threshold", self.standard_login_threshold.is_override()),
            ("login_page", self.login_page.is_override()),
            ("logout_page", self.logout_page.is_override()),
            ("logout_redirect_page", self.logout_redirect_page.is_override()),
            ("session_lifetime", self.session_lifetime.is_override()),
            ("perm_session_enabled", self.perm_session_enabled.is_override()),
            ("perm_session_lifetime", self.perm_session_lifetime.is_override()),
            ("reauthentication_enabled", self.reauthentication_enabled.is_override()),
            ("reauthentication_lifetime", self.reauthentication_lifetime.is_override()),
        ];
        flags
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name)
            .collect()
    }

    /// Snapshot with every attribute resolved.
    pub fn resolve(&self, config: &dyn ConfigResolver, messages: &dyn Localizer) -> ResolvedAuthFlags {
        ResolvedAuthFlags {
            signup_enabled: self.signup_enabled(config),
            signup_access_level: self.signup_access_level(config),
            anonymous_enabled: self.anonymous_enabled(config),
            anonymous_account: self.anonymous_account(config),
            set_password_threshold: self.set_password_threshold(),
            password_managed_externally_message: self.password_managed_externally_message(messages),
            create_api_tokens_threshold: self.create_api_tokens_threshold(),
            standard_login_threshold: self.standard_login_threshold(),
            login_page: self.login_page(),
            logout_page: self.logout_page(),
            logout_redirect_page: self.logout_redirect_page(config),
            session_lifetime: self.session_lifetime(),
            perm_session_enabled: self.perm_session_enabled(config),
            perm_session_lifetime: self.perm_session_lifetime(config),
            reauthentication_enabled: self.reauthentication_enabled(config),
            reauthentication_lifetime: self.reauthentication_lifetime(config),
        }
    }
}

fn seconds(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAuthFlags {
    pub signup_enabled: bool,
    pub signup_access_level: AccessLevel,
    pub anonymous_enabled: bool,
    pub anonymous_account: String,
    pub set_password_threshold: Threshold,
    pub password_managed_externally_message: Option<String>,
    pub create_api_tokens_threshold: Threshold,
    pub standard_login_threshold: Threshold,
    pub login_page: String,
    pub logout_page: String,
    pub logout_redirect_page: String,
    pub session_lifetime: u64,
    pub perm_session_enabled: bool,
    pub perm_session_lifetime: u64,
    pub reauthentication_enabled: bool,
    pub reauthentication_lifetime: u64,
}

impl ResolvedAuthFlags {
    pub fn can_use_standard_login(&self, level: AccessLevel) -> bool {
        self.standard_login_threshold.is_met_by(level)
    }

    pub fn can_set_password(&self, level: AccessLevel) -> bool {
        self.set_password_threshold.is_met_by(level)
    }

    pub fn can_create_api_tokens(&self, level: AccessLevel) -> bool {
        self.create_api_tokens_threshold.is_met_by(level)
    }
}

/// Load overrides from the `[auth_flags]` table of the settings file and
/// `TRACKER_AUTH_FLAGS__*` environment variables. Missing table means no
/// overrides.
pub fn load_auth_flags(name: &str) -> Result<AuthFlags, tracker_core::error::AppError> {
    let config = tracker_core::config::layered(name, "TRACKER").build()?;
    match config.get::<AuthFlags>("auth_flags") {
        Ok(flags) => {
            tracing::info!(overrides = ?flags.overridden(), "Loaded auth flag overrides");
            Ok(flags)
        }
        Err(config::ConfigError::NotFound(_)) => Ok(AuthFlags::default()),
        Err(e) => Err(e.into()),
    }
}
