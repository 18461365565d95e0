//! Layered configuration resolution.
//!
//! Values come from a global layer (built-in defaults, then the settings file,
//! then `TRACKER_SETTINGS__*` environment variables) and an override layer
//! keyed by user and project, normally loaded from the database.

use std::collections::HashMap;
use std::sync::RwLock;

use tracker_core::error::AppError;

use crate::models::{AccessLevel, ConfigValue, ProjectId, Threshold, UserId, ON};

pub const ALLOW_SIGNUP: &str = "allow_signup";
pub const DEFAULT_NEW_ACCOUNT_ACCESS_LEVEL: &str = "default_new_account_access_level";
pub const ALLOW_ANONYMOUS_LOGIN: &str = "allow_anonymous_login";
pub const ANONYMOUS_ACCOUNT: &str = "anonymous_account";
pub const LOGOUT_REDIRECT_PAGE: &str = "logout_redirect_page";
pub const ALLOW_PERMANENT_COOKIE: &str = "allow_permanent_cookie";
pub const COOKIE_TIME_LENGTH: &str = "cookie_time_length";
pub const REAUTHENTICATION: &str = "reauthentication";
pub const REAUTHENTICATION_EXPIRY: &str = "reauthentication_expiry";
pub const MONITOR_BUG_THRESHOLD: &str = "monitor_bug_threshold";
pub const MONITOR_ADD_OTHERS_BUG_THRESHOLD: &str = "monitor_add_others_bug_threshold";
pub const PRIVATE_BUG_THRESHOLD: &str = "private_bug_threshold";

/// Built-in defaults; the bottom of the global layer.
pub fn builtin_defaults() -> Vec<(&'static str, ConfigValue)> {
    vec![
        (ALLOW_SIGNUP, ConfigValue::Int(ON)),
        (DEFAULT_NEW_ACCOUNT_ACCESS_LEVEL, AccessLevel::REPORTER.into()),
        (ALLOW_ANONYMOUS_LOGIN, ConfigValue::Int(crate::models::OFF)),
        (ANONYMOUS_ACCOUNT, "".into()),
        (LOGOUT_REDIRECT_PAGE, "login_page.php".into()),
        (ALLOW_PERMANENT_COOKIE, ConfigValue::Int(ON)),
        (COOKIE_TIME_LENGTH, ConfigValue::Int(60 * 60 * 24 * 365)),
        (REAUTHENTICATION, ConfigValue::Int(ON)),
        (REAUTHENTICATION_EXPIRY, ConfigValue::Int(5 * 60)),
        (MONITOR_BUG_THRESHOLD, AccessLevel::REPORTER.into()),
        (MONITOR_ADD_OTHERS_BUG_THRESHOLD, AccessLevel::DEVELOPER.into()),
        (PRIVATE_BUG_THRESHOLD, AccessLevel::DEVELOPER.into()),
    ]
}

pub(crate) fn builtin_default(key: &str) -> Option<ConfigValue> {
    builtin_defaults()
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Configuration lookup as seen by the rest of the service.
pub trait ConfigResolver: Send + Sync {
    /// Most specific value for `key`. `None` for user or project means the
    /// wildcard only.
    fn get(&self, key: &str, user: Option<UserId>, project: Option<ProjectId>)
        -> Option<ConfigValue>;

    /// Value from the global layer only, ignoring per-user/project overrides.
    fn get_global(&self, key: &str) -> Option<ConfigValue>;
}

/// Typed helpers over [`ConfigResolver`]. Each falls back to the built-in
/// default when no layer has a usable value.
pub trait ConfigResolverExt: ConfigResolver {
    fn threshold(
        &self,
        key: &str,
        user: Option<UserId>,
        project: Option<ProjectId>,
    ) -> Option<Threshold> {
        self.get(key, user, project)
            .and_then(|v| v.as_threshold())
            .or_else(|| builtin_default(key).and_then(|v| v.as_threshold()))
    }

    fn access_level(&self, key: &str, project: Option<ProjectId>) -> Option<AccessLevel> {
        self.get(key, None, project)
            .and_then(|v| v.as_access_level())
            .or_else(|| builtin_default(key).and_then(|v| v.as_access_level()))
    }

    fn flag(&self, key: &str, user: Option<UserId>, project: Option<ProjectId>) -> Option<bool> {
        self.get(key, user, project)
            .and_then(|v| v.as_bool())
            .or_else(|| builtin_default(key).and_then(|v| v.as_bool()))
    }

    fn int(&self, key: &str, user: Option<UserId>, project: Option<ProjectId>) -> Option<i64> {
        self.get(key, user, project)
            .and_then(|v| v.as_int())
            .or_else(|| builtin_default(key).and_then(|v| v.as_int()))
    }

    fn text(&self, key: &str, user: Option<UserId>, project: Option<ProjectId>) -> Option<String> {
        self.get(key, user, project)
            .and_then(|v| v.as_str().map(str::to_string))
            .or_else(|| builtin_default(key).and_then(|v| v.as_str().map(str::to_string)))
    }

    fn global_flag(&self, key: &str) -> Option<bool> {
        self.get_global(key)
            .and_then(|v| v.as_bool())
            .or_else(|| builtin_default(key).and_then(|v| v.as_bool()))
    }

    fn global_int(&self, key: &str) -> Option<i64> {
        self.get_global(key)
            .and_then(|v| v.as_int())
            .or_else(|| builtin_default(key).and_then(|v| v.as_int()))
    }

    fn global_text(&self, key: &str) -> Option<String> {
        self.get_global(key)
            .and_then(|v| v.as_str().map(str::to_string))
            .or_else(|| builtin_default(key).and_then(|v| v.as_str().map(str::to_string)))
    }
}

impl<T: ConfigResolver + ?Sized> ConfigResolverExt for T {}

type OverrideKey = (UserId, ProjectId, String);

/// One stored per-user/per-project value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOverride {
    pub key: String,
    pub user: UserId,
    pub project: ProjectId,
    pub value: ConfigValue,
}

pub struct LayeredSettings {
    globals: HashMap<String, ConfigValue>,
    overrides: RwLock<HashMap<OverrideKey, ConfigValue>>,
}

impl Default for LayeredSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LayeredSettings {
    /// Global layer holding only the built-in defaults.
    pub fn new() -> Self {
        Self::with_globals(
            builtin_defaults()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    pub fn with_globals(globals: HashMap<String, ConfigValue>) -> Self {
        Self {
            globals,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Build the global layer from the settings file `name` (table
    /// `[settings]`) and `TRACKER_SETTINGS__*` environment variables on top of
    /// the built-in defaults.
    pub fn load(name: &str) -> Result<Self, AppError> {
        let mut builder = tracker_core::config::layered(name, "TRACKER");
        for (key, value) in builtin_defaults() {
            builder = builder.set_default(format!("settings.{}", key), to_config_value(value))?;
        }
        let config = builder.build()?;
        let globals: HashMap<String, ConfigValue> = config.get("settings")?;

        tracing::info!(keys = globals.len(), source = %name, "Loaded global settings");
        Ok(Self::with_globals(globals))
    }

    /// Store an override. Use `UserId::ALL_USERS` / `ProjectId::ALL_PROJECTS`
    /// for the wildcard.
    pub fn set(&self, key: &str, value: ConfigValue, user: UserId, project: ProjectId) {
        match self.overrides.write() {
            Ok(mut overrides) => {
                overrides.insert((user, project, key.to_string()), value);
            }
            Err(e) => tracing::error!(error = %e, key, "Settings lock poisoned, override dropped"),
        }
    }

    pub fn apply_overrides(&self, overrides: impl IntoIterator<Item = ConfigOverride>) {
        let mut count = 0usize;
        for o in overrides {
            self.set(&o.key, o.value, o.user, o.project);
            count += 1;
        }
        tracing::info!(count, "Applied configuration overrides");
    }

    pub fn set_global(&mut self, key: &str, value: ConfigValue) {
        self.globals.insert(key.to_string(), value);
    }

    fn lookup_override(&self, key: &str, user: UserId, project: ProjectId) -> Option<ConfigValue> {
        let overrides = self.overrides.read().ok()?;
        overrides.get(&(user, project, key.to_string())).cloned()
    }
}

impl ConfigResolver for LayeredSettings {
    fn get(
        &self,
        key: &str,
        user: Option<UserId>,
        project: Option<ProjectId>,
    ) -> Option<ConfigValue> {
        let user = user.unwrap_or(UserId::ALL_USERS);
        let project = project.unwrap_or(ProjectId::ALL_PROJECTS);

        let candidates = [
            (user, project),
            (UserId::ALL_USERS, project),
            (user, ProjectId::ALL_PROJECTS),
            (UserId::ALL_USERS, ProjectId::ALL_PROJECTS),
        ];

        candidates
            .iter()
            .find_map(|(u, p)| self.lookup_override(key, *u, *p))
            .or_else(|| self.get_global(key))
    }

    fn get_global(&self, key: &str) -> Option<ConfigValue> {
        self.globals.get(key).cloned()
    }
}

/// A resolver whose wildcard lookups are answered for a fixed user and
/// project, the way a request sees configuration.
pub struct ScopedSettings<'a> {
    inner: &'a dyn ConfigResolver,
    user: Option<UserId>,
    project: Option<ProjectId>,
}

impl<'a> ScopedSettings<'a> {
    pub fn new(inner: &'a dyn ConfigResolver, user: Option<UserId>, project: Option<ProjectId>) -> Self {
        Self {
            inner,
            user,
            project,
        }
    }
}

impl ConfigResolver for ScopedSettings<'_> {
    fn get(
        &self,
        key: &str,
        user: Option<UserId>,
        project: Option<ProjectId>,
    ) -> Option<ConfigValue> {
        self.inner
            .get(key, user.or(self.user), project.or(self.project))
    }

    fn get_global(&self, key: &str) -> Option<ConfigValue> {
        self.inner.get_global(key)
    }
}

fn to_config_value(value: ConfigValue) -> config::Value {
    match value {
        ConfigValue::Bool(b) => b.into(),
        ConfigValue::Int(i) => i.into(),
        ConfigValue::Text(s) => s.into(),
        ConfigValue::List(items) => items
            .into_iter()
            .map(to_config_value)
            .collect::<Vec<config::Value>>()
            .into(),
    }
}
