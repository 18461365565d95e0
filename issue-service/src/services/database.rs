//! PostgreSQL store.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracker_core::error::AppError;

use super::error::ServiceError;
use super::settings::ConfigOverride;
use super::store::{IssueStore, UserStore};
use crate::models::{AccessLevel, ConfigValue, Issue, IssueId, ProjectId, User, UserId};
use crate::utils::hash_api_token;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct IssueRow {
    issue_id: i64,
    project_id: i64,
    reporter_id: i64,
    summary: String,
    private: bool,
}

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: i64,
    username: String,
    realname: String,
    access_level: i16,
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    config_id: String,
    user_id: i64,
    project_id: i64,
    value: String,
}

fn id(value: i64) -> Result<u32, ServiceError> {
    u32::try_from(value).map_err(|_| ServiceError::IdOutOfRange(value))
}

fn level(value: i16) -> AccessLevel {
    AccessLevel(u16::try_from(value).unwrap_or(0))
}

impl TryFrom<IssueRow> for Issue {
    type Error = ServiceError;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        Ok(Issue {
            id: IssueId(id(row.issue_id)?),
            project_id: ProjectId(id(row.project_id)?),
            reporter_id: UserId(id(row.reporter_id)?),
            summary: row.summary,
            private: row.private,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = ServiceError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(id(row.user_id)?),
            username: row.username,
            realname: row.realname,
            access_level: level(row.access_level),
        })
    }
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, AppError> {
        tracing::info!(max_connections, "Connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(ServiceError::from)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(ServiceError::from)?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                ServiceError::from(e)
            })?;
        Ok(())
    }

    /// All stored configuration overrides. Rows whose value is not valid JSON
    /// are skipped with a warning.
    pub async fn load_config_overrides(&self) -> Result<Vec<ConfigOverride>, AppError> {
        let rows = sqlx::query_as::<_, OverrideRow>(
            "SELECT config_id, user_id, project_id, value FROM config_overrides",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ServiceError::from)?;

        let mut overrides = Vec::with_capacity(rows.len());
        for row in rows {
            let value = match serde_json::from_str::<ConfigValue>(&row.value) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key = %row.config_id, error = %e, "Skipping unreadable config override");
                    continue;
                }
            };
            overrides.push(ConfigOverride {
                key: row.config_id,
                user: UserId(id(row.user_id)?),
                project: ProjectId(id(row.project_id)?),
                value,
            });
        }
        Ok(overrides)
    }
}

#[async_trait]
impl IssueStore for Database {
    async fn find_issue(&self, issue: IssueId) -> Result<Option<Issue>, AppError> {
        let row = sqlx::query_as::<_, IssueRow>(
            "SELECT issue_id, project_id, reporter_id, summary, private FROM issues WHERE issue_id = $1",
        )
        .bind(issue.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::from)?;

        Ok(row.map(Issue::try_from).transpose()?)
    }

    async fn add_monitor(&self, issue: IssueId, user: UserId) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO issue_monitors (issue_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (issue_id, user_id) DO NOTHING
            "#,
        )
        .bind(issue.as_i64())
        .bind(user.as_i64())
        .execute(&self.pool)
        .await
        .map_err(ServiceError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn monitors(&self, issue: IssueId) -> Result<Vec<UserId>, AppError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM issue_monitors WHERE issue_id = $1 ORDER BY user_id",
        )
        .bind(issue.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(ServiceError::from)?;

        rows.into_iter()
            .map(|(user_id,)| Ok(UserId(id(user_id)?)))
            .collect::<Result<Vec<_>, ServiceError>>()
            .map_err(AppError::from)
    }
}

#[async_trait]
impl UserStore for Database {
    async fn find_user(&self, user: UserId) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, realname, access_level FROM users WHERE user_id = $1",
        )
        .bind(user.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::from)?;

        Ok(row.map(User::try_from).transpose()?)
    }

    async fn find_id_by_login(&self, username: &str) -> Result<Option<UserId>, AppError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::from)?;

        Ok(row.map(|(user_id,)| id(user_id).map(UserId)).transpose()?)
    }

    async fn find_id_by_realname(&self, realname: &str) -> Result<Option<UserId>, AppError> {
        // Two rows are enough to tell a unique display name from an ambiguous one.
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT user_id FROM users WHERE realname = $1 LIMIT 2")
                .bind(realname)
                .fetch_all(&self.pool)
                .await
                .map_err(ServiceError::from)?;

        match rows.as_slice() {
            [(user_id,)] => Ok(Some(UserId(id(*user_id)?))),
            _ => Ok(None),
        }
    }

    async fn find_id_by_api_token(&self, token: &str) -> Result<Option<UserId>, AppError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT user_id FROM api_tokens WHERE token_hash = $1")
                .bind(hash_api_token(token))
                .fetch_optional(&self.pool)
                .await
                .map_err(ServiceError::from)?;

        Ok(row.map(|(user_id,)| id(user_id).map(UserId)).transpose()?)
    }

    async fn access_level(
        &self,
        user: UserId,
        project: ProjectId,
    ) -> Result<Option<AccessLevel>, AppError> {
        let row: Option<(i16,)> = sqlx::query_as(
            r#"
            SELECT COALESCE(p.access_level, u.access_level)
            FROM users u
            LEFT JOIN project_user_list p
                ON p.user_id = u.user_id AND p.project_id = $2
            WHERE u.user_id = $1
            "#,
        )
        .bind(user.as_i64())
        .bind(project.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::from)?;

        Ok(row.map(|(access_level,)| level(access_level)))
    }
}
