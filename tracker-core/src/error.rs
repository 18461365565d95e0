use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Machine-readable reason codes carried by client-facing errors.
///
/// The numeric values are the tracker's historical error numbers so that API
/// clients written against the older interface keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Generic,
    AccessDenied,
    GpcVarNotFound,
    GpcNotNumber,
    ProtectedAccount,
    UserByNameNotFound,
    UserByIdNotFound,
    BugNotFound,
}

impl ErrorCode {
    pub fn number(&self) -> u32 {
        match self {
            ErrorCode::Generic => 1,
            ErrorCode::AccessDenied => 13,
            ErrorCode::GpcVarNotFound => 200,
            ErrorCode::GpcNotNumber => 202,
            ErrorCode::ProtectedAccount => 806,
            ErrorCode::UserByNameNotFound => 811,
            ErrorCode::UserByIdNotFound => 812,
            ErrorCode::BugNotFound => 1100,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {1}")]
    BadRequest(ErrorCode, anyhow::Error),

    #[error("Not found: {1}")]
    NotFound(ErrorCode, anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Forbidden: {1}")]
    Forbidden(ErrorCode, anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn bad_request(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError::BadRequest(code, anyhow::anyhow!(message.into()))
    }

    pub fn not_found(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError::NotFound(code, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(..) => StatusCode::BAD_REQUEST,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(..) => StatusCode::FORBIDDEN,
            AppError::InternalError(_) | AppError::DatabaseError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::BadRequest(code, _)
            | AppError::NotFound(code, _)
            | AppError::Forbidden(code, _) => *code,
            AppError::Unauthorized(_) => ErrorCode::AccessDenied,
            _ => ErrorCode::Generic,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            code: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status();
        let code = self.code().number();

        let (error_message, details) = match self {
            AppError::BadRequest(_, err)
            | AppError::NotFound(_, err)
            | AppError::Unauthorized(err)
            | AppError::Forbidden(_, err) => (err.to_string(), None),
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal error while handling request");
                ("Internal server error".to_string(), None)
            }
            AppError::DatabaseError(err) => {
                tracing::error!(error = %err, "Database error while handling request");
                ("Database error".to_string(), Some(err.to_string()))
            }
            AppError::ConfigError(err) => (
                "Configuration error".to_string(),
                Some(err.to_string()),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                code,
                details,
            }),
        )
            .into_response()
    }
}
