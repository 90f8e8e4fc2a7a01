use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use storyshot_core::error::{CoreError, JobError};

/// Application-level error type for HTTP handlers.
///
/// Wraps the engine's [`JobError`] and [`CoreError`] and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An engine error from a studio operation.
    #[error(transparent)]
    Job(#[from] JobError),

    /// A domain-level error from `storyshot_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Job(job) => classify_job_error(job),
            AppError::Core(core) => classify_job_error(core.into()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map an engine error onto an HTTP status, error code and message.
///
/// Provider failures are reported as `502` since the studio itself is
/// healthy; store failures as `503`.
fn classify_job_error(err: JobError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        JobError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
        JobError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
        JobError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        JobError::Network(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message),
        JobError::RemoteJobFailed(_) => (StatusCode::BAD_GATEWAY, "REMOTE_JOB_FAILED", message),
        JobError::NoMediaFound(_) => (StatusCode::BAD_GATEWAY, "NO_MEDIA_FOUND", message),
        JobError::Persistence(_) => {
            tracing::error!(error = %message, "Clip store error");
            (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_ERROR", message)
        }
        JobError::Cancelled => (StatusCode::CONFLICT, "CANCELLED", message),
    }
}
