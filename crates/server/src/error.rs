use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use marquee_core::error::{ApiError, ErrorEnvelope};
use marquee_db::DbError;
use tracing::error;

/// Newtype wrapper so we can implement `IntoResponse` in this crate.
#[derive(Debug)]
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let envelope = ErrorEnvelope::from(&self.0);
        let mut response = (status, Json(envelope)).into_response();
        if let ApiError::TooManyRequests {
            retry_after_seconds,
        } = self.0
        {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
        }
        response
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Duplicate(what) => Self(ApiError::Conflict(format!("{what} already exists"))),
            other => Self(ApiError::Internal(format!("db error: {other}"))),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self(ApiError::Internal(format!("db error: {e}")))
    }
}
