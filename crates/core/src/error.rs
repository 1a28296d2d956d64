use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed")]
    Validation(serde_json::Value),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("too many requests, retry in {retry_after_seconds}s")]
    TooManyRequests { retry_after_seconds: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Field-level validation failure, `{"field": ["message", ...]}`.
    pub fn validation(fields: serde_json::Value) -> Self {
        Self::Validation(fields)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Validation(_) => "validation_failed",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::TooManyRequests { .. } => "too_many_requests",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Validation(_) => 422,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::PayloadTooLarge(_) => 413,
            Self::UnsupportedMediaType(_) => 415,
            Self::TooManyRequests { .. } => 429,
            Self::Internal(_) => 500,
        }
    }
}

/// JSON error envelope: `{ "error": { "code": "…", "message": "…", "details": {} } }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl From<&ApiError> for ErrorEnvelope {
    fn from(e: &ApiError) -> Self {
        let details = match e {
            ApiError::Validation(fields) => serde_json::json!({ "fields": fields }),
            ApiError::TooManyRequests {
                retry_after_seconds,
            } => serde_json::json!({ "retry_after_seconds": retry_after_seconds }),
            _ => serde_json::Value::Object(serde_json::Map::new()),
        };
        Self {
            error: ErrorBody {
                code: e.code().to_string(),
                message: e.to_string(),
                details,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_envelope_carries_fields() {
        let err = ApiError::validation(json!({ "title": ["is required"] }));
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.error.code, "validation_failed");
        assert_eq!(envelope.error.details["fields"]["title"][0], "is required");
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn rate_limit_envelope_carries_retry_after() {
        let err = ApiError::TooManyRequests {
            retry_after_seconds: 60,
        };
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(err.status_code(), 429);
        assert_eq!(envelope.error.code, "too_many_requests");
        assert_eq!(envelope.error.details["retry_after_seconds"], 60);
    }

    #[test]
    fn plain_errors_have_empty_details() {
        let envelope = ErrorEnvelope::from(&ApiError::NotFound("movie not found".into()));
        assert_eq!(envelope.error.code, "not_found");
        assert_eq!(envelope.error.message, "not found: movie not found");
        assert_eq!(envelope.error.details, json!({}));
    }
}
