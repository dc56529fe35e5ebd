//! HTTP error mapping.
//!
//! The engine surfaces typed errors; this module is the only place they
//! are translated into status codes. Bodies are `{error, message}` with a
//! short machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dashlens::LensError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for API handlers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Unknown node or resource.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Required artifacts are missing or malformed.
    #[error("Artifacts unavailable: {0}")]
    ArtifactUnavailable(String),

    /// The client went away mid-computation.
    #[error("Request cancelled")]
    Cancelled,

    /// Any other fault.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LensError> for ApiError {
    fn from(err: LensError) -> Self {
        match err {
            LensError::ArtifactMissing { .. } | LensError::ArtifactMalformed { .. } => {
                ApiError::ArtifactUnavailable(err.to_string())
            }
            LensError::NodeNotFound(id) => ApiError::NotFound(id),
            LensError::InvalidParameter(msg) => ApiError::BadRequest(msg),
            LensError::Cancelled => ApiError::Cancelled,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    /// Short machine-readable code, also used as a metrics label.
    pub(crate) fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::ArtifactUnavailable(_) => "artifact_unavailable",
            ApiError::Cancelled => "cancelled",
            ApiError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ArtifactUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            // The client is gone; the code is a formality for logs.
            ApiError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Keep internal details out of responses.
            ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        let body = Json(ErrorBody {
            error: self.code().to_string(),
            message,
        });
        (status, body).into_response()
    }
}

/// Result type alias for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::ArtifactUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_lens_error() {
        let err = ApiError::from(LensError::NodeNotFound("model.p.a".into()));
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = ApiError::from(LensError::ArtifactMissing {
            path: "manifest.json".into(),
        });
        assert!(matches!(err, ApiError::ArtifactUnavailable(_)));

        let err = ApiError::from(LensError::InvalidParameter("bad path".into()));
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = ApiError::from(LensError::Cancelled);
        assert!(matches!(err, ApiError::Cancelled));

        let err = ApiError::from(LensError::Internal("boom".into()));
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn test_internal_message_is_generic() {
        let response = ApiError::Internal("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::BadRequest("x".into()).code(), "bad_request");
        assert_eq!(ApiError::NotFound("x".into()).code(), "not_found");
        assert_eq!(
            ApiError::ArtifactUnavailable("x".into()).code(),
            "artifact_unavailable"
        );
        assert_eq!(ApiError::Internal("x".into()).code(), "internal");
    }
}
