// src/error.rs
//! Error taxonomy for the feed engine and its HTTP surface.
//!
//! Per-item problems ([`NormalizationError`]) are logged and dropped by the
//! aggregator, never fatal to a batch. Per-request problems ([`FeedError`])
//! surface to the caller as the `{code, message, details?, timestamp}`
//! envelope.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

/// Why a single upstream document was rejected during normalization.
#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("coordinates are missing or not finite")]
    InvalidLocation,
    #[error("validity window inverted (valid_from > valid_until)")]
    InvertedWindow,
    #[error("malformed document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Request-level failures of the feed engine.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{0}")]
    Validation(String),
    #[error("upstream fetch failed: {0}")]
    Upstream(String),
    #[error("upstream fetch timed out after {0:?}")]
    UpstreamTimeout(Duration),
    #[error("{0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FeedError {
    pub fn validation(msg: impl Into<String>) -> Self {
        FeedError::Validation(msg.into())
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        FeedError::NotFound(format!("{what} `{id}` not found"))
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            FeedError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            FeedError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            FeedError::UpstreamTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
            FeedError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            FeedError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            // Do not leak internals to callers; the log has the chain.
            FeedError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            code,
            message,
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(
            FeedError::validation("bad radius").status_and_code(),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        );
        assert_eq!(
            FeedError::Upstream("boom".into()).status_and_code().0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            FeedError::UpstreamTimeout(Duration::from_secs(10))
                .status_and_code()
                .0,
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            FeedError::not_found("article", "n42").status_and_code().0,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn not_found_message_names_the_id() {
        let e = FeedError::not_found("article", "n42");
        assert_eq!(e.to_string(), "article `n42` not found");
    }
}
