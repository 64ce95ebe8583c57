//! Request failures and their HTTP rendering.

use crate::error::{AggregationError, SourceError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

/// Why a request could not produce a report.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("metadata source unavailable: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

impl GatewayError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> String {
        match self {
            GatewayError::Source(_) => "source_unavailable".to_string(),
            GatewayError::Aggregation(e) => e.kind().to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let code = self.code();
        error!(code = %code, "Request failed: {}", self);
        let body = serde_json::json!({
            "error": code,
            "message": self.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
