//! API errors and their HTTP status codes
//!
//! Caller mistakes map to 4xx with the validation message. Internal
//! failures map to 5xx with a generic body; details stay in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use talent_zk_prover::{Circuit, ErrorKind, ProverError};
use thiserror::Error;
use tracing::{error, warn};

use crate::cache::CacheError;

/// Errors surfaced by the HTTP handlers, rendered as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error("{message}")]
    BadRequest { status: StatusCode, message: String },

    #[error("proof did not verify")]
    InvalidProof,

    #[error("no proof stored under this key")]
    NotFound,

    #[error("{circuit} proofs are not available")]
    Unavailable { circuit: Circuit },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Prover(e) => match e.kind() {
                ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest { status, .. } => *status,
            Self::InvalidProof => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Cache(_) | Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client. Internal failures stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Prover(ProverError::ProofGeneration { .. }) => "Proof generation failed".into(),
            Self::Prover(e) if e.kind() == ErrorKind::InvalidRequest => e.to_string(),
            Self::Prover(_) | Self::Cache(_) | Self::Worker(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let err = ApiError::from(ProverError::UndefinedInput {
            field: "maxBudget".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.public_message().contains("maxBudget"));

        let err = ApiError::from(ProverError::ProofGeneration {
            reason: "constraint 7".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Proof generation failed");

        let err = ApiError::from(ProverError::Setup {
            reason: "/srv/keys/bid_validity".into(),
        });
        assert!(!err.public_message().contains("/srv"));

        assert_eq!(
            ApiError::Unavailable {
                circuit: Circuit::SelectiveDisclosure
            }
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
