//! HTTP routes
//!
//! Proving runs on the blocking pool; handlers only validate, dispatch and
//! shape the JSON responses.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use talent_zk_prover::{
    BidValidityFlow, BidValidityRequest, Circuit, DisclosureView, MarketplaceProver,
    MarketplaceVerifier, ProofResult, SelectiveDisclosureFlow, SelectiveDisclosureRequest,
};
use tracing::{info, instrument};

use crate::cache::{is_valid_key, ProofCache, StoredProof};
use crate::error::ApiError;

/// Shared, read-only service state
#[derive(Clone)]
pub struct AppState {
    prover: Arc<MarketplaceProver>,
    verifier: Arc<MarketplaceVerifier>,
    cache: ProofCache,
}

impl AppState {
    pub fn new(
        prover: Arc<MarketplaceProver>,
        verifier: Arc<MarketplaceVerifier>,
        cache: ProofCache,
    ) -> Self {
        Self {
            prover,
            verifier,
            cache,
        }
    }

    pub fn cache(&self) -> &ProofCache {
        &self.cache
    }

    fn require_prover(&self, circuit: Circuit) -> Result<(), ApiError> {
        if self.prover.has_circuit(circuit) && self.verifier.has_circuit(circuit) {
            Ok(())
        } else {
            Err(ApiError::Unavailable { circuit })
        }
    }

    fn require_verifier(&self, circuit: Circuit) -> Result<(), ApiError> {
        if self.verifier.has_circuit(circuit) {
            Ok(())
        } else {
            Err(ApiError::Unavailable { circuit })
        }
    }

    /// Run proof work on the blocking pool. A client that disconnects does
    /// not cancel it; the result is dropped.
    async fn run_blocking<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&MarketplaceProver, &MarketplaceVerifier) -> talent_zk_prover::Result<T>
            + Send
            + 'static,
        T: Send + 'static,
    {
        let prover = Arc::clone(&self.prover);
        let verifier = Arc::clone(&self.verifier);
        let result = tokio::task::spawn_blocking(move || work(&prover, &verifier)).await?;
        Ok(result?)
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/bid-validity", post(bid_validity))
        .route("/api/selective-disclosure", post(selective_disclosure))
        .route("/api/proofs", post(store_proof))
        .route("/api/proofs/:key", get(load_proof))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Map body extraction failures without echoing the body back
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            let (status, message) = match &rejection {
                JsonRejection::JsonDataError(_) => (
                    StatusCode::BAD_REQUEST,
                    "Request body does not match the expected schema",
                ),
                JsonRejection::JsonSyntaxError(_) => {
                    (StatusCode::BAD_REQUEST, "Request body is not valid JSON")
                }
                JsonRejection::MissingJsonContentType(_) => (
                    rejection.status(),
                    "Expected `Content-Type: application/json`",
                ),
                _ => (rejection.status(), "Could not read request body"),
            };
            Err(ApiError::BadRequest {
                status,
                message: message.to_string(),
            })
        }
    }
}

#[instrument(skip_all)]
async fn bid_validity(
    State(state): State<AppState>,
    payload: Result<Json<BidValidityRequest>, JsonRejection>,
) -> Result<Json<ProofResult>, ApiError> {
    let request = body(payload)?;
    state.require_prover(Circuit::BidValidity)?;

    let outcome = state
        .run_blocking(move |prover, verifier| BidValidityFlow::new(prover, verifier).run(&request))
        .await?;

    info!(verdict = ?outcome.verdict, is_valid = outcome.result.is_valid, "bid validity checked");
    Ok(Json(outcome.result))
}

#[instrument(skip_all)]
async fn selective_disclosure(
    State(state): State<AppState>,
    payload: Result<Json<SelectiveDisclosureRequest>, JsonRejection>,
) -> Result<Json<ProofResult>, ApiError> {
    let request = body(payload)?;
    state.require_prover(Circuit::SelectiveDisclosure)?;

    let outcome = state
        .run_blocking(move |prover, verifier| {
            SelectiveDisclosureFlow::new(prover, verifier).run(request.values)
        })
        .await?;

    info!(
        flags = ?outcome.flags.to_array(),
        is_valid = outcome.result.is_valid,
        "selective disclosure proved"
    );
    Ok(Json(outcome.result))
}

#[derive(Debug, Deserialize)]
struct StoreProofRequest {
    key: String,
    #[serde(flatten)]
    record: StoredProof,
}

#[derive(Debug, Serialize)]
struct StoredProofResponse {
    key: String,
    #[serde(flatten)]
    record: StoredProof,
    #[serde(skip_serializing_if = "Option::is_none")]
    view: Option<DisclosureView>,
}

fn render_view(record: &StoredProof) -> Result<Option<DisclosureView>, ApiError> {
    match (record.kind, &record.disclosure) {
        (Circuit::SelectiveDisclosure, Some(flags)) => {
            let view = DisclosureView::render(&record.public_signals, flags)
                .map_err(|_| ApiError::InvalidProof)?;
            Ok(Some(view))
        }
        (Circuit::SelectiveDisclosure, None) => {
            Err(ApiError::bad_request("Selective disclosure proofs need `disclosure` flags"))
        }
        (Circuit::BidValidity, _) => Ok(None),
    }
}

#[instrument(skip_all)]
async fn store_proof(
    State(state): State<AppState>,
    payload: Result<Json<StoreProofRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let StoreProofRequest { key, record } = body(payload)?;
    if !is_valid_key(&key) {
        return Err(ApiError::bad_request("Invalid key"));
    }
    state.require_verifier(record.kind)?;
    render_view(&record)?;

    let record = Arc::new(record);
    let candidate = Arc::clone(&record);
    let is_valid = state
        .run_blocking(move |_, verifier| {
            Ok(verifier.verify_json(candidate.kind, &candidate.proof, &candidate.public_signals))
        })
        .await?;
    if !is_valid {
        return Err(ApiError::InvalidProof);
    }

    state.cache.put(&key, &record).await?;
    info!(%key, kind = %record.kind, "proof stored");
    Ok((StatusCode::CREATED, Json(json!({ "key": key }))))
}

#[instrument(skip(state))]
async fn load_proof(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<StoredProofResponse>, ApiError> {
    if !is_valid_key(&key) {
        return Err(ApiError::bad_request("Invalid key"));
    }
    let record = state.cache.get(&key).await?.ok_or(ApiError::NotFound)?;
    let view = render_view(&record)?;
    Ok(Json(StoredProofResponse { key, record, view }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let circuits: Vec<_> = Circuit::ALL
        .into_iter()
        .filter(|&c| state.prover.has_circuit(c) && state.verifier.has_circuit(c))
        .collect();
    Json(json!({
        "status": "ok",
        "circuits": circuits,
        "cache": state.cache.backend().as_str(),
    }))
}
