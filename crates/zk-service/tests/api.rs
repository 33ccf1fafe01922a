//! HTTP endpoints driven through the router without a socket

use std::sync::{Arc, OnceLock};

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use talent_zk_prover::{Circuit, CircuitKeys, MarketplaceProver, MarketplaceVerifier};
use talent_zk_service::{router, AppState, ProofCache};
use tower::ServiceExt;

const BODY_LIMIT: usize = 64 * 1024;

fn services() -> &'static (Arc<MarketplaceProver>, Arc<MarketplaceVerifier>) {
    static SERVICES: OnceLock<(Arc<MarketplaceProver>, Arc<MarketplaceVerifier>)> = OnceLock::new();
    SERVICES.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(7);
        let mut prover = MarketplaceProver::new();
        let mut verifier = MarketplaceVerifier::new();
        for circuit in Circuit::ALL {
            let keys = CircuitKeys::setup(circuit, &mut rng).unwrap();
            verifier = verifier
                .with_verifying_key(circuit, &keys.verifying_key)
                .unwrap();
            prover = prover.with_proving_key(circuit, keys.proving_key);
        }
        (Arc::new(prover), Arc::new(verifier))
    })
}

fn app() -> Router {
    let (prover, verifier) = services();
    router(
        AppState::new(Arc::clone(prover), Arc::clone(verifier), ProofCache::memory()),
        BODY_LIMIT,
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn post(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn developer(disclose_rate: bool, disclose_availability: bool) -> Value {
    json!({
        "values": {
            "rate": "60",
            "rateDisclosed": disclose_rate,
            "availability": "nights",
            "availabilityDisclosed": disclose_availability,
            "skills": "rust, circom",
            "skillsDisclosed": false,
            "resumeFileName": "resume.pdf",
            "exclusions": "",
        }
    })
}

#[tokio::test]
async fn bid_within_budget() {
    let app = app();
    let (status, body) = post(
        &app,
        "/api/bid-validity",
        &json!({ "maxBudget": 100, "acceptedPrice": "80" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicSignals"], json!(["1"]));
    assert_eq!(body["isValid"], true);
    assert_eq!(body["proof"]["protocol"], "groth16");
    assert_eq!(body["proof"]["curve"], "bn128");
}

#[tokio::test]
async fn bid_over_budget_still_verifies() {
    let app = app();
    let (status, body) = post(
        &app,
        "/api/bid-validity",
        &json!({ "maxBudget": 50, "acceptedPrice": 75 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicSignals"], json!(["0"]));
    assert_eq!(body["isValid"], true);
}

#[tokio::test]
async fn bid_missing_field() {
    let app = app();
    let (status, body) = post(&app, "/api/bid-validity", &json!({ "maxBudget": 100 })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("acceptedPrice"));
}

#[tokio::test]
async fn malformed_bodies_are_not_echoed() {
    let app = app();

    let request = Request::post("/api/bid-validity")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"maxBudget\": 12345"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"].as_str().unwrap().contains("12345"));

    let (status, body) = post(&app, "/api/bid-validity", &json!({ "maxBudget": [1] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let request = Request::post("/api/bid-validity")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn oversized_body_rejected() {
    let (prover, verifier) = services();
    let app = router(
        AppState::new(Arc::clone(prover), Arc::clone(verifier), ProofCache::memory()),
        1024,
    );
    let padding = "x".repeat(4096);
    let (status, _) = post(
        &app,
        "/api/bid-validity",
        &json!({ "maxBudget": 1, "acceptedPrice": 1, "padding": padding }),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn missing_required_attribute() {
    let app = app();
    let mut body = developer(true, true);
    body["values"]["availability"] = json!("");
    let (status, body) = post(&app, "/api/selective-disclosure", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("availability"));
}

#[tokio::test]
async fn disclosure_store_and_view() {
    let app = app();
    let (status, result) = post(&app, "/api/selective-disclosure", &developer(true, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["isValid"], true);
    assert_eq!(result["publicSignals"].as_array().unwrap().len(), 10);
    assert_eq!(result["publicSignals"][0], "60");
    assert_eq!(result["publicSignals"][1], "0");

    let (status, stored) = post(
        &app,
        "/api/proofs",
        &json!({
            "key": "dev-42",
            "kind": "selective_disclosure",
            "proof": result["proof"],
            "publicSignals": result["publicSignals"],
            "disclosure": { "rateDisclosed": true },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored["key"], "dev-42");

    let (status, record) = get(&app, "/api/proofs/dev-42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["kind"], "selective_disclosure");

    let attributes = record["view"]["attributes"].as_array().unwrap();
    assert_eq!(attributes.len(), 5);
    assert_eq!(attributes[0]["name"], "rate");
    assert_eq!(attributes[0]["value"], "60");
    for attribute in &attributes[1..] {
        assert_eq!(attribute["disclosed"], false);
        assert_eq!(attribute["value"], "hidden");
    }
}

#[tokio::test]
async fn disclosure_flags_must_match_signals() {
    let app = app();
    let (_, result) = post(&app, "/api/selective-disclosure", &developer(true, false)).await;

    // Claiming availability was disclosed while its slot is zero
    let (status, _) = post(
        &app,
        "/api/proofs",
        &json!({
            "key": "dev-43",
            "kind": "selective_disclosure",
            "proof": result["proof"],
            "publicSignals": result["publicSignals"],
            "disclosure": { "rateDisclosed": true, "availabilityDisclosed": true },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(
        &app,
        "/api/proofs",
        &json!({
            "key": "dev-44",
            "kind": "selective_disclosure",
            "proof": result["proof"],
            "publicSignals": result["publicSignals"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tampered_proof_not_stored() {
    let app = app();
    let (_, result) = post(
        &app,
        "/api/bid-validity",
        &json!({ "maxBudget": 100, "acceptedPrice": 80 }),
    )
    .await;

    let (status, _) = post(
        &app,
        "/api/proofs",
        &json!({
            "key": "bid-1",
            "kind": "bid_validity",
            "proof": result["proof"],
            "publicSignals": ["0"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(&app, "/api/proofs/bid-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(
        &app,
        "/api/proofs",
        &json!({
            "key": "bid-1",
            "kind": "bid_validity",
            "proof": result["proof"],
            "publicSignals": result["publicSignals"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, record) = get(&app, "/api/proofs/bid-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["publicSignals"], json!(["1"]));
    assert!(record.get("view").is_none());
}

#[tokio::test]
async fn invalid_keys() {
    let app = app();
    let (status, _) = get(&app, "/api/proofs/bad$key").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/proofs/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn disabled_circuit_unavailable() {
    let (prover, verifier) = services();
    let app = router(
        AppState::new(
            Arc::clone(prover),
            Arc::new(MarketplaceVerifier::new()),
            ProofCache::memory(),
        ),
        BODY_LIMIT,
    );
    let (status, _) = post(&app, "/api/selective-disclosure", &developer(true, true)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["cache"], "memory");
    assert_eq!(health["circuits"], json!([]));

    // Full service reports both circuits
    let app = router(
        AppState::new(Arc::clone(prover), Arc::clone(verifier), ProofCache::memory()),
        BODY_LIMIT,
    );
    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["circuits"], json!(["bid_validity", "selective_disclosure"]));
}
