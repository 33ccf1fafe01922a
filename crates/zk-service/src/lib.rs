//! HTTP front end for the talent marketplace proofs
//!
//! Serves bid validity and selective disclosure proving, plus a small store
//! of verified proofs that counterparties can fetch by key.

pub mod cache;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use talent_zk_prover::{CircuitKeys, MarketplaceProver, MarketplaceVerifier};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use cache::{ProofCache, StoredProof};
pub use config::{CacheBackend, CacheConfig, ServiceConfig};
pub use error::ApiError;
pub use routes::{router, AppState};

/// Load the configured circuits' keys.
///
/// With `strict_artifacts` any failure aborts start-up; otherwise the circuit
/// is left out and its endpoint reports it as unavailable.
pub fn load_services(
    config: &ServiceConfig,
) -> anyhow::Result<(MarketplaceProver, MarketplaceVerifier)> {
    let mut prover = MarketplaceProver::new();
    let mut verifier = MarketplaceVerifier::new();

    for &circuit in &config.circuits {
        let keys = match CircuitKeys::load(&config.artifacts_dir, circuit) {
            Ok(keys) => keys,
            Err(e) if config.strict_artifacts => {
                return Err(e).with_context(|| {
                    format!(
                        "failed to load {circuit} artifacts from {}",
                        config.artifacts_dir.display()
                    )
                });
            }
            Err(e) => {
                warn!(%circuit, error = %e, "circuit disabled, artifacts unusable");
                continue;
            }
        };

        verifier = verifier.with_verifying_key(circuit, &keys.verifying_key)?;
        prover = prover.with_proving_key(circuit, keys.proving_key);
        info!(%circuit, "circuit enabled");
    }

    Ok((prover, verifier))
}

/// Run the HTTP service until Ctrl-C
pub async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let (prover, verifier) = tokio::task::spawn_blocking({
        let config = config.clone();
        move || load_services(&config)
    })
    .await??;

    let cache = ProofCache::open(&config.cache)
        .await
        .context("failed to open proof cache")?;
    let state = AppState::new(Arc::new(prover), Arc::new(verifier), cache.clone());
    let app = router(state, config.max_body_bytes);

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cache.close().await;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
