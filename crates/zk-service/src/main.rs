use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use talent_zk_prover::artifacts::load_verifying_key;
use talent_zk_prover::{Circuit, CircuitKeys, MarketplaceVerifier, ProofJson};
use talent_zk_service::ServiceConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Proof files larger than this are refused before parsing
const MAX_PROOF_FILE_SIZE: u64 = 1024 * 1024;

/// Proof file layout; a saved endpoint response also fits
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofFile {
    proof: ProofJson,
    public_signals: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: ./talent-zk.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        #[arg(long)]
        listen: Option<SocketAddr>,
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
    /// Generate proving and verification keys
    Setup {
        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,
        /// Circuit to set up; repeat for several (default: all)
        #[arg(long = "circuit")]
        circuits: Vec<Circuit>,
        /// Deterministic setup for tests; never use for real keys
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Verify a proof file holding `{proof, publicSignals}`
    Verify {
        #[arg(long)]
        circuit: Circuit,
        #[arg(long)]
        proof: PathBuf,
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { listen, artifacts } => {
            let mut config = ServiceConfig::load(cli.config.as_deref())?;
            if let Some(listen) = listen {
                config.listen = listen;
            }
            if let Some(dir) = artifacts {
                config.artifacts_dir = dir;
            }
            talent_zk_service::serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Setup {
            artifacts,
            circuits,
            seed,
        } => {
            let circuits = if circuits.is_empty() {
                Circuit::ALL.to_vec()
            } else {
                circuits
            };
            tokio::task::spawn_blocking(move || setup(&artifacts, &circuits, seed)).await??;
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify {
            circuit,
            proof,
            artifacts,
        } => {
            let dir = match artifacts {
                Some(dir) => dir,
                None => ServiceConfig::load(cli.config.as_deref())?.artifacts_dir,
            };
            let valid = verify(&dir, circuit, &proof)?;
            println!("{}", if valid { "valid" } else { "invalid" });
            Ok(if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn setup(dir: &Path, circuits: &[Circuit], seed: Option<u64>) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for &circuit in circuits {
        let keys = CircuitKeys::setup(circuit, &mut rng)?;
        let target = keys
            .write(dir)
            .with_context(|| format!("failed to write {circuit} artifacts"))?;
        info!(%circuit, dir = %target.display(), "artifacts written");
    }
    Ok(())
}

fn verify(dir: &Path, circuit: Circuit, path: &Path) -> Result<bool> {
    let size = fs::metadata(path)
        .with_context(|| format!("failed to read {}", path.display()))?
        .len();
    if size > MAX_PROOF_FILE_SIZE {
        bail!("proof file is {size} bytes, limit is {MAX_PROOF_FILE_SIZE}");
    }

    let contents = fs::read_to_string(path).context("failed to read proof file")?;
    let file: ProofFile = serde_json::from_str(&contents).context("proof file is not valid JSON")?;

    let vk = load_verifying_key(dir, circuit)?;
    let verifier = MarketplaceVerifier::new().with_verifying_key(circuit, &vk)?;
    Ok(verifier.verify_json(circuit, &file.proof, &file.public_signals))
}
