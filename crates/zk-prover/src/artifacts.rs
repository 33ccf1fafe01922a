//! Key generation and on-disk circuit artifacts
//!
//! Layout, one directory per circuit:
//!
//! ```text
//! <artifacts>/<circuit>/manifest.json
//! <artifacts>/<circuit>/proving_key.bin
//! <artifacts>/<circuit>/verification_key.bin
//! ```
//!
//! Keys come from a single-party Groth16 setup. That is enough for
//! development and tests; a production deployment replaces the key files
//! with the output of a ceremony and keeps the manifest.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintSynthesizer;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, CryptoRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::circuits::{BidValidityCircuit, SelectiveDisclosureCircuit};
use crate::error::{ProverError, Result};
use crate::prover::{compute_public_signals, Circuit};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const PROVING_KEY_FILE: &str = "proving_key.bin";
pub const VERIFICATION_KEY_FILE: &str = "verification_key.bin";

/// Describes which circuit a key pair belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub circuit: Circuit,
    pub version: u32,
    pub public_signals: usize,
    pub protocol: String,
    pub curve: String,
}

impl ArtifactManifest {
    pub fn for_circuit(circuit: Circuit) -> Self {
        Self {
            circuit,
            version: circuit.version(),
            public_signals: circuit.public_signal_count(),
            protocol: "groth16".into(),
            curve: "bn128".into(),
        }
    }

    /// Reject artifacts built for a different circuit or constraint layout
    pub fn check(&self, expected: Circuit) -> Result<()> {
        let wanted = Self::for_circuit(expected);
        if *self != wanted {
            return Err(ProverError::ArtifactMismatch {
                circuit: expected.to_string(),
                reason: format!(
                    "manifest describes {} v{} ({} signals, {}/{}), expected v{}",
                    self.circuit,
                    self.version,
                    self.public_signals,
                    self.protocol,
                    self.curve,
                    wanted.version
                ),
            });
        }
        Ok(())
    }
}

/// Directory holding the artifacts of `circuit`
pub fn circuit_dir(dir: &Path, circuit: Circuit) -> PathBuf {
    dir.join(circuit.file_name())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    if !path.exists() {
        return Err(ProverError::CircuitNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(BufReader::new(File::open(path)?))
}

fn read_manifest(dir: &Path, circuit: Circuit) -> Result<ArtifactManifest> {
    let path = circuit_dir(dir, circuit).join(MANIFEST_FILE);
    let manifest: ArtifactManifest = serde_json::from_reader(open(&path)?)?;
    manifest.check(circuit)?;
    Ok(manifest)
}

fn check_verifying_key(circuit: Circuit, vk: &VerifyingKey<Bn254>) -> Result<()> {
    // gamma_abc_g1 has one entry for the constant plus one per public input
    let inputs = vk.gamma_abc_g1.len().saturating_sub(1);
    if inputs != circuit.public_signal_count() {
        return Err(ProverError::ArtifactMismatch {
            circuit: circuit.to_string(),
            reason: format!(
                "verification key expects {inputs} public inputs, circuit has {}",
                circuit.public_signal_count()
            ),
        });
    }
    Ok(())
}

/// Load and validate only the verification key of `circuit`
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn load_verifying_key(dir: &Path, circuit: Circuit) -> Result<VerifyingKey<Bn254>> {
    read_manifest(dir, circuit)?;

    let path = circuit_dir(dir, circuit).join(VERIFICATION_KEY_FILE);
    debug!("Loading verification key from: {}", path.display());
    let vk = VerifyingKey::<Bn254>::deserialize_compressed(open(&path)?)?;
    check_verifying_key(circuit, &vk)?;
    Ok(vk)
}

/// Proving and verification key of one circuit
pub struct CircuitKeys {
    pub circuit: Circuit,
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
}

impl CircuitKeys {
    /// Run a circuit-specific Groth16 setup
    #[instrument(skip(rng))]
    pub fn setup<R: RngCore + CryptoRng>(circuit: Circuit, rng: &mut R) -> Result<Self> {
        let start = Instant::now();
        let (proving_key, verifying_key) = match circuit {
            Circuit::BidValidity => {
                Groth16::<Bn254>::circuit_specific_setup(BidValidityCircuit::default(), rng)
            }
            Circuit::SelectiveDisclosure => Groth16::<Bn254>::circuit_specific_setup(
                SelectiveDisclosureCircuit::default(),
                rng,
            ),
        }
        .map_err(|e| ProverError::Setup {
            reason: e.to_string(),
        })?;

        info!("Setup for {} finished in {:?}", circuit, start.elapsed());
        Ok(Self {
            circuit,
            proving_key,
            verifying_key,
        })
    }

    /// Write manifest and keys under `dir`, returning the circuit directory
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let target = circuit_dir(dir, self.circuit);
        fs::create_dir_all(&target)?;

        let mut manifest = BufWriter::new(File::create(target.join(MANIFEST_FILE))?);
        serde_json::to_writer_pretty(&mut manifest, &ArtifactManifest::for_circuit(self.circuit))?;
        manifest.flush()?;

        let mut pk = BufWriter::new(File::create(target.join(PROVING_KEY_FILE))?);
        self.proving_key.serialize_uncompressed(&mut pk)?;
        pk.flush()?;

        let mut vk = BufWriter::new(File::create(target.join(VERIFICATION_KEY_FILE))?);
        self.verifying_key.serialize_compressed(&mut vk)?;
        vk.flush()?;

        info!("Wrote {} artifacts to {}", self.circuit, target.display());
        Ok(target)
    }

    /// Load both keys of `circuit` and check that they belong together
    #[instrument(skip(dir), fields(dir = %dir.display()))]
    pub fn load(dir: &Path, circuit: Circuit) -> Result<Self> {
        let verifying_key = load_verifying_key(dir, circuit)?;

        let path = circuit_dir(dir, circuit).join(PROVING_KEY_FILE);
        debug!("Loading proving key from: {}", path.display());
        let start = Instant::now();
        // Checked: every point must be on the curve and in the right subgroup
        let proving_key = ProvingKey::<Bn254>::deserialize_uncompressed(open(&path)?)?;

        if proving_key.vk != verifying_key {
            return Err(ProverError::ArtifactMismatch {
                circuit: circuit.to_string(),
                reason: "proving key and verification key are from different setups".into(),
            });
        }

        let keys = Self {
            circuit,
            proving_key,
            verifying_key,
        };
        keys.self_test()?;

        debug!("Proving key loaded in {:?}", start.elapsed());
        Ok(keys)
    }

    /// Prove a fixed satisfiable witness and verify it against the
    /// verification key. Catches a proving key whose points are valid but
    /// not the ones the setup produced.
    fn self_test(&self) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let (public_inputs, proof) = match self.circuit {
            Circuit::BidValidity => {
                prove_fixed(&self.proving_key, BidValidityCircuit::new(1, 1), &mut rng)?
            }
            Circuit::SelectiveDisclosure => prove_fixed(
                &self.proving_key,
                SelectiveDisclosureCircuit::default(),
                &mut rng,
            )?,
        };

        let verified = Groth16::<Bn254>::verify(&self.verifying_key, &public_inputs, &proof)
            .unwrap_or(false);
        if !verified {
            return Err(ProverError::ArtifactMismatch {
                circuit: self.circuit.to_string(),
                reason: "proving key does not produce verifiable proofs".into(),
            });
        }
        Ok(())
    }
}

fn prove_fixed<C>(
    pk: &ProvingKey<Bn254>,
    circuit: C,
    rng: &mut StdRng,
) -> Result<(Vec<Fr>, Proof<Bn254>)>
where
    C: ConstraintSynthesizer<Fr> + Clone,
{
    let public_inputs = compute_public_signals(circuit.clone())?;
    let proof = Groth16::<Bn254>::prove(pk, circuit, rng).map_err(|e| ProverError::Setup {
        reason: e.to_string(),
    })?;
    Ok((public_inputs, proof))
}
