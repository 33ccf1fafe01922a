//! ZK-SNARK proof generation

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_snark::SNARK;
use ark_std::rand::thread_rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::artifacts::CircuitKeys;
use crate::circuits::{BidValidityCircuit, SelectiveDisclosureCircuit};
use crate::error::{ProverError, Result};
use crate::inputs::{BidValidityInput, CircuitInput, SelectiveDisclosureInput};
use crate::proof::{Proof, ProofWithPublicInputs};
use crate::types::ATTRIBUTE_COUNT;

/// Circuit identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Circuit {
    /// `acceptedPrice <= maxBudget`
    BidValidity,
    /// Per-attribute disclosure with commitments
    SelectiveDisclosure,
}

impl Circuit {
    pub const ALL: [Self; 2] = [Self::BidValidity, Self::SelectiveDisclosure];

    /// Get circuit file name
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::BidValidity => "bid_validity",
            Self::SelectiveDisclosure => "selective_disclosure",
        }
    }

    /// Version of the constraint layout. Keys generated for another
    /// version are rejected at load time.
    pub fn version(&self) -> u32 {
        match self {
            Self::BidValidity | Self::SelectiveDisclosure => 1,
        }
    }

    /// Number of public signals the circuit exposes
    pub fn public_signal_count(&self) -> usize {
        match self {
            Self::BidValidity => 1,
            Self::SelectiveDisclosure => 2 * ATTRIBUTE_COUNT,
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl FromStr for Circuit {
    type Err = ProverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bid_validity" | "bid-validity" => Ok(Self::BidValidity),
            "selective_disclosure" | "selective-disclosure" => Ok(Self::SelectiveDisclosure),
            other => Err(ProverError::CircuitNotFound {
                path: other.to_string(),
            }),
        }
    }
}

/// Witness computation: synthesize `circuit`, check every constraint and
/// return the public signals.
///
/// Groth16 proving does not check satisfiability itself, so this must run
/// before any proof is produced.
pub fn compute_public_signals<C>(circuit: C) -> Result<Vec<Fr>>
where
    C: ConstraintSynthesizer<Fr>,
{
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit
        .generate_constraints(cs.clone())
        .map_err(|e| ProverError::ProofGeneration {
            reason: e.to_string(),
        })?;

    if !cs.is_satisfied()? {
        let constraint = cs.which_is_unsatisfied()?.unwrap_or_default();
        warn!(%constraint, "Witness does not satisfy the circuit");
        return Err(ProverError::ProofGeneration {
            reason: "input violates a circuit constraint".into(),
        });
    }

    let cs = cs.borrow().ok_or_else(|| ProverError::ProofGeneration {
        reason: "constraint system was not constructed".into(),
    })?;
    Ok(cs.instance_assignment[1..].to_vec())
}

/// Groth16 prover for the marketplace circuits
///
/// Holds one proving key per enabled circuit. Immutable once built, so a
/// single instance can be shared across threads behind an `Arc`.
#[derive(Default)]
pub struct MarketplaceProver {
    bid_validity_pk: Option<ProvingKey<Bn254>>,
    selective_disclosure_pk: Option<ProvingKey<Bn254>>,
}

impl MarketplaceProver {
    /// Create a prover with no circuits enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Load proving keys for `circuits` from an artifacts directory
    pub fn from_artifacts(dir: impl AsRef<Path>, circuits: &[Circuit]) -> Result<Self> {
        let dir = dir.as_ref();
        let mut prover = Self::new();
        for &circuit in circuits {
            let keys = CircuitKeys::load(dir, circuit)?;
            prover = prover.with_proving_key(circuit, keys.proving_key);
        }
        Ok(prover)
    }

    pub fn with_proving_key(mut self, circuit: Circuit, pk: ProvingKey<Bn254>) -> Self {
        match circuit {
            Circuit::BidValidity => self.bid_validity_pk = Some(pk),
            Circuit::SelectiveDisclosure => self.selective_disclosure_pk = Some(pk),
        }
        self
    }

    pub fn has_circuit(&self, circuit: Circuit) -> bool {
        self.proving_key(circuit).is_ok()
    }

    fn proving_key(&self, circuit: Circuit) -> Result<&ProvingKey<Bn254>> {
        match circuit {
            Circuit::BidValidity => self.bid_validity_pk.as_ref(),
            Circuit::SelectiveDisclosure => self.selective_disclosure_pk.as_ref(),
        }
        .ok_or_else(|| ProverError::CircuitNotFound {
            path: circuit.file_name().to_string(),
        })
    }

    /// Build circuit with inputs and generate proof
    #[instrument(skip(self, synthesizer), fields(circuit = %circuit))]
    fn build_and_prove<C>(&self, circuit: Circuit, synthesizer: C) -> Result<ProofWithPublicInputs>
    where
        C: ConstraintSynthesizer<Fr> + Clone,
    {
        let pk = self.proving_key(circuit)?;

        info!("Building circuit: {}", circuit);
        let start = Instant::now();

        let public_inputs = compute_public_signals(synthesizer.clone())?;
        if public_inputs.len() != circuit.public_signal_count() {
            return Err(ProverError::ProofGeneration {
                reason: format!(
                    "circuit produced {} public signals, expected {}",
                    public_inputs.len(),
                    circuit.public_signal_count()
                ),
            });
        }

        let witness_time = start.elapsed();
        debug!("Witness generated in {:?}", witness_time);

        // Generate proof
        let prove_start = Instant::now();
        let mut rng = thread_rng();

        let proof = Groth16::<Bn254>::prove(pk, synthesizer, &mut rng).map_err(|e| {
            ProverError::ProofGeneration {
                reason: e.to_string(),
            }
        })?;

        let prove_time = prove_start.elapsed();
        let total_time = start.elapsed();

        info!(
            "Proof generated - witness: {:?}, prove: {:?}, total: {:?}",
            witness_time, prove_time, total_time
        );

        Ok(ProofWithPublicInputs::new(
            Proof::new(proof),
            public_inputs,
            circuit,
        ))
    }

    /// Generate a bid validity proof
    ///
    /// Proves that `accepted_price <= max_budget` without revealing either.
    #[instrument(skip(self, input))]
    pub fn prove_bid_validity(&self, input: &BidValidityInput) -> Result<ProofWithPublicInputs> {
        info!("Generating bid validity proof");
        self.prove(Circuit::BidValidity, &input.to_circuit_input())
    }

    /// Generate a selective disclosure proof
    ///
    /// Reveals the attributes whose flag is set and commits to all five.
    #[instrument(skip(self, input))]
    pub fn prove_selective_disclosure(
        &self,
        input: &SelectiveDisclosureInput,
    ) -> Result<ProofWithPublicInputs> {
        info!(
            flags = ?input.flags(),
            "Generating selective disclosure proof"
        );
        self.prove(Circuit::SelectiveDisclosure, &input.to_circuit_input())
    }

    /// Generate a proof from named circuit signals.
    ///
    /// The signal names must match the circuit's inputs exactly; a missing,
    /// repeated or unknown name fails before any constraint is built.
    pub fn prove(&self, circuit: Circuit, inputs: &CircuitInput) -> Result<ProofWithPublicInputs> {
        match circuit {
            Circuit::BidValidity => {
                self.build_and_prove(circuit, BidValidityCircuit::from_inputs(inputs)?)
            }
            Circuit::SelectiveDisclosure => {
                self.build_and_prove(circuit, SelectiveDisclosureCircuit::from_inputs(inputs)?)
            }
        }
    }
}
