//! ZK-SNARK proof verification
//!
//! The verifier fails closed: every public entry point returns a plain
//! `bool`, and anything short of a successful pairing check is `false`.
//! Malformed input is logged at debug level; internal verifier failures
//! are logged as warnings so they stay distinguishable from rejections.

use std::path::Path;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, VerifyingKey};
use ark_snark::SNARK;
use tracing::{debug, info, instrument, warn};

use crate::artifacts::load_verifying_key;
use crate::error::{ErrorKind, ProverError, Result};
use crate::field::string_to_fr;
use crate::proof::{Proof, ProofJson, ProofWithPublicInputs};
use crate::prover::Circuit;

/// Groth16 verifier for the marketplace circuits
#[derive(Default)]
pub struct MarketplaceVerifier {
    bid_validity_vk: Option<PreparedVerifyingKey<Bn254>>,
    selective_disclosure_vk: Option<PreparedVerifyingKey<Bn254>>,
}

impl MarketplaceVerifier {
    /// Create a verifier with no circuits enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Load verification keys for `circuits` from an artifacts directory
    pub fn from_artifacts(dir: impl AsRef<Path>, circuits: &[Circuit]) -> Result<Self> {
        let dir = dir.as_ref();
        let mut verifier = Self::new();
        for &circuit in circuits {
            let vk = load_verifying_key(dir, circuit)?;
            verifier = verifier.with_verifying_key(circuit, &vk)?;
        }
        Ok(verifier)
    }

    pub fn with_verifying_key(
        mut self,
        circuit: Circuit,
        vk: &VerifyingKey<Bn254>,
    ) -> Result<Self> {
        let pvk = Groth16::<Bn254>::process_vk(vk)?;
        match circuit {
            Circuit::BidValidity => self.bid_validity_vk = Some(pvk),
            Circuit::SelectiveDisclosure => self.selective_disclosure_vk = Some(pvk),
        }
        Ok(self)
    }

    pub fn has_circuit(&self, circuit: Circuit) -> bool {
        self.prepared_key(circuit).is_ok()
    }

    fn prepared_key(&self, circuit: Circuit) -> Result<&PreparedVerifyingKey<Bn254>> {
        match circuit {
            Circuit::BidValidity => self.bid_validity_vk.as_ref(),
            Circuit::SelectiveDisclosure => self.selective_disclosure_vk.as_ref(),
        }
        .ok_or_else(|| ProverError::Verification {
            reason: format!("no verification key loaded for {circuit}"),
        })
    }

    /// Verify a proof against decimal-string public signals
    #[instrument(skip(self, proof, public_signals))]
    pub fn verify(&self, circuit: Circuit, proof: &Proof, public_signals: &[String]) -> bool {
        let outcome = public_signals
            .iter()
            .map(|s| string_to_fr(s))
            .collect::<Result<Vec<_>>>()
            .and_then(|inputs| self.try_verify(circuit, proof, &inputs));
        Self::fail_closed(circuit, outcome)
    }

    /// Verify a snarkjs-format proof
    #[instrument(skip(self, proof, public_signals))]
    pub fn verify_json(
        &self,
        circuit: Circuit,
        proof: &ProofJson,
        public_signals: &[String],
    ) -> bool {
        match Proof::from_json(proof) {
            Ok(proof) => self.verify(circuit, &proof, public_signals),
            Err(e) => Self::fail_closed(circuit, Err(e)),
        }
    }

    /// Verify a freshly generated proof
    pub fn verify_proof(&self, proof: &ProofWithPublicInputs) -> bool {
        let outcome = self.try_verify(proof.circuit, &proof.proof, &proof.public_inputs);
        Self::fail_closed(proof.circuit, outcome)
    }

    /// Verify proof using raw bytes and public inputs
    pub fn verify_raw(&self, circuit: Circuit, proof_bytes: &[u8], public_inputs: &[Fr]) -> bool {
        let outcome = Proof::from_bytes(proof_bytes)
            .and_then(|proof| self.try_verify(circuit, &proof, public_inputs));
        Self::fail_closed(circuit, outcome)
    }

    /// Generic proof verification
    fn try_verify(&self, circuit: Circuit, proof: &Proof, public_inputs: &[Fr]) -> Result<bool> {
        let pvk = self.prepared_key(circuit)?;

        if public_inputs.len() != circuit.public_signal_count() {
            return Err(ProverError::InvalidProofFormat {
                reason: format!(
                    "expected {} public signals, got {}",
                    circuit.public_signal_count(),
                    public_inputs.len()
                ),
            });
        }

        info!("Verifying {} proof", circuit);
        let is_valid = Groth16::<Bn254>::verify_with_processed_vk(pvk, public_inputs, &proof.inner)
            .map_err(|e| ProverError::Verification {
                reason: e.to_string(),
            })?;

        info!("Proof verification result: {}", is_valid);
        Ok(is_valid)
    }

    fn fail_closed(circuit: Circuit, outcome: Result<bool>) -> bool {
        match outcome {
            Ok(is_valid) => is_valid,
            Err(e) if e.kind() == ErrorKind::InvalidRequest => {
                debug!(%circuit, error = %e, "Rejected malformed proof");
                false
            }
            Err(e) => {
                warn!(%circuit, error = %e, "Verification error, treating proof as invalid");
                false
            }
        }
    }
}
