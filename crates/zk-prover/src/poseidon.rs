//! Poseidon commitments, natively and as an R1CS gadget
//!
//! Both sides use the same `ark-crypto-primitives` sponge with the same
//! parameters, so a commitment computed here always matches the one the
//! selective-disclosure circuit exposes as a public signal.

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

/// Full S-box rounds
pub const FULL_ROUNDS: usize = 8;
/// Partial S-box rounds for a width-3 state over BN254 with alpha = 5
pub const PARTIAL_ROUNDS: usize = 57;
/// S-box exponent
pub const ALPHA: u64 = 5;

const RATE: usize = 2;
const CAPACITY: usize = 1;

/// Shared sponge parameters, derived once per process
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();
    CONFIG.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            u64::from(Fr::MODULUS_BIT_SIZE),
            RATE,
            FULL_ROUNDS as u64,
            PARTIAL_ROUNDS as u64,
            0,
        );
        PoseidonConfig::new(FULL_ROUNDS, PARTIAL_ROUNDS, ALPHA, mds, ark, RATE, CAPACITY)
    })
}

/// Poseidon hasher matching the in-circuit gadget
pub struct PoseidonHasher {
    config: &'static PoseidonConfig<Fr>,
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseidonHasher {
    /// Create a new Poseidon hasher
    pub fn new() -> Self {
        Self {
            config: poseidon_config(),
        }
    }

    /// Hash inputs using Poseidon
    pub fn hash(&self, inputs: &[Fr]) -> Fr {
        let mut sponge = PoseidonSponge::new(self.config);
        for input in inputs {
            sponge.absorb(input);
        }
        sponge.squeeze_native_field_elements(1)[0]
    }

    /// Commitment to an attribute: `Poseidon(value, disclosed)`.
    ///
    /// Binding the flag lets a viewer check a disclosed slot against its
    /// commitment without learning anything about hidden ones.
    pub fn commit_attribute(&self, value: &Fr, disclosed: bool) -> Fr {
        self.hash(&[*value, Fr::from(disclosed)])
    }
}

/// In-circuit counterpart of [`PoseidonHasher::hash`]
pub fn hash_gadget(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, poseidon_config());
    for input in inputs {
        sponge.absorb(input)?;
    }
    let mut output = sponge.squeeze_field_elements(1)?;
    output.pop().ok_or(SynthesisError::Unsatisfiable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_r1cs_std::alloc::AllocVar;
    use ark_r1cs_std::R1CSVar;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_poseidon_hash() {
        let hasher = PoseidonHasher::new();

        let input1 = Fr::from(1u64);
        let input2 = Fr::from(2u64);

        let hash = hasher.hash(&[input1, input2]);

        // Verify hash is deterministic
        let hash2 = hasher.hash(&[input1, input2]);
        assert_eq!(hash, hash2);

        // Order matters
        assert_ne!(hash, hasher.hash(&[input2, input1]));
    }

    #[test]
    fn test_commitment_binds_flag() {
        let hasher = PoseidonHasher::new();
        let value = Fr::from(60u64);

        let disclosed = hasher.commit_attribute(&value, true);
        let hidden = hasher.commit_attribute(&value, false);
        assert_ne!(disclosed, hidden);

        // Different inputs -> different commitment
        assert_ne!(disclosed, hasher.commit_attribute(&Fr::from(61u64), true));
    }

    #[test]
    fn test_gadget_matches_native() {
        let hasher = PoseidonHasher::new();
        let value = Fr::from(110_105_103_104_116_115u64);
        let expected = hasher.commit_attribute(&value, true);

        let cs = ConstraintSystem::<Fr>::new_ref();
        let value_var = FpVar::new_witness(cs.clone(), || Ok(value)).unwrap();
        let flag_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64))).unwrap();
        let out = hash_gadget(cs.clone(), &[value_var, flag_var]).unwrap();

        assert_eq!(out.value().unwrap(), expected);
        assert!(cs.is_satisfied().unwrap());
    }
}
