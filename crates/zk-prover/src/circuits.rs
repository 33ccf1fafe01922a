//! Native circuit implementations
//!
//! Both circuits are plain R1CS programs built with `ark-r1cs-std`. Their
//! public inputs are the circuit outputs, allocated in declaration order,
//! which fixes the order of the public signals.

use ark_bn254::Fr;
use ark_ff::{BigInteger, Field, PrimeField};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::poseidon::hash_gadget;
use crate::types::ATTRIBUTE_COUNT;

/// Bit width of the bid comparison (circomlib `LessEqThan(32)`)
pub const BID_COMPARISON_BITS: usize = 32;

/// Decompose `var` into `width` little-endian bits and enforce that they
/// recompose to it. Unsatisfiable when `value >= 2^width`.
fn enforce_bit_width(
    cs: &ConstraintSystemRef<Fr>,
    var: &FpVar<Fr>,
    value: Fr,
    width: usize,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    let native_bits = value.into_bigint().to_bits_le();
    let bits = (0..width)
        .map(|i| {
            Boolean::new_witness(cs.clone(), || {
                Ok(native_bits.get(i).copied().unwrap_or(false))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Boolean::le_bits_to_fp_var(&bits)?.enforce_equal(var)?;
    Ok(bits)
}

/// Bid validity circuit
///
/// Proves: `accepted_price <= max_budget`, exposing only the resulting bit.
/// Both inputs must fit into [`BID_COMPARISON_BITS`] bits.
#[derive(Clone, Default)]
pub struct BidValidityCircuit {
    /// Private: client's maximum budget
    pub max_budget: Fr,
    /// Private: price the developer accepted
    pub accepted_price: Fr,
}

impl BidValidityCircuit {
    /// Create a new bid validity circuit
    pub fn new(max_budget: u64, accepted_price: u64) -> Self {
        Self {
            max_budget: Fr::from(max_budget),
            accepted_price: Fr::from(accepted_price),
        }
    }
}

impl ConstraintSynthesizer<Fr> for BidValidityCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let max_var = FpVar::new_witness(cs.clone(), || Ok(self.max_budget))?;
        let price_var = FpVar::new_witness(cs.clone(), || Ok(self.accepted_price))?;

        enforce_bit_width(&cs, &max_var, self.max_budget, BID_COMPARISON_BITS)?;
        enforce_bit_width(&cs, &price_var, self.accepted_price, BID_COMPARISON_BITS)?;

        // max + 2^n - price has bit n set iff price <= max
        let offset = Fr::from(2u64).pow([BID_COMPARISON_BITS as u64]);
        let shifted = &max_var + offset - &price_var;
        let shifted_value = self.max_budget + offset - self.accepted_price;
        let shifted_bits =
            enforce_bit_width(&cs, &shifted, shifted_value, BID_COMPARISON_BITS + 1)?;

        let is_valid = FpVar::from(shifted_bits[BID_COMPARISON_BITS].clone());
        let output = FpVar::new_input(cs, || is_valid.value())?;
        output.enforce_equal(&is_valid)?;

        Ok(())
    }
}

/// Selective disclosure circuit
///
/// For every attribute, proves knowledge of `value` and exposes
/// `value * disclosed` followed, after all five slots, by the commitment
/// `Poseidon(value, disclosed)`.
#[derive(Clone, Default)]
pub struct SelectiveDisclosureCircuit {
    /// Private: encoded attribute values, in attribute order
    pub values: [Fr; ATTRIBUTE_COUNT],
    /// Private: disclosure flags, in attribute order
    pub disclosed: [bool; ATTRIBUTE_COUNT],
}

impl SelectiveDisclosureCircuit {
    /// Create a new selective disclosure circuit
    pub fn new(values: [Fr; ATTRIBUTE_COUNT], disclosed: [bool; ATTRIBUTE_COUNT]) -> Self {
        Self { values, disclosed }
    }
}

impl ConstraintSynthesizer<Fr> for SelectiveDisclosureCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let mut slots = Vec::with_capacity(ATTRIBUTE_COUNT);
        let mut commitments = Vec::with_capacity(ATTRIBUTE_COUNT);

        for (value, disclosed) in self.values.into_iter().zip(self.disclosed) {
            let value_var = FpVar::new_witness(cs.clone(), || Ok(value))?;
            // Boolean allocation constrains the flag to {0, 1}
            let flag_var = FpVar::from(Boolean::new_witness(cs.clone(), || Ok(disclosed))?);

            slots.push(&value_var * &flag_var);
            commitments.push(hash_gadget(cs.clone(), &[value_var, flag_var])?);
        }

        for output in slots.iter().chain(commitments.iter()) {
            let public = FpVar::new_input(cs.clone(), || output.value())?;
            public.enforce_equal(output)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poseidon::PoseidonHasher;
    use ark_relations::r1cs::ConstraintSystem;

    fn public_inputs(cs: &ConstraintSystemRef<Fr>) -> Vec<Fr> {
        cs.borrow().unwrap().instance_assignment[1..].to_vec()
    }

    #[test]
    fn test_bid_circuit_accepts_within_budget() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        BidValidityCircuit::new(100, 80)
            .generate_constraints(cs.clone())
            .unwrap();

        assert!(cs.is_satisfied().unwrap());
        assert_eq!(public_inputs(&cs), vec![Fr::from(1u64)]);
    }

    #[test]
    fn test_bid_circuit_boundary() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        BidValidityCircuit::new(100, 100)
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(cs.is_satisfied().unwrap());
        assert_eq!(public_inputs(&cs), vec![Fr::from(1u64)]);

        let cs = ConstraintSystem::<Fr>::new_ref();
        BidValidityCircuit::new(100, 101)
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(cs.is_satisfied().unwrap());
        assert_eq!(public_inputs(&cs), vec![Fr::from(0u64)]);
    }

    #[test]
    fn test_bid_circuit_rejects_oversized_price() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        BidValidityCircuit::new(100, 1u64 << BID_COMPARISON_BITS)
            .generate_constraints(cs.clone())
            .unwrap();

        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_disclosure_circuit_outputs() {
        let values = [1u64, 2, 3, 4, 5].map(Fr::from);
        let disclosed = [true, false, true, false, false];

        let cs = ConstraintSystem::<Fr>::new_ref();
        SelectiveDisclosureCircuit::new(values, disclosed)
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(cs.is_satisfied().unwrap());

        let outputs = public_inputs(&cs);
        assert_eq!(outputs.len(), 2 * ATTRIBUTE_COUNT);
        assert_eq!(
            &outputs[..ATTRIBUTE_COUNT],
            &[1u64, 0, 3, 0, 0].map(Fr::from)
        );

        let hasher = PoseidonHasher::new();
        for i in 0..ATTRIBUTE_COUNT {
            assert_eq!(
                outputs[ATTRIBUTE_COUNT + i],
                hasher.commit_attribute(&values[i], disclosed[i])
            );
        }
    }
}
