//! Conversions between field elements, big integers and decimal strings
//!
//! Public signals travel as decimal strings (snarkjs convention). Parsing is
//! strict: only canonical representatives are accepted, so two different
//! strings never denote the same field element.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

use crate::error::{ProverError, Result};

/// Modulus of a prime field as a big integer
pub fn modulus<F: PrimeField>() -> BigUint {
    BigUint::from_bytes_le(&F::MODULUS.to_bytes_le())
}

/// Field element as a big integer in `[0, p)`
pub fn fr_to_biguint<F: PrimeField>(f: &F) -> BigUint {
    BigUint::from_bytes_le(&f.into_bigint().to_bytes_le())
}

/// Big integer as a field element, `None` if it is not below the modulus
pub fn biguint_to_fr<F: PrimeField>(value: &BigUint) -> Option<F> {
    if *value >= modulus::<F>() {
        return None;
    }
    Some(F::from_be_bytes_mod_order(&value.to_bytes_be()))
}

/// Parse a canonical decimal string into a field element.
///
/// Rejects empty strings, signs, whitespace, leading zeros and values that
/// are not below the modulus.
pub fn parse_canonical<F: PrimeField>(s: &str) -> Option<F> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    let value = BigUint::parse_bytes(s.as_bytes(), 10)?;
    biguint_to_fr(&value)
}

/// Convert a decimal string to Fr
pub fn string_to_fr(s: &str) -> Result<Fr> {
    parse_canonical(s).ok_or_else(|| ProverError::InvalidProofFormat {
        reason: "public signal is not a canonical field element".into(),
    })
}

/// Convert Fr to decimal string
pub fn fr_to_string(f: &Fr) -> String {
    fr_to_biguint(f).to_string()
}
