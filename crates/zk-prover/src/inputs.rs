//! Circuit input builder
//!
//! Turns validated request types into the exact, ordered signal list each
//! circuit expects. All input validation happens here, before any
//! cryptographic work starts.

use std::fmt;

use ark_bn254::Fr;
use num_bigint::BigUint;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::circuits::{BidValidityCircuit, SelectiveDisclosureCircuit};
use crate::encoding::{bool_to_bit, encode};
use crate::error::{ProverError, Result};
use crate::field::biguint_to_fr;
use crate::types::{
    AttributeName, AttributeValues, BidValidityRequest, DisclosableAttribute, EncodedAttribute,
    NumericInput, ATTRIBUTE_COUNT,
};

/// Longest string that still encodes below the BN254 scalar modulus
/// (25 characters = 75 decimal digits < p ~ 2.19e76)
pub const MAX_ENCODED_CHARS: usize = 25;

/// Named circuit signals, in the order the circuit declares them
pub type CircuitInput = Vec<(String, Vec<BigUint>)>;

const NON_NEGATIVE_INTEGER: &str = "a non-negative integer";

/// Parse a decimal string of ASCII digits into a `u64`.
///
/// Signs, whitespace, decimal points and exponents are rejected.
pub fn parse_non_negative(field: &str, raw: &str) -> Result<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProverError::invalid_type(field, NON_NEGATIVE_INTEGER));
    }
    raw.parse::<u64>()
        .map_err(|_| ProverError::invalid_type(field, NON_NEGATIVE_INTEGER))
}

fn numeric_field(field: &str, value: Option<&NumericInput>) -> Result<u64> {
    match value {
        None => Err(ProverError::UndefinedInput {
            field: field.to_string(),
        }),
        Some(NumericInput::Text(text)) if text.is_empty() => Err(ProverError::UndefinedInput {
            field: field.to_string(),
        }),
        Some(NumericInput::Text(text)) => parse_non_negative(field, text),
        Some(NumericInput::Number(number)) => number
            .as_u64()
            .ok_or_else(|| ProverError::invalid_type(field, NON_NEGATIVE_INTEGER)),
    }
}

/// Input for the bid validity proof
///
/// Proves: `accepted_price <= max_budget`
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct BidValidityInput {
    /// Client's maximum budget (private)
    pub max_budget: u64,
    /// Developer's accepted price (private)
    pub accepted_price: u64,
}

impl BidValidityInput {
    pub fn new(max_budget: u64, accepted_price: u64) -> Self {
        Self {
            max_budget,
            accepted_price,
        }
    }

    /// Validate a request. Both fields must be present and non-empty.
    pub fn from_request(request: &BidValidityRequest) -> Result<Self> {
        Ok(Self {
            max_budget: numeric_field("maxBudget", request.max_budget.as_ref())?,
            accepted_price: numeric_field("acceptedPrice", request.accepted_price.as_ref())?,
        })
    }

    /// Convert to circuit input format
    pub fn to_circuit_input(&self) -> CircuitInput {
        vec![
            ("maxBudget".into(), vec![BigUint::from(self.max_budget)]),
            ("acceptedPrice".into(), vec![BigUint::from(self.accepted_price)]),
        ]
    }
}

impl fmt::Debug for BidValidityInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BidValidityInput { .. }")
    }
}

/// Normalize submitted values into the five attributes.
///
/// A required attribute that is absent fails with `UndefinedInput`; an
/// absent optional attribute becomes the empty string.
pub fn collect_attributes(
    values: &AttributeValues,
) -> Result<[DisclosableAttribute; ATTRIBUTE_COUNT]> {
    if let Some(missing) = AttributeName::ALL
        .into_iter()
        .find(|name| name.is_required() && values.get(*name).0.is_none())
    {
        return Err(ProverError::UndefinedInput {
            field: missing.as_str().to_string(),
        });
    }

    Ok(AttributeName::ALL.map(|name| {
        let (raw, disclosed) = values.get(name);
        DisclosableAttribute {
            name,
            raw_value: raw.unwrap_or_default().to_string(),
            disclosed,
        }
    }))
}

fn encode_attribute(attribute: &DisclosableAttribute) -> Result<EncodedAttribute> {
    let field = attribute.name.as_str();
    let numeric_value = match attribute.name {
        // Rate takes part in magnitude comparisons, so it stays a plain integer
        AttributeName::Rate => BigUint::from(parse_non_negative(field, &attribute.raw_value)?),
        _ => {
            if attribute.raw_value.chars().count() > MAX_ENCODED_CHARS {
                return Err(ProverError::EncodedTooLong {
                    field: field.to_string(),
                    max: MAX_ENCODED_CHARS,
                });
            }
            encode(&attribute.raw_value).map_err(|e| e.for_field(field))?
        }
    };

    Ok(EncodedAttribute::new(
        attribute.name,
        numeric_value,
        bool_to_bit(attribute.disclosed),
    ))
}

/// Input for the selective disclosure proof: five encoded attributes with
/// their disclosure bits, in circuit order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectiveDisclosureInput {
    attributes: [EncodedAttribute; ATTRIBUTE_COUNT],
}

impl SelectiveDisclosureInput {
    /// Encode the five attributes
    pub fn from_attributes(attributes: &[DisclosableAttribute; ATTRIBUTE_COUNT]) -> Result<Self> {
        let mut encoded = Vec::with_capacity(ATTRIBUTE_COUNT);
        for (expected, attribute) in AttributeName::ALL.iter().zip(attributes) {
            if attribute.name != *expected {
                return Err(ProverError::invalid_type(
                    attribute.name.as_str(),
                    format!("attribute `{expected}` at position {}", expected.index()),
                ));
            }
            encoded.push(encode_attribute(attribute)?);
        }

        let attributes = encoded
            .try_into()
            .map_err(|_| ProverError::Setup {
                reason: "attribute count mismatch".into(),
            })?;
        Ok(Self { attributes })
    }

    /// Normalize and encode raw request values
    pub fn from_values(values: &AttributeValues) -> Result<Self> {
        Self::from_attributes(&collect_attributes(values)?)
    }

    pub fn attributes(&self) -> &[EncodedAttribute; ATTRIBUTE_COUNT] {
        &self.attributes
    }

    /// Disclosure flags in circuit order
    pub fn flags(&self) -> [bool; ATTRIBUTE_COUNT] {
        self.attributes
            .each_ref()
            .map(|attribute| attribute.disclosed_flag() == 1)
    }

    /// Convert to circuit input format: each value followed by its flag
    pub fn to_circuit_input(&self) -> CircuitInput {
        self.attributes
            .iter()
            .flat_map(|attribute| {
                let name = attribute.name();
                [
                    (name.as_str().to_string(), vec![attribute.numeric_value().clone()]),
                    (
                        name.flag_name().to_string(),
                        vec![BigUint::from(attribute.disclosed_flag())],
                    ),
                ]
            })
            .collect()
    }
}

fn signal_error(reason: String) -> ProverError {
    ProverError::ProofGeneration { reason }
}

/// Resolve `names` against `inputs`, one field element per name, in the
/// order of `names`.
///
/// Each name must occur exactly once with a single value below the field
/// modulus, and `inputs` must not carry any other signal.
fn named_signals(inputs: &CircuitInput, names: &[&str]) -> Result<Vec<Fr>> {
    if let Some((extra, _)) = inputs.iter().find(|(name, _)| !names.contains(&name.as_str())) {
        return Err(signal_error(format!("unexpected input `{extra}`")));
    }

    names
        .iter()
        .map(|&name| {
            let mut matches = inputs.iter().filter(|(candidate, _)| candidate == name);
            let (_, values) = matches
                .next()
                .ok_or_else(|| signal_error(format!("input `{name}` is missing")))?;
            if matches.next().is_some() {
                return Err(signal_error(format!("input `{name}` is given twice")));
            }
            match values.as_slice() {
                [value] => biguint_to_fr(value)
                    .ok_or_else(|| signal_error(format!("input `{name}` exceeds the field"))),
                _ => Err(signal_error(format!(
                    "input `{name}` must hold one value, got {}",
                    values.len()
                ))),
            }
        })
        .collect()
}

impl BidValidityCircuit {
    /// Build the circuit from named signals (`maxBudget`, `acceptedPrice`)
    pub fn from_inputs(inputs: &CircuitInput) -> Result<Self> {
        match named_signals(inputs, &["maxBudget", "acceptedPrice"])?.as_slice() {
            &[max_budget, accepted_price] => Ok(Self {
                max_budget,
                accepted_price,
            }),
            _ => Err(signal_error("bid validity takes two inputs".into())),
        }
    }
}

impl SelectiveDisclosureCircuit {
    /// Build the circuit from named signals: each attribute value followed
    /// by its `<name>Disclosed` flag, which must be 0 or 1.
    pub fn from_inputs(inputs: &CircuitInput) -> Result<Self> {
        let names: Vec<&str> = AttributeName::ALL
            .iter()
            .flat_map(|name| [name.as_str(), name.flag_name()])
            .collect();
        let signals = named_signals(inputs, &names)?;

        let mut values = [Fr::from(0u64); ATTRIBUTE_COUNT];
        let mut disclosed = [false; ATTRIBUTE_COUNT];
        for (i, pair) in signals.chunks_exact(2).enumerate() {
            values[i] = pair[0];
            disclosed[i] = if pair[1] == Fr::from(0u64) {
                false
            } else if pair[1] == Fr::from(1u64) {
                true
            } else {
                return Err(signal_error(format!(
                    "input `{}` must be 0 or 1",
                    names[2 * i + 1]
                )));
            };
        }
        Ok(Self::new(values, disclosed))
    }
}
