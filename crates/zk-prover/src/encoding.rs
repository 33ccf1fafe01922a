//! Code point encoding of attribute strings into field-sized integers
//!
//! Every character is written as its Unicode code point, zero padded to
//! three decimal digits, and the triples are concatenated in order and
//! read back as one decimal integer. `"ab"` becomes `097098`, i.e. `97098`.
//!
//! The encoding is only injective for code points in `[0, 999]` and for
//! strings that do not start with NUL (leading zero digits vanish when the
//! digit string is read as an integer). Both cases are rejected.

use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

use crate::error::ProverError;

/// Decimal digits used per character
pub const DIGITS_PER_CHAR: usize = 3;

/// Largest code point that fits into [`DIGITS_PER_CHAR`] digits
pub const MAX_CODE_POINT: u32 = 999;

const CHAR_RADIX: u32 = 1000;

/// Reasons a string cannot be encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("code point above 999 at position {position}")]
    CodePointOutOfRange { position: usize },

    #[error("leading NUL character is not representable")]
    LeadingNul,
}

impl EncodeError {
    /// Attach the attribute name, producing the public error type
    pub fn for_field(self, field: &str) -> ProverError {
        let position = match self {
            Self::CodePointOutOfRange { position } => position,
            Self::LeadingNul => 0,
        };
        let reason = match self {
            Self::CodePointOutOfRange { .. } => format!("code point above {MAX_CODE_POINT}"),
            Self::LeadingNul => "leading NUL character".to_string(),
        };
        ProverError::EncodingRange {
            field: field.to_string(),
            position,
            reason,
        }
    }
}

/// Encode a string as a non-negative integer.
///
/// The empty string encodes to `0`. The result is built arithmetically
/// (`acc * 1000 + code_point`), which is the same integer as parsing the
/// concatenated zero-padded triples.
pub fn encode(value: &str) -> Result<BigUint, EncodeError> {
    let mut acc = BigUint::zero();

    for (position, ch) in value.chars().enumerate() {
        let code_point = u32::from(ch);
        if code_point > MAX_CODE_POINT {
            return Err(EncodeError::CodePointOutOfRange { position });
        }
        if position == 0 && code_point == 0 {
            return Err(EncodeError::LeadingNul);
        }
        acc = acc * CHAR_RADIX + code_point;
    }

    Ok(acc)
}

/// Decode an integer produced by [`encode`] back into a string.
///
/// The decimal digits are left padded to a multiple of three and read in
/// groups of three from the left. Groups that do not form a code point are
/// dropped. `0` decodes to the empty string; a `000` group anywhere else
/// decodes to NUL.
pub fn decode(value: &BigUint) -> String {
    if value.is_zero() {
        return String::new();
    }

    let mut digits = value.to_str_radix(10);
    let pad = (DIGITS_PER_CHAR - digits.len() % DIGITS_PER_CHAR) % DIGITS_PER_CHAR;
    digits.insert_str(0, &"0".repeat(pad));

    digits
        .as_bytes()
        .chunks(DIGITS_PER_CHAR)
        .filter_map(|group| std::str::from_utf8(group).ok()?.parse::<u32>().ok())
        .filter_map(char::from_u32)
        .collect()
}

/// Map a boolean to the circuit's bit representation
pub fn bool_to_bit(flag: bool) -> u64 {
    u64::from(flag)
}
