//! Error types for the ZK prover
//!
//! Messages never carry raw attribute values or the bid budget: they name
//! the offending field and what was expected, nothing more.

use thiserror::Error;

/// Result type alias for prover operations
pub type Result<T> = std::result::Result<T, ProverError>;

/// How a failure should be reported to whoever submitted the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is wrong and can be fixed by resubmitting
    InvalidRequest,
    /// Something failed on our side; details stay in the logs
    Internal,
}

/// Errors that can occur during proof generation and verification
#[derive(Error, Debug)]
pub enum ProverError {
    /// A required field was absent from the request (as opposed to empty)
    #[error("Input `{field}` is undefined")]
    UndefinedInput { field: String },

    /// A value could not be coerced to the type the circuit expects
    #[error("Invalid type for `{field}` (expected {expected})")]
    InvalidAttributeType { field: String, expected: String },

    /// A character cannot be represented by the 3-digit code point encoding
    #[error("Character at position {position} of `{field}` cannot be encoded: {reason}")]
    EncodingRange {
        field: String,
        position: usize,
        reason: String,
    },

    /// An encoded value would not fit into a single field element
    #[error("`{field}` is too long to encode (max {max} characters)")]
    EncodedTooLong { field: String, max: usize },

    /// A required attribute was submitted empty
    #[error("Required attribute `{field}` is empty")]
    MissingRequiredAttribute { field: String },

    /// Circuit artifact not found
    #[error("Circuit artifact not found: {path}")]
    CircuitNotFound { path: String },

    /// Artifact on disk was built for a different circuit or version
    #[error("Artifact mismatch for {circuit}: {reason}")]
    ArtifactMismatch { circuit: String, reason: String },

    /// Witness computation failed (an input violates a circuit constraint)
    #[error("Proof generation failed: {reason}")]
    ProofGeneration { reason: String },

    /// The verifier could not run at all (as opposed to rejecting a proof)
    #[error("Verification error: {reason}")]
    Verification { reason: String },

    /// Invalid proof format
    #[error("Invalid proof format: {reason}")]
    InvalidProofFormat { reason: String },

    /// A flow operation was attempted in a state that does not allow it
    #[error("Cannot {action} in state {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    /// Setup error
    #[error("Setup error: {reason}")]
    Setup { reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arkworks error
    #[error("Cryptographic error: {0}")]
    ArkError(String),
}

impl ProverError {
    /// Classify the error for the caller.
    ///
    /// Input validation failures are detected before any cryptographic
    /// work and are the caller's to fix; everything else is internal.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UndefinedInput { .. }
            | Self::InvalidAttributeType { .. }
            | Self::EncodingRange { .. }
            | Self::EncodedTooLong { .. }
            | Self::MissingRequiredAttribute { .. }
            | Self::InvalidProofFormat { .. } => ErrorKind::InvalidRequest,
            _ => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid_type(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidAttributeType {
            field: field.into(),
            expected: expected.into(),
        }
    }
}

impl From<ark_serialize::SerializationError> for ProverError {
    fn from(e: ark_serialize::SerializationError) -> Self {
        Self::ArkError(e.to_string())
    }
}

impl From<ark_relations::r1cs::SynthesisError> for ProverError {
    fn from(e: ark_relations::r1cs::SynthesisError) -> Self {
        Self::ArkError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_caller_errors() {
        let err = ProverError::UndefinedInput {
            field: "rate".into(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = ProverError::invalid_type("maxBudget", "a non-negative integer");
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = ProverError::ProofGeneration {
            reason: "constraint 12 unsatisfied".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_messages_name_field_only() {
        let err = ProverError::EncodingRange {
            field: "skills".into(),
            position: 3,
            reason: "code point above 999".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("skills"));
        assert!(msg.contains("position 3"));
    }
}
