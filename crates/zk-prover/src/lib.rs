//! # Talent marketplace ZK prover
//!
//! Groth16 proofs over BN254 for the two privacy checks of the freelance
//! marketplace.
//!
//! ## Features
//!
//! - **Bid validity**: prove `acceptedPrice <= maxBudget` revealing only a
//!   pass/fail bit
//! - **Selective disclosure**: for five developer attributes, reveal the
//!   chosen ones and commit to all of them with Poseidon
//!
//! Raw attribute strings and bid amounts are redacted in `Debug` output and
//! never logged. The validated inputs (`AttributeValues`,
//! `DisclosableAttribute`, `BidValidityInput`) are zeroed on drop; the
//! encoded field elements derived from them live only for one proving call
//! and are not wiped.
//!
//! ## Example
//!
//! ```rust,ignore
//! use talent_zk_prover::{
//!     BidValidityFlow, BidValidityRequest, MarketplaceProver, MarketplaceVerifier,
//! };
//!
//! let circuits = [Circuit::BidValidity];
//! let prover = MarketplaceProver::from_artifacts("./artifacts", &circuits)?;
//! let verifier = MarketplaceVerifier::from_artifacts("./artifacts", &circuits)?;
//!
//! let request = BidValidityRequest {
//!     max_budget: Some(100u64.into()),
//!     accepted_price: Some("80".into()),
//! };
//! let outcome = BidValidityFlow::new(&prover, &verifier).run(&request)?;
//! assert_eq!(outcome.result.public_signals, ["1"]);
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod artifacts;
pub mod circuits;
pub mod encoding;
pub mod error;
pub mod field;
pub mod flow;
pub mod inputs;
pub mod poseidon;
pub mod proof;
pub mod prover;
pub mod types;
pub mod verifier;
pub mod view;

// Re-exports
pub use artifacts::CircuitKeys;
pub use error::{ErrorKind, ProverError, Result};
pub use flow::{BidOutcome, BidValidityFlow, BidVerdict, DisclosureOutcome, SelectiveDisclosureFlow};
pub use inputs::{BidValidityInput, SelectiveDisclosureInput};
pub use proof::{Proof, ProofJson, ProofResult, ProofWithPublicInputs};
pub use prover::{Circuit, MarketplaceProver};
pub use types::{
    AttributeName, AttributeValues, BidValidityRequest, NumericInput, SelectiveDisclosureRequest,
};
pub use verifier::MarketplaceVerifier;
pub use view::{DisclosureFlags, DisclosureView, DisplayValue, HIDDEN_PLACEHOLDER};
