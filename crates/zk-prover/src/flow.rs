//! Request flows for the two proof pipelines
//!
//! Each flow is a small state machine that owns one request from
//! submission to a verified result. Verification always runs right after
//! generation and nothing is retried: a failed generation is terminal.

use std::mem;

use ark_bn254::Fr;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ProverError, Result};
use crate::inputs::{collect_attributes, BidValidityInput, SelectiveDisclosureInput};
use crate::proof::{ProofResult, ProofWithPublicInputs};
use crate::prover::MarketplaceProver;
use crate::types::{AttributeValues, BidValidityRequest, DisclosableAttribute, ATTRIBUTE_COUNT};
use crate::verifier::MarketplaceVerifier;
use crate::view::{DisclosureFlags, DisclosureView};

/// Whether the developer's bid fits the client's budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BidVerdict {
    /// Proceed to selective disclosure
    Valid,
    /// Bid rejected
    Invalid,
}

#[derive(Debug, Clone)]
pub struct BidOutcome {
    pub verdict: BidVerdict,
    pub result: ProofResult,
}

#[derive(Debug)]
pub enum BidValidityState {
    Idle,
    ProofRequested(BidValidityInput),
    ProofGenerated(ProofWithPublicInputs),
    Verified(BidOutcome),
    Failed { reason: String },
}

impl BidValidityState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ProofRequested(_) => "proof_requested",
            Self::ProofGenerated(_) => "proof_generated",
            Self::Verified(_) => "verified",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Drives one bid validity check
pub struct BidValidityFlow<'a> {
    prover: &'a MarketplaceProver,
    verifier: &'a MarketplaceVerifier,
    state: BidValidityState,
}

impl<'a> BidValidityFlow<'a> {
    pub fn new(prover: &'a MarketplaceProver, verifier: &'a MarketplaceVerifier) -> Self {
        Self {
            prover,
            verifier,
            state: BidValidityState::Idle,
        }
    }

    pub fn state(&self) -> &BidValidityState {
        &self.state
    }

    /// `Idle -> ProofRequested`. Both fields must be present and non-empty;
    /// a rejected request leaves the flow idle.
    pub fn request(&mut self, request: &BidValidityRequest) -> Result<()> {
        if !matches!(self.state, BidValidityState::Idle) {
            return Err(ProverError::InvalidTransition {
                state: self.state.name(),
                action: "request a proof",
            });
        }
        self.state = BidValidityState::ProofRequested(BidValidityInput::from_request(request)?);
        debug!("Bid validity proof requested");
        Ok(())
    }

    /// Take the next step: generate, then verify
    pub fn advance(&mut self) -> Result<()> {
        let next = match mem::replace(&mut self.state, BidValidityState::Idle) {
            BidValidityState::ProofRequested(input) => {
                match self.prover.prove_bid_validity(&input) {
                    Ok(proof) => BidValidityState::ProofGenerated(proof),
                    Err(e) => return Err(self.fail(e)),
                }
            }
            BidValidityState::ProofGenerated(proof) => {
                let is_valid = self.verifier.verify_proof(&proof);
                let verdict = if is_valid && proof.public_inputs.first() == Some(&Fr::from(1u64)) {
                    BidVerdict::Valid
                } else {
                    BidVerdict::Invalid
                };
                BidValidityState::Verified(BidOutcome {
                    verdict,
                    result: proof.into_result(is_valid),
                })
            }
            other => {
                let state = other.name();
                self.state = other;
                return Err(ProverError::InvalidTransition {
                    state,
                    action: "advance",
                });
            }
        };

        debug!(state = next.name(), "Bid validity flow advanced");
        self.state = next;
        Ok(())
    }

    /// Run a request to completion
    pub fn run(mut self, request: &BidValidityRequest) -> Result<BidOutcome> {
        self.request(request)?;
        self.advance()?;
        self.advance()?;
        match self.state {
            BidValidityState::Verified(outcome) => Ok(outcome),
            other => Err(ProverError::InvalidTransition {
                state: other.name(),
                action: "finish",
            }),
        }
    }

    fn fail(&mut self, error: ProverError) -> ProverError {
        warn!(error = %error, "Bid validity proof failed");
        self.state = BidValidityState::Failed {
            reason: error.to_string(),
        };
        error
    }
}

/// Verified disclosure: the proof result plus what the counterparty sees
#[derive(Debug, Clone)]
pub struct DisclosureOutcome {
    pub result: ProofResult,
    pub flags: DisclosureFlags,
    /// Present only when the proof verified
    pub view: Option<DisclosureView>,
}

#[derive(Debug)]
pub enum SelectiveDisclosureState {
    Collecting,
    Submitted(Box<[DisclosableAttribute; ATTRIBUTE_COUNT]>),
    Encoded(SelectiveDisclosureInput),
    ProofGenerated(ProofWithPublicInputs),
    Verified(Box<DisclosureOutcome>),
    Failed { reason: String },
}

impl SelectiveDisclosureState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::Submitted(_) => "submitted",
            Self::Encoded(_) => "encoded",
            Self::ProofGenerated(_) => "proof_generated",
            Self::Verified(_) => "verified",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Drives one selective disclosure, from collecting values to the view
pub struct SelectiveDisclosureFlow<'a> {
    prover: &'a MarketplaceProver,
    verifier: &'a MarketplaceVerifier,
    values: AttributeValues,
    state: SelectiveDisclosureState,
}

impl<'a> SelectiveDisclosureFlow<'a> {
    pub fn new(prover: &'a MarketplaceProver, verifier: &'a MarketplaceVerifier) -> Self {
        Self {
            prover,
            verifier,
            values: AttributeValues::default(),
            state: SelectiveDisclosureState::Collecting,
        }
    }

    pub fn state(&self) -> &SelectiveDisclosureState {
        &self.state
    }

    /// Values being collected; only editable before submission
    pub fn values_mut(&mut self) -> Result<&mut AttributeValues> {
        if !matches!(self.state, SelectiveDisclosureState::Collecting) {
            return Err(ProverError::InvalidTransition {
                state: self.state.name(),
                action: "edit values",
            });
        }
        Ok(&mut self.values)
    }

    /// `Collecting -> Submitted`. Rate, availability and skills must be
    /// non-empty; otherwise the flow keeps collecting.
    pub fn submit(&mut self) -> Result<()> {
        if !matches!(self.state, SelectiveDisclosureState::Collecting) {
            return Err(ProverError::InvalidTransition {
                state: self.state.name(),
                action: "submit",
            });
        }

        let attributes = collect_attributes(&self.values)?;
        if let Some(empty) = attributes
            .iter()
            .find(|a| a.name.is_required() && a.raw_value.is_empty())
        {
            return Err(ProverError::MissingRequiredAttribute {
                field: empty.name.as_str().to_string(),
            });
        }

        self.state = SelectiveDisclosureState::Submitted(Box::new(attributes));
        debug!(flags = ?self.values.flags(), "Selective disclosure submitted");
        Ok(())
    }

    /// Take the next step: encode, generate, then verify and render
    pub fn advance(&mut self) -> Result<()> {
        let next = match mem::replace(&mut self.state, SelectiveDisclosureState::Collecting) {
            SelectiveDisclosureState::Submitted(attributes) => {
                // Builder errors send the user back to fix their values
                SelectiveDisclosureState::Encoded(SelectiveDisclosureInput::from_attributes(
                    &attributes,
                )?)
            }
            SelectiveDisclosureState::Encoded(input) => {
                match self.prover.prove_selective_disclosure(&input) {
                    Ok(proof) => SelectiveDisclosureState::ProofGenerated(proof),
                    Err(e) => return Err(self.fail(e)),
                }
            }
            SelectiveDisclosureState::ProofGenerated(proof) => {
                let is_valid = self.verifier.verify_proof(&proof);
                let flags = DisclosureFlags::from(&self.values);
                let result = proof.into_result(is_valid);

                let view = if is_valid {
                    match DisclosureView::render(&result.public_signals, &flags) {
                        Ok(view) => Some(view),
                        Err(e) => return Err(self.fail(e)),
                    }
                } else {
                    None
                };

                SelectiveDisclosureState::Verified(Box::new(DisclosureOutcome {
                    result,
                    flags,
                    view,
                }))
            }
            other => {
                let state = other.name();
                self.state = other;
                return Err(ProverError::InvalidTransition {
                    state,
                    action: "advance",
                });
            }
        };

        debug!(state = next.name(), "Selective disclosure flow advanced");
        self.state = next;
        Ok(())
    }

    /// Run a submission to completion
    pub fn run(mut self, values: AttributeValues) -> Result<DisclosureOutcome> {
        self.values = values;
        self.submit()?;
        while !matches!(
            self.state,
            SelectiveDisclosureState::Verified(_) | SelectiveDisclosureState::Failed { .. }
        ) {
            self.advance()?;
        }

        match mem::replace(&mut self.state, SelectiveDisclosureState::Collecting) {
            SelectiveDisclosureState::Verified(outcome) => Ok(*outcome),
            other => Err(ProverError::InvalidTransition {
                state: other.name(),
                action: "finish",
            }),
        }
    }

    fn fail(&mut self, error: ProverError) -> ProverError {
        warn!(error = %error, "Selective disclosure failed");
        self.state = SelectiveDisclosureState::Failed {
            reason: error.to_string(),
        };
        error
    }
}
