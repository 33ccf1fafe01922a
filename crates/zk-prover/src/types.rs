//! Request types and attribute model for the two proof pipelines
//!
//! Wire schemas are explicit: every field the endpoints accept is listed
//! here, absent values stay `None` until the input builder decides whether
//! that is an error, and raw attribute values are wiped on drop.

use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of disclosable developer attributes
pub const ATTRIBUTE_COUNT: usize = 5;

/// A developer attribute, in circuit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeName {
    Rate,
    Availability,
    Skills,
    ResumeFileName,
    Exclusions,
}

impl AttributeName {
    /// All attributes in circuit order
    pub const ALL: [Self; ATTRIBUTE_COUNT] = [
        Self::Rate,
        Self::Availability,
        Self::Skills,
        Self::ResumeFileName,
        Self::Exclusions,
    ];

    /// Circuit signal name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Availability => "availability",
            Self::Skills => "skills",
            Self::ResumeFileName => "resumeFileName",
            Self::Exclusions => "exclusions",
        }
    }

    /// Name of the paired disclosure flag signal
    pub fn flag_name(&self) -> &'static str {
        match self {
            Self::Rate => "rateDisclosed",
            Self::Availability => "availabilityDisclosed",
            Self::Skills => "skillsDisclosed",
            Self::ResumeFileName => "resumeFileNameDisclosed",
            Self::Exclusions => "exclusionsDisclosed",
        }
    }

    /// Whether the attribute must be non-empty before submission
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Rate | Self::Availability | Self::Skills)
    }

    /// Position of the attribute in the circuit
    pub fn index(&self) -> usize {
        match self {
            Self::Rate => 0,
            Self::Availability => 1,
            Self::Skills => 2,
            Self::ResumeFileName => 3,
            Self::Exclusions => 4,
        }
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute plus its disclosure policy
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DisclosableAttribute {
    #[zeroize(skip)]
    pub name: AttributeName,
    pub raw_value: String,
    pub disclosed: bool,
}

impl fmt::Debug for DisclosableAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisclosableAttribute")
            .field("name", &self.name)
            .field("empty", &self.raw_value.is_empty())
            .field("disclosed", &self.disclosed)
            .finish()
    }
}

/// Encoded form of an attribute, as fed to the circuit.
///
/// Only the input builder creates these; they are computed per request and
/// never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedAttribute {
    name: AttributeName,
    numeric_value: BigUint,
    disclosed_flag: u64,
}

impl EncodedAttribute {
    pub(crate) fn new(name: AttributeName, numeric_value: BigUint, disclosed_flag: u64) -> Self {
        Self {
            name,
            numeric_value,
            disclosed_flag,
        }
    }

    pub fn name(&self) -> AttributeName {
        self.name
    }

    pub fn numeric_value(&self) -> &BigUint {
        &self.numeric_value
    }

    /// `1` if disclosed, `0` otherwise
    pub fn disclosed_flag(&self) -> u64 {
        self.disclosed_flag
    }
}

impl fmt::Debug for EncodedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedAttribute")
            .field("name", &self.name)
            .field("disclosed_flag", &self.disclosed_flag)
            .finish_non_exhaustive()
    }
}

/// Numeric request field that may arrive as a JSON number or a string
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(serde_json::Number),
    Text(String),
}

impl From<u64> for NumericInput {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Body of the bid-validity endpoint
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidValidityRequest {
    /// Client's budget; never echoed back or logged
    pub max_budget: Option<NumericInput>,
    #[serde(alias = "bidAmount")]
    pub accepted_price: Option<NumericInput>,
}

impl fmt::Debug for BidValidityRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidValidityRequest")
            .field("max_budget", &self.max_budget.as_ref().map(|_| "<redacted>"))
            .field(
                "accepted_price",
                &self.accepted_price.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Raw attribute values and disclosure flags as submitted by the developer.
///
/// A missing flag means "not disclosed".
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValues {
    pub rate: Option<String>,
    #[serde(default)]
    pub rate_disclosed: bool,
    pub availability: Option<String>,
    #[serde(default)]
    pub availability_disclosed: bool,
    pub skills: Option<String>,
    #[serde(default)]
    pub skills_disclosed: bool,
    pub resume_file_name: Option<String>,
    #[serde(default)]
    pub resume_file_name_disclosed: bool,
    pub exclusions: Option<String>,
    #[serde(default)]
    pub exclusions_disclosed: bool,
}

impl AttributeValues {
    /// Raw value and flag for one attribute
    pub fn get(&self, name: AttributeName) -> (Option<&str>, bool) {
        match name {
            AttributeName::Rate => (self.rate.as_deref(), self.rate_disclosed),
            AttributeName::Availability => {
                (self.availability.as_deref(), self.availability_disclosed)
            }
            AttributeName::Skills => (self.skills.as_deref(), self.skills_disclosed),
            AttributeName::ResumeFileName => (
                self.resume_file_name.as_deref(),
                self.resume_file_name_disclosed,
            ),
            AttributeName::Exclusions => (self.exclusions.as_deref(), self.exclusions_disclosed),
        }
    }

    /// Disclosure flags in circuit order
    pub fn flags(&self) -> [bool; ATTRIBUTE_COUNT] {
        AttributeName::ALL.map(|name| self.get(name).1)
    }
}

impl fmt::Debug for AttributeValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AttributeValues");
        for name in AttributeName::ALL {
            let (value, disclosed) = self.get(name);
            let shown = match value {
                None => "<undefined>",
                Some("") => "<empty>",
                Some(_) => "<redacted>",
            };
            s.field(name.as_str(), &shown);
            s.field(name.flag_name(), &disclosed);
        }
        s.finish()
    }
}

/// Body of the selective-disclosure endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SelectiveDisclosureRequest {
    pub values: AttributeValues,
}
