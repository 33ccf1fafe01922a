//! Counterparty view of a selective disclosure proof
//!
//! Display is gated on the disclosure flag alone: a hidden attribute is
//! shown as [`HIDDEN_PLACEHOLDER`], a disclosed one is shown decoded, even
//! when it decodes to an empty or unusual string.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize, Serializer};

use crate::encoding::decode;
use crate::error::{ProverError, Result};
use crate::field::{fr_to_biguint, fr_to_string, string_to_fr};
use crate::poseidon::PoseidonHasher;
use crate::types::{AttributeName, AttributeValues, ATTRIBUTE_COUNT};

/// Shown in place of an attribute that was not disclosed
pub const HIDDEN_PLACEHOLDER: &str = "hidden";

/// Disclosure flags as stored alongside a proof
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureFlags {
    #[serde(default)]
    pub rate_disclosed: bool,
    #[serde(default)]
    pub availability_disclosed: bool,
    #[serde(default)]
    pub skills_disclosed: bool,
    #[serde(default)]
    pub resume_file_name_disclosed: bool,
    #[serde(default)]
    pub exclusions_disclosed: bool,
}

impl DisclosureFlags {
    pub fn from_array(flags: [bool; ATTRIBUTE_COUNT]) -> Self {
        let [rate, availability, skills, resume, exclusions] = flags;
        Self {
            rate_disclosed: rate,
            availability_disclosed: availability,
            skills_disclosed: skills,
            resume_file_name_disclosed: resume,
            exclusions_disclosed: exclusions,
        }
    }

    /// Flags in circuit order
    pub fn to_array(&self) -> [bool; ATTRIBUTE_COUNT] {
        [
            self.rate_disclosed,
            self.availability_disclosed,
            self.skills_disclosed,
            self.resume_file_name_disclosed,
            self.exclusions_disclosed,
        ]
    }

    pub fn is_disclosed(&self, name: AttributeName) -> bool {
        self.to_array()[name.index()]
    }
}

impl From<&AttributeValues> for DisclosureFlags {
    fn from(values: &AttributeValues) -> Self {
        Self::from_array(values.flags())
    }
}

/// What the counterparty sees for one attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayValue {
    Disclosed(String),
    Hidden,
}

impl DisplayValue {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Disclosed(value) => value,
            Self::Hidden => HIDDEN_PLACEHOLDER,
        }
    }
}

impl Serialize for DisplayValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayedAttribute {
    pub name: AttributeName,
    pub disclosed: bool,
    pub value: DisplayValue,
    /// `Poseidon(value, disclosed)` as a decimal string
    pub commitment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisclosureView {
    pub attributes: Vec<DisplayedAttribute>,
}

impl DisclosureView {
    /// Build the view from the ten public signals of a verified proof.
    ///
    /// Hidden slots must be zero and every disclosed slot must match its
    /// commitment; anything else means the signals and flags do not belong
    /// together and the view is refused.
    pub fn render(public_signals: &[String], flags: &DisclosureFlags) -> Result<Self> {
        if public_signals.len() != 2 * ATTRIBUTE_COUNT {
            return Err(ProverError::InvalidProofFormat {
                reason: format!(
                    "expected {} public signals, got {}",
                    2 * ATTRIBUTE_COUNT,
                    public_signals.len()
                ),
            });
        }

        let signals = public_signals
            .iter()
            .map(|s| string_to_fr(s))
            .collect::<Result<Vec<_>>>()?;
        let (slots, commitments) = signals.split_at(ATTRIBUTE_COUNT);
        let hasher = PoseidonHasher::new();

        let attributes = AttributeName::ALL
            .iter()
            .map(|&name| {
                let slot = &slots[name.index()];
                let commitment = &commitments[name.index()];
                let disclosed = flags.is_disclosed(name);

                let value = if disclosed {
                    if hasher.commit_attribute(slot, true) != *commitment {
                        return Err(inconsistent(name, "disclosed value does not match commitment"));
                    }
                    DisplayValue::Disclosed(display(name, slot))
                } else {
                    if *slot != Fr::from(0u64) {
                        return Err(inconsistent(name, "hidden slot is not zero"));
                    }
                    DisplayValue::Hidden
                };

                Ok(DisplayedAttribute {
                    name,
                    disclosed,
                    value,
                    commitment: fr_to_string(commitment),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { attributes })
    }

    pub fn get(&self, name: AttributeName) -> Option<&DisplayedAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

fn inconsistent(name: AttributeName, reason: &str) -> ProverError {
    ProverError::InvalidProofFormat {
        reason: format!("{name}: {reason}"),
    }
}

fn display(name: AttributeName, slot: &Fr) -> String {
    let value = fr_to_biguint(slot);
    match name {
        AttributeName::Rate => value.to_string(),
        _ => decode(&value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode;
    use crate::field::biguint_to_fr;
    use proptest::prelude::*;

    /// Signals as the circuit would produce them
    fn signals_for(values: [Fr; ATTRIBUTE_COUNT], flags: [bool; ATTRIBUTE_COUNT]) -> Vec<String> {
        let hasher = PoseidonHasher::new();
        let slots = values
            .iter()
            .zip(flags)
            .map(|(v, d)| if d { *v } else { Fr::from(0u64) });
        let commitments = values
            .iter()
            .zip(flags)
            .map(|(v, d)| hasher.commit_attribute(v, d));
        slots.chain(commitments).map(|f| fr_to_string(&f)).collect()
    }

    fn encoded(s: &str) -> Fr {
        biguint_to_fr(&encode(s).unwrap()).unwrap()
    }

    fn sample_values() -> [Fr; ATTRIBUTE_COUNT] {
        [
            Fr::from(60u64),
            encoded("nights"),
            encoded("rust"),
            encoded("cv.pdf"),
            encoded(""),
        ]
    }

    #[test]
    fn test_full_disclosure() {
        let flags = [true; ATTRIBUTE_COUNT];
        let view = DisclosureView::render(
            &signals_for(sample_values(), flags),
            &DisclosureFlags::from_array(flags),
        )
        .unwrap();

        let shown: Vec<_> = view.attributes.iter().map(|a| a.value.as_str()).collect();
        assert_eq!(shown, ["60", "nights", "rust", "cv.pdf", ""]);
    }

    #[test]
    fn test_full_privacy() {
        let flags = [false; ATTRIBUTE_COUNT];
        let view = DisclosureView::render(
            &signals_for(sample_values(), flags),
            &DisclosureFlags::default(),
        )
        .unwrap();

        assert!(view
            .attributes
            .iter()
            .all(|a| a.value == DisplayValue::Hidden));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["attributes"][1]["value"], "hidden");
    }

    #[test]
    fn test_flag_gates_display_not_content() {
        // A disclosed empty value is shown as empty, not hidden
        let mut values = sample_values();
        values[2] = Fr::from(0u64);
        let flags = [false, false, true, false, false];
        let view = DisclosureView::render(
            &signals_for(values, flags),
            &DisclosureFlags::from_array(flags),
        )
        .unwrap();

        assert_eq!(
            view.get(AttributeName::Skills).unwrap().value,
            DisplayValue::Disclosed(String::new())
        );
    }

    #[test]
    fn test_mismatched_flags_refused() {
        let flags = [true, false, false, false, false];
        let signals = signals_for(sample_values(), flags);

        // Claiming availability was disclosed does not match its commitment
        let wrong = DisclosureFlags::from_array([true, true, false, false, false]);
        assert!(DisclosureView::render(&signals, &wrong).is_err());

        // Claiming rate was hidden leaves a non-zero slot
        assert!(DisclosureView::render(&signals, &DisclosureFlags::default()).is_err());

        assert!(DisclosureView::render(&signals[..9], &DisclosureFlags::default()).is_err());
    }

    proptest! {
        #[test]
        fn prop_only_flagged_attributes_are_shown(
            rate in any::<u32>(),
            texts in proptest::array::uniform4("[a-z ,.]{0,25}"),
            flags in any::<[bool; ATTRIBUTE_COUNT]>(),
        ) {
            let raw: Vec<String> = std::iter::once(rate.to_string()).chain(texts.clone()).collect();
            let mut values = [Fr::from(u64::from(rate)); ATTRIBUTE_COUNT];
            for (slot, text) in values[1..].iter_mut().zip(&texts) {
                *slot = encoded(text);
            }

            let view = DisclosureView::render(
                &signals_for(values, flags),
                &DisclosureFlags::from_array(flags),
            )
            .unwrap();

            for ((attribute, shown), raw) in view.attributes.iter().zip(flags).zip(&raw) {
                if shown {
                    prop_assert_eq!(&attribute.value, &DisplayValue::Disclosed(raw.clone()));
                } else {
                    prop_assert_eq!(&attribute.value, &DisplayValue::Hidden);
                }
            }
        }
    }
}
