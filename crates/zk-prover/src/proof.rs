//! Proof types and serialization

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_groth16::Proof as Groth16Proof;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{ProverError, Result};
use crate::field::{fr_to_biguint, fr_to_string, parse_canonical, string_to_fr};
use crate::prover::Circuit;

const PROTOCOL: &str = "groth16";
const CURVE: &str = "bn128";

fn invalid(reason: impl Into<String>) -> ProverError {
    ProverError::InvalidProofFormat {
        reason: reason.into(),
    }
}

/// A Groth16 proof for the BN254 curve
#[derive(Clone, Debug, PartialEq)]
pub struct Proof {
    /// The underlying arkworks proof
    pub inner: Groth16Proof<Bn254>,
}

impl Proof {
    /// Create from arkworks proof
    pub fn new(inner: Groth16Proof<Bn254>) -> Self {
        Self { inner }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.inner.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }

    /// Deserialize from bytes. Points are checked to be on the curve and in
    /// the prime-order subgroup.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = Groth16Proof::deserialize_compressed(bytes)
            .map_err(|e| invalid(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Convert from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str).map_err(|e| invalid(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> Result<String> {
        Ok(BASE64.encode(self.to_bytes()?))
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64.decode(encoded).map_err(|e| invalid(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Convert to JSON-serializable format (compatible with snarkjs)
    pub fn to_json(&self) -> ProofJson {
        ProofJson {
            pi_a: g1_to_strings(&self.inner.a),
            pi_b: g2_to_strings(&self.inner.b),
            pi_c: g1_to_strings(&self.inner.c),
            protocol: PROTOCOL.into(),
            curve: CURVE.into(),
        }
    }

    /// Parse the snarkjs JSON format.
    ///
    /// Coordinates must be canonical decimal strings and every point must
    /// be a valid, non-identity group element.
    pub fn from_json(json: &ProofJson) -> Result<Self> {
        if json.protocol != PROTOCOL || json.curve != CURVE {
            return Err(invalid(format!(
                "unsupported proof system {}/{}",
                json.protocol, json.curve
            )));
        }

        Ok(Self {
            inner: Groth16Proof {
                a: g1_from_strings("pi_a", &json.pi_a)?,
                b: g2_from_strings(&json.pi_b)?,
                c: g1_from_strings("pi_c", &json.pi_c)?,
            },
        })
    }
}

fn fq_to_string(f: &Fq) -> String {
    fr_to_biguint(f).to_string()
}

fn fq_from_str(point: &str, s: &str) -> Result<Fq> {
    parse_canonical::<Fq>(s).ok_or_else(|| invalid(format!("{point}: bad coordinate")))
}

/// Convert G1 point to projective string triple
fn g1_to_strings(point: &G1Affine) -> Vec<String> {
    vec![fq_to_string(&point.x), fq_to_string(&point.y), "1".into()]
}

/// Convert G2 point to projective string triple of pairs
fn g2_to_strings(point: &G2Affine) -> Vec<Vec<String>> {
    vec![
        vec![fq_to_string(&point.x.c0), fq_to_string(&point.x.c1)],
        vec![fq_to_string(&point.y.c0), fq_to_string(&point.y.c1)],
        vec!["1".into(), "0".into()],
    ]
}

fn g1_from_strings(name: &str, coords: &[String]) -> Result<G1Affine> {
    let [x, y, z] = coords else {
        return Err(invalid(format!("{name}: expected 3 coordinates")));
    };
    if z != "1" {
        return Err(invalid(format!("{name}: point is not normalized")));
    }

    let point = G1Affine::new_unchecked(fq_from_str(name, x)?, fq_from_str(name, y)?);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(invalid(format!("{name}: not a valid G1 point")));
    }
    Ok(point)
}

fn g2_from_strings(coords: &[Vec<String>]) -> Result<G2Affine> {
    let pair = |row: &[String]| -> Result<Fq2> {
        let [c0, c1] = row else {
            return Err(invalid("pi_b: expected coordinate pairs"));
        };
        Ok(Fq2::new(fq_from_str("pi_b", c0)?, fq_from_str("pi_b", c1)?))
    };

    let [x, y, z] = coords else {
        return Err(invalid("pi_b: expected 3 coordinates"));
    };
    if z.as_slice() != ["1", "0"] {
        return Err(invalid("pi_b: point is not normalized"));
    }

    let point = G2Affine::new_unchecked(pair(x)?, pair(y)?);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(invalid("pi_b: not a valid G2 point"));
    }
    Ok(point)
}

/// Proof with its public inputs
#[derive(Clone, Debug)]
pub struct ProofWithPublicInputs {
    /// The ZK proof
    pub proof: Proof,
    /// Public signals, in circuit output order
    pub public_inputs: Vec<Fr>,
    /// Circuit the proof was generated for
    pub circuit: Circuit,
}

impl ProofWithPublicInputs {
    /// Create new proof with inputs
    pub fn new(proof: Proof, public_inputs: Vec<Fr>, circuit: Circuit) -> Self {
        Self {
            proof,
            public_inputs,
            circuit,
        }
    }

    /// Public signals as canonical decimal strings
    pub fn public_signals(&self) -> Vec<String> {
        self.public_inputs.iter().map(fr_to_string).collect()
    }

    /// Attach the verifier's verdict
    pub fn into_result(self, is_valid: bool) -> ProofResult {
        ProofResult {
            proof: self.proof.to_json(),
            public_signals: self.public_signals(),
            is_valid,
        }
    }
}

/// JSON-serializable proof format (compatible with snarkjs)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofJson {
    /// Proof point A (G1)
    pub pi_a: Vec<String>,
    /// Proof point B (G2)
    pub pi_b: Vec<Vec<String>>,
    /// Proof point C (G1)
    pub pi_c: Vec<String>,
    /// Protocol identifier
    pub protocol: String,
    /// Curve identifier
    pub curve: String,
}

/// Response body of both proof endpoints
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResult {
    pub proof: ProofJson,
    pub public_signals: Vec<String>,
    /// Computed by the verifier, never trusted from the prover side
    pub is_valid: bool,
}

impl ProofResult {
    /// Public signals parsed back into field elements
    pub fn public_inputs(&self) -> Result<Vec<Fr>> {
        self.public_signals.iter().map(|s| string_to_fr(s)).collect()
    }
}
