use std::fmt;

use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_asn1::{BitString, Element};
use serde::Serialize;

use crate::algorithm::AlgorithmIdentifier;
use crate::error::Error;

pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
pub const DSA: &str = "1.2.840.10040.4.1";
pub const X25519: &str = "1.3.101.110";
pub const X448: &str = "1.3.101.111";
pub const ED25519: &str = "1.3.101.112";
pub const ED448: &str = "1.3.101.113";

// (OID, display name, field size in bits)
const NAMED_CURVES: &[(&str, &str, u64)] = &[
    ("1.2.840.10045.3.1.7", "P-256", 256),
    ("1.3.132.0.34", "P-384", 384),
    ("1.3.132.0.35", "P-521", 521),
    ("1.3.132.0.10", "secp256k1", 256),
    ("1.3.36.3.3.2.8.1.1.7", "brainpoolP256r1", 256),
    ("1.3.36.3.3.2.8.1.1.11", "brainpoolP384r1", 384),
    ("1.3.36.3.3.2.8.1.1.13", "brainpoolP512r1", 512),
];

/// Key type named by an AlgorithmIdentifier, shared by certificate
/// SubjectPublicKeyInfo and PKCS#8 PrivateKeyInfo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum KeyAlgorithm {
    Rsa,
    /// `curve` is the curve's name, its dotted OID when unnamed, or None
    /// when the parameters are implicit or explicit.
    Ec { curve: Option<String> },
    Ed25519,
    Ed448,
    X25519,
    X448,
    Dsa,
    Unknown(String),
}

impl KeyAlgorithm {
    pub fn from_identifier(algorithm: &AlgorithmIdentifier) -> Self {
        match algorithm.algorithm.to_string().as_str() {
            RSA_ENCRYPTION => KeyAlgorithm::Rsa,
            EC_PUBLIC_KEY => {
                let curve = algorithm
                    .parameters
                    .as_ref()
                    .and_then(Element::as_oid)
                    .map(|oid| {
                        let oid = oid.to_string();
                        NAMED_CURVES
                            .iter()
                            .find(|(known, _, _)| *known == oid)
                            .map(|(_, name, _)| name.to_string())
                            .unwrap_or(oid)
                    });
                KeyAlgorithm::Ec { curve }
            }
            ED25519 => KeyAlgorithm::Ed25519,
            ED448 => KeyAlgorithm::Ed448,
            X25519 => KeyAlgorithm::X25519,
            X448 => KeyAlgorithm::X448,
            DSA => KeyAlgorithm::Dsa,
            other => KeyAlgorithm::Unknown(other.to_string()),
        }
    }

    /// Key size that follows from the algorithm and its parameters alone.
    ///
    /// RSA keys carry their size in the key material, so this is None for RSA.
    pub fn parameter_bits(&self, parameters: Option<&Element>) -> Option<u64> {
        match self {
            KeyAlgorithm::Ec { curve: Some(curve) } => NAMED_CURVES
                .iter()
                .find(|(_, name, _)| *name == curve.as_str())
                .map(|(_, _, bits)| *bits),
            KeyAlgorithm::Ed25519 | KeyAlgorithm::X25519 => Some(256),
            KeyAlgorithm::Ed448 => Some(456),
            KeyAlgorithm::X448 => Some(448),
            // Dss-Parms ::= SEQUENCE { p INTEGER, q INTEGER, g INTEGER }
            KeyAlgorithm::Dsa => match parameters.and_then(Element::as_sequence) {
                Some([Element::Integer(p), ..]) => Some(p.as_bigint().bits()),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa => write!(f, "RSA"),
            KeyAlgorithm::Ec { curve: Some(curve) } => write!(f, "EC ({})", curve),
            KeyAlgorithm::Ec { curve: None } => write!(f, "EC"),
            KeyAlgorithm::Ed25519 => write!(f, "Ed25519"),
            KeyAlgorithm::Ed448 => write!(f, "Ed448"),
            KeyAlgorithm::X25519 => write!(f, "X25519"),
            KeyAlgorithm::X448 => write!(f, "X448"),
            KeyAlgorithm::Dsa => write!(f, "DSA"),
            KeyAlgorithm::Unknown(oid) => write!(f, "{}", oid),
        }
    }
}

/*
SubjectPublicKeyInfo  ::=  SEQUENCE  {
    algorithm            AlgorithmIdentifier,
    subjectPublicKey     BIT STRING
}

RSAPublicKey ::= SEQUENCE {
    modulus            INTEGER,    -- n
    publicExponent     INTEGER     -- e
}
*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectPublicKeyInfo {
    algorithm: AlgorithmIdentifier,
    subject_public_key: BitString,
}

impl SubjectPublicKeyInfo {
    pub fn algorithm(&self) -> &AlgorithmIdentifier {
        &self.algorithm
    }

    pub fn subject_public_key(&self) -> &BitString {
        &self.subject_public_key
    }

    pub fn key_algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::from_identifier(&self.algorithm)
    }

    /// RSA modulus and public exponent, for RSA keys.
    pub fn rsa_public_key(&self) -> Option<(pfxview_asn1::Integer, pfxview_asn1::Integer)> {
        if self.key_algorithm() != KeyAlgorithm::Rsa {
            return None;
        }
        let tlv = pfxview_der::decode(self.subject_public_key.as_bytes()).ok()?;
        let element = Element::try_from(&tlv).ok()?;
        match element.as_sequence() {
            Some([Element::Integer(n), Element::Integer(e)]) => Some((n.clone(), e.clone())),
            _ => None,
        }
    }

    /// Key size in bits: the RSA modulus length, the curve size, or the DSA prime length.
    pub fn key_size_bits(&self) -> Option<u64> {
        match self.key_algorithm() {
            KeyAlgorithm::Rsa => self
                .rsa_public_key()
                .map(|(modulus, _)| modulus.as_bigint().bits()),
            other => other.parameter_bits(self.algorithm.parameters.as_ref()),
        }
    }
}

impl DecodableFrom<Element> for SubjectPublicKeyInfo {}

impl Decoder<Element, SubjectPublicKeyInfo> for Element {
    type Error = Error;

    fn decode(&self) -> Result<SubjectPublicKeyInfo, Self::Error> {
        match self.as_sequence() {
            Some([algorithm, Element::BitString(key)]) => Ok(SubjectPublicKeyInfo {
                algorithm: algorithm.decode()?,
                subject_public_key: key.clone(),
            }),
            _ => Err(Error::InvalidSubjectPublicKeyInfo(
                "expected Sequence of AlgorithmIdentifier and BIT STRING".to_string(),
            )),
        }
    }
}
