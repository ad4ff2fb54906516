//! PKCS#12 (PFX) container parsing.
//!
//! [`Parser::parse_container`] walks a decoded PFX: it checks the version,
//! verifies the password MAC when one is present, decrypts encrypted safe
//! contents and returns the flattened list of [`SafeBag`]s.
//! [`Parser::classify`] then sorts the bags into certificates and at most
//! one private key.
//!
//! ```no_run
//! use pfxview_pkcs12::Parser;
//!
//! let der = std::fs::read("bundle.p12").unwrap();
//! let parser = Parser::default();
//! let container = parser.parse(&der, "password").unwrap();
//! let classified = parser.classify(container.bags(), "password");
//! println!("{} certificates", classified.certificates.len());
//! ```

use pfxview::decoder::Decoder;
use pfxview_asn1::{Element, Integer};
use pfxview_der::Tlv;
use pfxview_x509::AlgorithmIdentifier;
use serde::Serialize;
use tracing::{debug, warn};

use crate::content_info::ContentInfo;
use crate::error::{Error, Result};
use crate::kdf::password_candidates;
use crate::mac::MacData;
use crate::pbe::EncryptionScheme;
use crate::safe_bag::parse_safe_contents;

mod classify;
pub mod content_info;
pub mod error;
pub mod kdf;
pub mod mac;
pub mod oid;
pub mod pbe;
pub mod private_key;
pub mod safe_bag;

pub use classify::{Classified, ClassifiedCertificate, PrivateKeyPresence};
pub use private_key::PrivateKeyInfo;
pub use safe_bag::{BagAttributes, BagKind, CertBag, EncryptedPrivateKeyInfo, SafeBag};

/// Ceiling on KDF and MAC iteration counts unless configured otherwise.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10_000_000;

const PFX_VERSION: u32 = 3;

/// Integrity status of a parsed container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Integrity {
    /// MacData was present and verified; `algorithm` is e.g. `HMAC-SHA-256`.
    Verified { algorithm: String },
    /// No MacData; contents are not authenticated.
    Absent,
}

/*
RFC 7292 Section 4

PFX ::= SEQUENCE {
    version     INTEGER {v3(3)}(v3,...),
    authSafe    ContentInfo,
    macData     MacData OPTIONAL
}

AuthenticatedSafe ::= SEQUENCE OF ContentInfo
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkcs12Container {
    version: u32,
    integrity: Integrity,
    bags: Vec<SafeBag>,
}

impl Pkcs12Container {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn integrity(&self) -> &Integrity {
        &self.integrity
    }

    /// Bags in document order, nested SafeContents flattened.
    pub fn bags(&self) -> &[SafeBag] {
        &self.bags
    }

    pub fn into_bags(self) -> Vec<SafeBag> {
        self.bags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parser {
    max_iterations: u32,
}

impl Default for Parser {
    fn default() -> Self {
        Parser {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl Parser {
    pub fn new(max_iterations: u32) -> Self {
        Parser { max_iterations }
    }

    /// Decodes DER bytes and parses them as a PFX.
    pub fn parse(&self, der: &[u8], password: &str) -> Result<Pkcs12Container> {
        let root = pfxview_der::decode(der)?;
        self.parse_container(&root, password)
    }

    pub fn parse_container(&self, root: &Tlv, password: &str) -> Result<Pkcs12Container> {
        let pfx = Element::try_from(root)?;
        let Some([Element::Integer(version), rest @ ..]) = pfx.as_sequence() else {
            return Err(Error::Malformed("PFX: expected Sequence starting with version".to_string()));
        };
        if version.to_u32() != Some(PFX_VERSION) {
            return Err(Error::UnsupportedVersion(version.to_string()));
        }
        let (auth_safe, mac_data) = match rest {
            [auth_safe] => (auth_safe, None),
            [auth_safe, mac_data] => (auth_safe, Some(mac_data)),
            _ => {
                return Err(Error::Malformed(
                    "PFX: expected authSafe and optional macData".to_string(),
                ));
            }
        };

        let mut candidates = password_candidates(password);
        let auth_safe: ContentInfo = auth_safe.decode()?;
        let (octets, decrypted) = match auth_safe {
            ContentInfo::Data(octets) => (octets, false),
            ContentInfo::EncryptedData {
                algorithm,
                ciphertext,
            } => {
                let scheme = EncryptionScheme::from_algorithm(&algorithm, self.max_iterations)?;
                (scheme.decrypt(&ciphertext, password, &candidates)?, true)
            }
            ContentInfo::SignedData => {
                return Err(Error::UnsupportedAlgorithm(
                    "public-key integrity mode (signedData)".to_string(),
                ));
            }
            ContentInfo::Other(content_type) => {
                return Err(Error::Malformed(format!(
                    "unexpected authSafe content type {}",
                    content_type
                )));
            }
        };

        let integrity = match mac_data {
            Some(mac_data) => {
                let mac = MacData::parse(mac_data, self.max_iterations)?;
                let verified = mac
                    .verify(&octets, &candidates)
                    .ok_or(Error::IntegrityCheckFailed)?
                    .to_vec();
                candidates = vec![verified];
                debug!(algorithm = %mac.algorithm_name(), "MAC verified");
                Integrity::Verified {
                    algorithm: mac.algorithm_name(),
                }
            }
            None => {
                warn!("PFX has no MacData, contents are not authenticated");
                Integrity::Absent
            }
        };
        let verified = matches!(integrity, Integrity::Verified { .. });

        let authenticated_safe =
            decode_payload(&octets).map_err(|e| password_suspect(e, decrypted && !verified))?;
        let Some(contents) = authenticated_safe.as_sequence() else {
            return Err(password_suspect(
                Error::Malformed("AuthenticatedSafe: expected Sequence".to_string()),
                decrypted && !verified,
            ));
        };

        let mut bags = Vec::new();
        for content in contents {
            let content: ContentInfo = content.decode()?;
            match content {
                ContentInfo::Data(octets) => {
                    let safe_contents = decode_payload(&octets)?;
                    bags.extend(parse_safe_contents(&safe_contents)?);
                }
                ContentInfo::EncryptedData {
                    algorithm,
                    ciphertext,
                } => {
                    let scheme = EncryptionScheme::from_algorithm(&algorithm, self.max_iterations)?;
                    let plaintext = scheme.decrypt(&ciphertext, password, &candidates)?;
                    let parsed = decode_payload(&plaintext)
                        .and_then(|safe_contents| parse_safe_contents(&safe_contents))
                        .map_err(|e| password_suspect(e, !verified))?;
                    bags.extend(parsed);
                }
                ContentInfo::SignedData => {
                    return Err(Error::UnsupportedAlgorithm(
                        "signedData safe contents".to_string(),
                    ));
                }
                ContentInfo::Other(content_type) => {
                    // envelopedData and friends need a private key, not a password.
                    warn!(content_type = %content_type, "skipping unsupported ContentInfo");
                }
            }
        }

        Ok(Pkcs12Container {
            version: PFX_VERSION,
            integrity,
            bags,
        })
    }

    /// Sorts bags into certificates and a private key. Shrouded keys are
    /// decrypted with `password`; failures degrade instead of erroring.
    pub fn classify(&self, bags: &[SafeBag], password: &str) -> Classified {
        classify::classify(bags, password, self.max_iterations)
    }
}

/// Parses a PFX with the default iteration ceiling.
pub fn parse_container(root: &Tlv, password: &str) -> Result<Pkcs12Container> {
    Parser::default().parse_container(root, password)
}

/// Classifies bags with the default iteration ceiling.
pub fn classify(bags: &[SafeBag], password: &str) -> Classified {
    Parser::default().classify(bags, password)
}

fn decode_payload(payload: &[u8]) -> Result<Element> {
    let tlv = pfxview_der::decode(payload)?;
    Ok(Element::try_from(&tlv)?)
}

// A payload that decrypted without authentication and then failed to decode
// most likely came from a wrong key that happened to unpad.
fn password_suspect(error: Error, suspect: bool) -> Error {
    if suspect {
        debug!(error = %error, "decrypted payload does not decode");
        Error::InvalidPassword
    } else {
        error
    }
}

pub(crate) fn algorithm_identifier(element: &Element) -> Result<AlgorithmIdentifier> {
    let algorithm: std::result::Result<AlgorithmIdentifier, _> = element.decode();
    algorithm.map_err(|e: pfxview_x509::error::Error| Error::Malformed(e.to_string()))
}

pub(crate) fn iteration_count(value: &Integer, max_iterations: u32) -> Result<u32> {
    match value.to_u64() {
        Some(n) if n >= 1 && n <= u64::from(max_iterations) => Ok(n as u32),
        _ => Err(Error::Malformed(format!(
            "iteration count {} outside 1..={}",
            value, max_iterations
        ))),
    }
}
