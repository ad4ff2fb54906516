use pfxview::decoder::Decoder;
use pfxview_asn1::Element;
use pfxview_x509::{Certificate, KeyAlgorithm};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::kdf::password_candidates;
use crate::pbe::EncryptionScheme;
use crate::private_key::PrivateKeyInfo;
use crate::safe_bag::{BagKind, CertBag, EncryptedPrivateKeyInfo, SafeBag};

/// Whether the container holds a private key, and what can be said about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PrivateKeyPresence {
    Absent,
    Plaintext {
        algorithm: KeyAlgorithm,
        key_size_bits: Option<u64>,
        /// True when the key was stored in a PKCS8ShroudedKeyBag.
        shrouded: bool,
    },
    /// A shrouded key that could not be decrypted.
    Encrypted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedCertificate {
    pub certificate: Certificate,
    pub friendly_name: Option<String>,
    pub local_key_id: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// Certificates in bag order.
    pub certificates: Vec<ClassifiedCertificate>,
    pub private_key: PrivateKeyPresence,
    /// Certificate bags that were omitted.
    pub skipped: usize,
}

pub(crate) fn classify(bags: &[SafeBag], password: &str, max_iterations: u32) -> Classified {
    let mut certificates = Vec::new();
    let mut skipped = 0;
    let mut shrouded: Option<&EncryptedPrivateKeyInfo> = None;
    let mut plaintext: Option<&Element> = None;

    for bag in bags {
        match &bag.kind {
            BagKind::Certificate(CertBag::X509(der)) => match pfxview_x509::parse_certificate(der) {
                Ok(certificate) => certificates.push(ClassifiedCertificate {
                    certificate,
                    friendly_name: bag.attributes.friendly_name.clone(),
                    local_key_id: bag.attributes.local_key_id.clone(),
                }),
                Err(e) => {
                    warn!(error = %e, "omitting certificate bag that does not decode");
                    skipped += 1;
                }
            },
            BagKind::Certificate(CertBag::Invalid(reason)) => {
                warn!(reason = %reason, "omitting certificate bag that does not decode");
                skipped += 1;
            }
            BagKind::Certificate(CertBag::Other(cert_type)) => {
                warn!(cert_type = %cert_type, "omitting non-X.509 certificate bag");
                skipped += 1;
            }
            BagKind::ShroudedKey(key) => {
                shrouded.get_or_insert(key);
            }
            BagKind::Key(key) => {
                plaintext.get_or_insert(key);
            }
            BagKind::Crl | BagKind::Secret | BagKind::Unknown(_) => {
                debug!("ignoring bag without certificate or key");
            }
        }
    }

    let private_key = match (shrouded, plaintext) {
        (Some(key), _) => match decrypt_key(key, password, max_iterations) {
            Ok(info) => PrivateKeyPresence::Plaintext {
                algorithm: info.algorithm,
                key_size_bits: info.key_size_bits,
                shrouded: true,
            },
            Err(e) => {
                warn!(error = %e, "shrouded key could not be decrypted");
                PrivateKeyPresence::Encrypted
            }
        },
        (None, Some(key)) => {
            let info: Result<PrivateKeyInfo> = key.decode();
            match info {
                Ok(info) => PrivateKeyPresence::Plaintext {
                    algorithm: info.algorithm,
                    key_size_bits: info.key_size_bits,
                    shrouded: false,
                },
                Err(e) => {
                    warn!(error = %e, "key bag does not hold a PrivateKeyInfo");
                    PrivateKeyPresence::Absent
                }
            }
        }
        (None, None) => PrivateKeyPresence::Absent,
    };

    Classified {
        certificates,
        private_key,
        skipped,
    }
}

fn decrypt_key(
    key: &EncryptedPrivateKeyInfo,
    password: &str,
    max_iterations: u32,
) -> Result<PrivateKeyInfo> {
    let scheme = EncryptionScheme::from_algorithm(&key.algorithm, max_iterations)?;
    let plaintext = scheme.decrypt(&key.encrypted_data, password, &password_candidates(password))?;
    let tlv = pfxview_der::decode(&plaintext)?;
    let element = Element::try_from(&tlv)?;
    element.decode()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pfxview_asn1::{Integer, ObjectIdentifier, OctetString};
    use pfxview_x509::AlgorithmIdentifier;

    use super::*;
    use crate::safe_bag::BagAttributes;

    const LEAF_DER: &[u8] = include_bytes!("../../testdata/leaf.der");
    const CA_DER: &[u8] = include_bytes!("../../testdata/ca.der");

    fn bag(kind: BagKind) -> SafeBag {
        SafeBag {
            kind,
            attributes: BagAttributes::default(),
        }
    }

    fn ed25519_key() -> Element {
        Element::Sequence(vec![
            Element::Integer(Integer::from(0u64)),
            Element::Sequence(vec![Element::ObjectIdentifier(
                ObjectIdentifier::from_str("1.3.101.112").unwrap(),
            )]),
            Element::OctetString(OctetString::from(vec![0x04, 0x01, 0x00])),
        ])
    }

    fn undecryptable_key() -> EncryptedPrivateKeyInfo {
        EncryptedPrivateKeyInfo {
            algorithm: AlgorithmIdentifier {
                algorithm: ObjectIdentifier::from_str("1.2.840.113549.1.12.1.3").unwrap(),
                parameters: Some(Element::Sequence(vec![
                    Element::OctetString(OctetString::from(vec![1u8; 8])),
                    Element::Integer(Integer::from(1u64)),
                ])),
            },
            encrypted_data: vec![0u8; 16],
        }
    }

    #[test]
    fn test_classify_preserves_certificate_order() {
        let mut leaf = bag(BagKind::Certificate(CertBag::X509(LEAF_DER.to_vec())));
        leaf.attributes.friendly_name = Some("leaf".to_string());
        let bags = vec![
            bag(BagKind::Certificate(CertBag::X509(CA_DER.to_vec()))),
            bag(BagKind::Crl),
            leaf,
        ];
        let classified = classify(&bags, "", 10_000_000);
        let names: Vec<Option<String>> = classified
            .certificates
            .iter()
            .map(|c| c.certificate.subject().common_name().map(str::to_string))
            .collect();
        assert_eq!(
            vec![
                Some("Pfxview Test CA".to_string()),
                Some("leaf.pfxview.test".to_string())
            ],
            names
        );
        assert_eq!(Some("leaf".to_string()), classified.certificates[1].friendly_name);
        assert_eq!(PrivateKeyPresence::Absent, classified.private_key);
        assert_eq!(0, classified.skipped);
    }

    #[test]
    fn test_classify_counts_omitted_certificates() {
        let bags = vec![
            bag(BagKind::Certificate(CertBag::X509(vec![0x30, 0x00]))),
            bag(BagKind::Certificate(CertBag::Other(
                ObjectIdentifier::from_str("1.2.840.113549.1.9.22.2").unwrap(),
            ))),
            bag(BagKind::Certificate(CertBag::X509(LEAF_DER.to_vec()))),
        ];
        let classified = classify(&bags, "", 10_000_000);
        assert_eq!(1, classified.certificates.len());
        assert_eq!(2, classified.skipped);
    }

    #[test]
    fn test_classify_counts_undecodable_cert_bag() {
        let bags = vec![
            bag(BagKind::Certificate(CertBag::X509(LEAF_DER.to_vec()))),
            bag(BagKind::Certificate(CertBag::Invalid(
                "x509Certificate value is not an OCTET STRING".to_string(),
            ))),
        ];
        let classified = classify(&bags, "", 10_000_000);
        assert_eq!(1, classified.certificates.len());
        assert_eq!(
            Some("leaf.pfxview.test"),
            classified.certificates[0].certificate.subject().common_name()
        );
        assert_eq!(1, classified.skipped);
    }

    #[test]
    fn test_classify_plaintext_key() {
        let bags = vec![bag(BagKind::Key(ed25519_key()))];
        assert_eq!(
            PrivateKeyPresence::Plaintext {
                algorithm: KeyAlgorithm::Ed25519,
                key_size_bits: Some(256),
                shrouded: false
            },
            classify(&bags, "", 10_000_000).private_key
        );
    }

    #[test]
    fn test_classify_shrouded_key_takes_precedence() {
        let bags = vec![
            bag(BagKind::Key(ed25519_key())),
            bag(BagKind::ShroudedKey(undecryptable_key())),
        ];
        assert_eq!(
            PrivateKeyPresence::Encrypted,
            classify(&bags, "wrong", 10_000_000).private_key
        );
    }
}
