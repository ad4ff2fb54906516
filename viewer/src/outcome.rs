use chrono::{DateTime, Utc};
use pfxview::decoder::Decoder;
use pfxview::encoder::Encoder;
use pfxview_asn1::Element;
use pfxview_der::Tlv;
use pfxview_pem::{Label, Pem};
use pfxview_pkcs12::{
    BagAttributes, BagKind, CertBag, Classified, ClassifiedCertificate, EncryptedPrivateKeyInfo,
    Integrity, Parser, PrivateKeyPresence, SafeBag,
};
use pfxview_x509::Certificate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ParseOptions;
use crate::error::{Error, Result};
use crate::format::{Detected, InputFormat, detect};
use crate::info::CertificateInfo;

/// Everything recovered from a successful parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    /// Certificates in the order they appear in the input.
    pub certificates: Vec<CertificateInfo>,
    pub private_key: PrivateKeyPresence,
    pub integrity: Integrity,
    /// Certificate entries that could not be decoded.
    pub skipped: usize,
    pub format: InputFormat,
}

/// Result of [`parse`]. Every input, however broken, maps to one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ParseOutcome {
    Success(Bundle),
    /// A password failure with the empty password.
    PasswordRequired,
    InvalidPassword,
    Malformed { reason: String },
}

impl ParseOutcome {
    pub fn is_password_failure(&self) -> bool {
        matches!(
            self,
            ParseOutcome::PasswordRequired | ParseOutcome::InvalidPassword
        )
    }

    fn from_error(error: Error, password: &str) -> Self {
        match error {
            Error::Pkcs12(e) if e.is_password_error() => {
                debug!(error = %e, "password rejected");
                if password.is_empty() {
                    ParseOutcome::PasswordRequired
                } else {
                    ParseOutcome::InvalidPassword
                }
            }
            other => ParseOutcome::Malformed {
                reason: other.to_string(),
            },
        }
    }
}

/// Parses a PKCS#12 container, a DER certificate or PEM text.
///
/// `now` is the instant expiry is evaluated against.
pub fn parse(
    bytes: &[u8],
    password: &str,
    now: DateTime<Utc>,
    options: &ParseOptions,
) -> ParseOutcome {
    match parse_bundle(bytes, password, now, options) {
        Ok(bundle) => ParseOutcome::Success(bundle),
        Err(e) => ParseOutcome::from_error(e, password),
    }
}

fn parse_bundle(
    bytes: &[u8],
    password: &str,
    now: DateTime<Utc>,
    options: &ParseOptions,
) -> Result<Bundle> {
    let detected = detect(bytes)?;
    let format = detected.format();
    debug!(format = %format, "detected input format");

    let parser = Parser::new(options.max_kdf_iterations);
    let (classified, integrity) = match detected {
        Detected::Der(InputFormat::Pkcs12, root) => {
            let container = parser.parse_container(&root, password)?;
            let classified = parser.classify(container.bags(), password);
            (classified, container.integrity().clone())
        }
        Detected::Der(_, root) => {
            let certificate: Certificate = root.decode()?;
            let classified = Classified {
                certificates: vec![ClassifiedCertificate {
                    certificate,
                    friendly_name: None,
                    local_key_id: None,
                }],
                private_key: PrivateKeyPresence::Absent,
                skipped: 0,
            };
            (classified, Integrity::Absent)
        }
        Detected::Pem(text) => {
            let (bags, undecodable) = pem_bags(text)?;
            let mut classified = parser.classify(&bags, password);
            classified.skipped += undecodable;
            (classified, Integrity::Absent)
        }
    };

    if classified.certificates.is_empty() && classified.skipped > 0 {
        return Err(Error::NoCertificates(classified.skipped));
    }
    if classified.skipped > 0 {
        warn!(skipped = classified.skipped, "some certificates were omitted");
    }

    let certificates = classified
        .certificates
        .iter()
        .map(|c| CertificateInfo::new(&c.certificate, c.friendly_name.clone(), now, options))
        .collect::<Result<Vec<_>>>()?;

    Ok(Bundle {
        certificates,
        private_key: classified.private_key,
        integrity,
        skipped: classified.skipped,
        format,
    })
}

// PEM blocks become the same bags a PFX would hold, so classification is shared.
// Returns the bags and the number of certificate blocks that did not decode.
fn pem_bags(text: &str) -> Result<(Vec<SafeBag>, usize)> {
    let mut bags = Vec::new();
    let mut undecodable = 0;
    for block in pfxview_pem::parse_many(text)? {
        let kind = match block.label() {
            Label::Certificate | Label::TrustedCertificate => match certificate_der(&block) {
                Ok(der) => BagKind::Certificate(CertBag::X509(der)),
                Err(e) => {
                    warn!(error = %e, "omitting certificate block that does not decode");
                    undecodable += 1;
                    continue;
                }
            },
            Label::PrivateKey => match block_element(&block) {
                Ok(element) => BagKind::Key(element),
                Err(e) => {
                    warn!(error = %e, "ignoring private key block that does not decode");
                    continue;
                }
            },
            Label::EncryptedPrivateKey => {
                let key: Result<EncryptedPrivateKeyInfo> =
                    block_element(&block).and_then(|element| Ok(element.decode()?));
                match key {
                    Ok(key) => BagKind::ShroudedKey(key),
                    Err(e) => {
                        warn!(error = %e, "ignoring encrypted private key block that does not decode");
                        continue;
                    }
                }
            }
            other => {
                debug!(label = %other, "ignoring PEM block");
                continue;
            }
        };
        bags.push(SafeBag {
            kind,
            attributes: BagAttributes::default(),
        });
    }
    Ok((bags, undecodable))
}

// A TRUSTED CERTIFICATE block carries trust settings after the certificate.
fn certificate_der(block: &Pem) -> Result<Vec<u8>> {
    let data: Vec<u8> = block.decode()?;
    if *block.label() == Label::Certificate {
        return Ok(data);
    }
    let der = pfxview_der::decode_all(&data)?;
    let first: &Tlv = der
        .elements()
        .first()
        .ok_or_else(|| Error::UnrecognizedInput("empty TRUSTED CERTIFICATE block".to_string()))?;
    Ok(first.encode()?)
}

fn block_element(block: &Pem) -> Result<Element> {
    let data: Vec<u8> = block.decode()?;
    let tlv = pfxview_der::decode(&data)?;
    Ok(Element::try_from(&tlv)?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pfxview_x509::KeyAlgorithm;
    use rstest::rstest;

    use super::*;
    use crate::expiry::ExpiryBand;

    const MODERN: &[u8] = include_bytes!("../../testdata/modern.p12");
    const LEGACY: &[u8] = include_bytes!("../../testdata/legacy.p12");
    const PLAIN: &[u8] = include_bytes!("../../testdata/plain.p12");
    const CERTS_ONLY: &[u8] = include_bytes!("../../testdata/certs_only.p12");
    const NOMAC: &[u8] = include_bytes!("../../testdata/nomac.p12");
    const RC2_40: &[u8] = include_bytes!("../../testdata/rc2_40.p12");
    const LEAF_DER: &[u8] = include_bytes!("../../testdata/leaf.der");
    const LEAF_PEM: &str = include_str!("../../testdata/leaf.pem");
    const CA_PEM: &str = include_str!("../../testdata/ca.pem");

    const PASSWORD: &str = "correct horse";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn success(outcome: ParseOutcome) -> Bundle {
        match outcome {
            ParseOutcome::Success(bundle) => bundle,
            other => panic!("expected success, got {:?}", other),
        }
    }

    fn rsa_2048(shrouded: bool) -> PrivateKeyPresence {
        PrivateKeyPresence::Plaintext {
            algorithm: KeyAlgorithm::Rsa,
            key_size_bits: Some(2048),
            shrouded,
        }
    }

    #[rstest(input, password, algorithm, private_key,
        case(MODERN, PASSWORD, "HMAC-SHA-256", rsa_2048(true)),
        case(LEGACY, PASSWORD, "HMAC-SHA-1", rsa_2048(true)),
        case(PLAIN, "", "HMAC-SHA-256", rsa_2048(false)),
        case(CERTS_ONLY, "", "HMAC-SHA-256", PrivateKeyPresence::Absent),
        case(RC2_40, PASSWORD, "HMAC-SHA-1", PrivateKeyPresence::Absent),
    )]
    fn test_parse_pkcs12(
        input: &[u8],
        password: &str,
        algorithm: &str,
        private_key: PrivateKeyPresence,
    ) {
        let bundle = success(parse(input, password, now(), &ParseOptions::default()));
        assert_eq!(InputFormat::Pkcs12, bundle.format);
        assert_eq!(
            Integrity::Verified {
                algorithm: algorithm.to_string()
            },
            bundle.integrity
        );
        assert_eq!(private_key, bundle.private_key);
        assert_eq!(0, bundle.skipped);
        let names: Vec<Option<&str>> = bundle
            .certificates
            .iter()
            .map(|c| c.common_name.as_deref())
            .collect();
        assert_eq!(vec![Some("leaf.pfxview.test"), Some("Pfxview Test CA")], names);
    }

    #[test]
    fn test_friendly_name_is_carried() {
        let bundle = success(parse(MODERN, PASSWORD, now(), &ParseOptions::default()));
        assert_eq!(Some("leaf".to_string()), bundle.certificates[0].friendly_name);
        assert_eq!(None, bundle.certificates[1].friendly_name);
        assert_eq!(
            "AB8A5FC9D2F13F577CA3D86311E97709958D588E",
            bundle.certificates[0].thumbprint
        );
    }

    #[test]
    fn test_missing_mac_is_reported() {
        let bundle = success(parse(NOMAC, "", now(), &ParseOptions::default()));
        assert_eq!(Integrity::Absent, bundle.integrity);
        assert_eq!(2, bundle.certificates.len());
    }

    #[rstest(input, password, expected,
        case(MODERN, "", ParseOutcome::PasswordRequired),
        case(MODERN, "wrong", ParseOutcome::InvalidPassword),
        case(LEGACY, "", ParseOutcome::PasswordRequired),
        case(LEGACY, "correct horse ", ParseOutcome::InvalidPassword),
        case(PLAIN, "not empty", ParseOutcome::InvalidPassword),
    )]
    fn test_parse_password_failures(input: &[u8], password: &str, expected: ParseOutcome) {
        assert_eq!(expected, parse(input, password, now(), &ParseOptions::default()));
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::garbage(b"\x00\x01\x02\x03".to_vec())]
    #[case::truncated(MODERN[..MODERN.len() / 2].to_vec())]
    #[case::unsupported_version(vec![0x30, 0x03, 0x02, 0x01, 0x02])]
    #[case::bad_certificate_block(b"-----BEGIN CERTIFICATE-----\nMAA=\n-----END CERTIFICATE-----\n".to_vec())]
    #[case::unterminated_pem(b"-----BEGIN CERTIFICATE-----\nMAA=\n".to_vec())]
    fn test_parse_malformed(#[case] input: Vec<u8>) {
        let outcome = parse(&input, "", now(), &ParseOptions::default());
        assert!(
            matches!(outcome, ParseOutcome::Malformed { .. }),
            "{:?}",
            outcome
        );
    }

    #[test]
    fn test_iteration_ceiling_is_configurable() {
        let options = ParseOptions {
            max_kdf_iterations: 1000,
            ..Default::default()
        };
        assert!(matches!(
            parse(MODERN, PASSWORD, now(), &options),
            ParseOutcome::Malformed { .. }
        ));
    }

    #[test]
    fn test_parse_der_certificate() {
        let bundle = success(parse(LEAF_DER, "", now(), &ParseOptions::default()));
        assert_eq!(InputFormat::DerCertificate, bundle.format);
        assert_eq!(Integrity::Absent, bundle.integrity);
        assert_eq!(PrivateKeyPresence::Absent, bundle.private_key);
        assert_eq!(1, bundle.certificates.len());
        assert_eq!("1001", bundle.certificates[0].serial_number);
    }

    #[test]
    fn test_parse_pem_bundle() {
        let text = format!("{}\n{}", LEAF_PEM, CA_PEM);
        let bundle = success(parse(text.as_bytes(), "", now(), &ParseOptions::default()));
        assert_eq!(InputFormat::Pem, bundle.format);
        assert_eq!(2, bundle.certificates.len());
        assert!(bundle.certificates[1].self_issued);
        assert_eq!(ExpiryBand::Valid, bundle.certificates[0].expiry_band);
    }

    #[test]
    fn test_parse_pem_skips_bad_block() {
        let text = format!(
            "-----BEGIN CERTIFICATE-----\nMAA=\n-----END CERTIFICATE-----\n{}",
            LEAF_PEM
        );
        let bundle = success(parse(text.as_bytes(), "", now(), &ParseOptions::default()));
        assert_eq!(1, bundle.certificates.len());
        assert_eq!(1, bundle.skipped);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = parse(LEAF_DER, "", now(), &ParseOptions::default());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!("success", json["outcome"]);
        assert_eq!("der_certificate", json["format"]);
        assert_eq!("absent", json["private_key"]["status"]);
        assert_eq!(
            "password_required",
            serde_json::to_value(ParseOutcome::PasswordRequired).unwrap()["outcome"]
        );
    }
}
