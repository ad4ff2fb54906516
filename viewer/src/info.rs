use chrono::{DateTime, Utc};
use pfxview_asn1::to_hex;
use pfxview_x509::{Certificate, InterpretedValue, KeyAlgorithm, RawExtension};
use serde::Serialize;

use crate::config::ParseOptions;
use crate::error::Result;
use crate::expiry::{ExpiryBand, days_until_expiry, expiry_band, is_expired};
use crate::fingerprint::{FingerprintAlgorithm, fingerprint};

/// Display-ready projection of a certificate, evaluated at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateInfo {
    pub version: u8,
    pub subject: String,
    pub issuer: String,
    /// `(short name, value)` pairs, last occurrence of a name wins.
    pub subject_fields: Vec<(String, String)>,
    pub issuer_fields: Vec<(String, String)>,
    pub common_name: Option<String>,
    pub serial_number: String,
    pub colon_serial_number: String,
    pub thumbprint: String,
    pub colon_thumbprint: String,
    pub sha256_fingerprint: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub is_expired: bool,
    pub days_until_expiry: i64,
    pub expiry_band: ExpiryBand,
    pub public_key: PublicKeySummary,
    pub signature_algorithm: String,
    pub extensions: Vec<ExtensionInfo>,
    pub friendly_name: Option<String>,
    pub self_issued: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicKeySummary {
    pub algorithm: KeyAlgorithm,
    pub key_size_bits: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionInfo {
    pub oid: String,
    /// Known name of the extension, or the dotted OID.
    pub label: String,
    pub critical: bool,
    /// Interpreted rendering when available, the raw rendering otherwise.
    pub value: String,
    pub interpreted: Option<InterpretedValue>,
}

impl From<&RawExtension> for ExtensionInfo {
    fn from(extension: &RawExtension) -> Self {
        let oid = extension.oid().to_string();
        let interpreted = extension.interpret();
        let value = match &interpreted {
            Some(value) => value.to_string(),
            None => extension.render_raw(),
        };
        ExtensionInfo {
            label: extension.label().map(str::to_string).unwrap_or_else(|| oid.clone()),
            oid,
            critical: extension.critical(),
            value,
            interpreted,
        }
    }
}

impl CertificateInfo {
    pub fn new(
        certificate: &Certificate,
        friendly_name: Option<String>,
        now: DateTime<Utc>,
        options: &ParseOptions,
    ) -> Result<Self> {
        let separator = options.fingerprint_separator.as_str();
        let sha1 = fingerprint(certificate, FingerprintAlgorithm::Sha1)?;
        let sha256 = fingerprint(certificate, FingerprintAlgorithm::Sha256)?;
        let validity = certificate.validity();
        let spki = certificate.subject_public_key_info();

        Ok(CertificateInfo {
            version: certificate.version().number(),
            subject: certificate.subject().to_string(),
            issuer: certificate.issuer().to_string(),
            subject_fields: certificate.subject().flatten(),
            issuer_fields: certificate.issuer().flatten(),
            common_name: certificate.subject().common_name().map(str::to_string),
            serial_number: certificate.serial_number().to_hex(),
            colon_serial_number: certificate.serial_number().to_colon_hex(separator),
            thumbprint: to_hex(&sha1, ""),
            colon_thumbprint: to_hex(&sha1, separator),
            sha256_fingerprint: to_hex(&sha256, separator),
            not_before: validity.not_before,
            not_after: validity.not_after,
            is_expired: is_expired(validity.not_after, now),
            days_until_expiry: days_until_expiry(validity.not_after, now),
            expiry_band: expiry_band(validity.not_after, now, options.expiring_soon_days),
            public_key: PublicKeySummary {
                algorithm: spki.key_algorithm(),
                key_size_bits: spki.key_size_bits(),
            },
            signature_algorithm: certificate.signature_algorithm().to_string(),
            extensions: certificate.extensions().iter().map(ExtensionInfo::from).collect(),
            friendly_name,
            self_issued: certificate.is_self_issued(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    const LEAF_DER: &[u8] = include_bytes!("../../testdata/leaf.der");
    const CA_DER: &[u8] = include_bytes!("../../testdata/ca.der");

    fn info(der: &[u8], now: DateTime<Utc>, options: &ParseOptions) -> CertificateInfo {
        let certificate = pfxview_x509::parse_certificate(der).unwrap();
        CertificateInfo::new(&certificate, Some("leaf".to_string()), now, options).unwrap()
    }

    #[test]
    fn test_leaf_info() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let info = info(LEAF_DER, now, &ParseOptions::default());
        assert_eq!(3, info.version);
        assert_eq!(Some("leaf.pfxview.test".to_string()), info.common_name);
        assert_eq!(
            "C=JP, O=Pfxview Test, CN=Pfxview Test CA",
            info.issuer
        );
        assert_eq!(
            Some(&("OU".to_string(), "Platform".to_string())),
            info.subject_fields.get(2)
        );
        assert_eq!("1001", info.serial_number);
        assert_eq!("10:01", info.colon_serial_number);
        assert_eq!("AB8A5FC9D2F13F577CA3D86311E97709958D588E", info.thumbprint);
        assert_eq!(
            "AB:8A:5F:C9:D2:F1:3F:57:7C:A3:D8:63:11:E9:77:09:95:8D:58:8E",
            info.colon_thumbprint
        );
        assert_eq!(32 * 3 - 1, info.sha256_fingerprint.len());
        assert!(!info.is_expired);
        assert_eq!(ExpiryBand::Valid, info.expiry_band);
        assert_eq!(KeyAlgorithm::Rsa, info.public_key.algorithm);
        assert_eq!(Some(2048), info.public_key.key_size_bits);
        assert_eq!("ecdsa-with-SHA256", info.signature_algorithm);
        assert_eq!(Some("leaf".to_string()), info.friendly_name);
        assert!(!info.self_issued);
    }

    #[test]
    fn test_extensions_are_never_dropped() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let info = info(LEAF_DER, now, &ParseOptions::default());
        assert_eq!(7, info.extensions.len());

        let basic_constraints = &info.extensions[0];
        assert_eq!("Basic Constraints", basic_constraints.label);
        assert!(basic_constraints.critical);
        assert_eq!("CA:FALSE", basic_constraints.value);
        assert!(basic_constraints.interpreted.is_some());

        let private = &info.extensions[6];
        assert_eq!("1.3.6.1.4.1.55555.2", private.label);
        assert_eq!("hello", private.value);
        assert_eq!(None, private.interpreted);
    }

    #[rstest(now, expired, days, band,
        // notAfter is 2027-03-01T12:00:00Z
        case(Utc.with_ymd_and_hms(2027, 1, 30, 12, 0, 0).unwrap(), false, 30, ExpiryBand::ExpiringSoon),
        case(Utc.with_ymd_and_hms(2027, 1, 29, 12, 0, 0).unwrap(), false, 31, ExpiryBand::Valid),
        case(Utc.with_ymd_and_hms(2027, 3, 1, 12, 0, 0).unwrap(), false, 0, ExpiryBand::Valid),
        case(Utc.with_ymd_and_hms(2027, 3, 1, 12, 0, 1).unwrap(), true, 0, ExpiryBand::Expired),
        case(Utc.with_ymd_and_hms(2027, 3, 11, 12, 0, 0).unwrap(), true, -10, ExpiryBand::Expired),
    )]
    fn test_expiry_fields(now: DateTime<Utc>, expired: bool, days: i64, band: ExpiryBand) {
        let info = info(LEAF_DER, now, &ParseOptions::default());
        assert_eq!(expired, info.is_expired);
        assert_eq!(days, info.days_until_expiry);
        assert_eq!(band, info.expiry_band);
    }

    #[test]
    fn test_separator_option() {
        let options = ParseOptions {
            fingerprint_separator: " ".to_string(),
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let info = info(CA_DER, now, &options);
        assert_eq!(
            "A1 B2 C3 D4 E5 F6 07 18 29 3A 4B 5C 6D 7E 8F 90",
            info.colon_serial_number
        );
        assert!(info.self_issued);
        assert_eq!(
            KeyAlgorithm::Ec {
                curve: Some("P-256".to_string())
            },
            info.public_key.algorithm
        );
    }
}
