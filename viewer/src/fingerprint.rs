use std::fmt;

use pfxview_asn1::to_hex;
use pfxview_x509::Certificate;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintAlgorithm {
    Sha1,
    Sha256,
}

impl fmt::Display for FingerprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintAlgorithm::Sha1 => write!(f, "SHA1"),
            FingerprintAlgorithm::Sha256 => write!(f, "SHA256"),
        }
    }
}

/// Digest of the certificate's canonical DER encoding.
pub fn fingerprint(certificate: &Certificate, algorithm: FingerprintAlgorithm) -> Result<Vec<u8>> {
    let der = certificate.to_der()?;
    let digest = match algorithm {
        FingerprintAlgorithm::Sha1 => Sha1::digest(&der).to_vec(),
        FingerprintAlgorithm::Sha256 => Sha256::digest(&der).to_vec(),
    };
    Ok(digest)
}

/// Upper-case hex SHA-1 fingerprint, 40 characters with no separator.
pub fn thumbprint(certificate: &Certificate) -> Result<String> {
    Ok(to_hex(&fingerprint(certificate, FingerprintAlgorithm::Sha1)?, ""))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const LEAF_DER: &[u8] = include_bytes!("../../testdata/leaf.der");
    const CA_DER: &[u8] = include_bytes!("../../testdata/ca.der");

    #[test]
    fn test_thumbprint_known_value() {
        let certificate = pfxview_x509::parse_certificate(LEAF_DER).unwrap();
        assert_eq!(
            "AB8A5FC9D2F13F577CA3D86311E97709958D588E",
            thumbprint(&certificate).unwrap()
        );
    }

    #[rstest(input, algorithm, len,
        case(LEAF_DER, FingerprintAlgorithm::Sha1, 20),
        case(LEAF_DER, FingerprintAlgorithm::Sha256, 32),
        case(CA_DER, FingerprintAlgorithm::Sha1, 20),
        case(CA_DER, FingerprintAlgorithm::Sha256, 32),
    )]
    fn test_fingerprint_over_original_der(input: &[u8], algorithm: FingerprintAlgorithm, len: usize) {
        let certificate = pfxview_x509::parse_certificate(input).unwrap();
        let digest = fingerprint(&certificate, algorithm).unwrap();
        assert_eq!(len, digest.len());
        let expected = match algorithm {
            FingerprintAlgorithm::Sha1 => Sha1::digest(input).to_vec(),
            FingerprintAlgorithm::Sha256 => Sha256::digest(input).to_vec(),
        };
        assert_eq!(expected, digest);
    }

    #[test]
    fn test_thumbprint_is_deterministic() {
        let certificate = pfxview_x509::parse_certificate(CA_DER).unwrap();
        let first = thumbprint(&certificate).unwrap();
        assert_eq!(40, first.len());
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_eq!(first, thumbprint(&certificate.clone()).unwrap());
    }
}
