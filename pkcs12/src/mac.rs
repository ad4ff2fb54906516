use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use pfxview_asn1::Element;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use tracing::debug;

use crate::error::{Error, Result};
use crate::kdf::{DigestAlgorithm, ID_MAC};
use crate::{algorithm_identifier, iteration_count};

/*
RFC 7292 Section 4

MacData ::= SEQUENCE {
    mac         DigestInfo,
    macSalt     OCTET STRING,
    iterations  INTEGER DEFAULT 1
}

DigestInfo ::= SEQUENCE {
    digestAlgorithm DigestAlgorithmIdentifier,
    digest          OCTET STRING
}
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacData {
    pub algorithm: DigestAlgorithm,
    pub digest: Vec<u8>,
    pub salt: Vec<u8>,
    pub iterations: u32,
}

impl MacData {
    pub fn parse(element: &Element, max_iterations: u32) -> Result<Self> {
        let (digest_info, salt, iterations) = match element.as_sequence() {
            Some([digest_info, Element::OctetString(salt)]) => (digest_info, salt, 1),
            Some([digest_info, Element::OctetString(salt), Element::Integer(n)]) => {
                (digest_info, salt, iteration_count(n, max_iterations)?)
            }
            _ => return Err(Error::Malformed("invalid MacData".to_string())),
        };
        let Some([algorithm, Element::OctetString(digest)]) = digest_info.as_sequence() else {
            return Err(Error::Malformed("invalid MAC DigestInfo".to_string()));
        };
        let algorithm = algorithm_identifier(algorithm)?;
        let algorithm = DigestAlgorithm::from_oid(&algorithm.algorithm.to_string())
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("MAC digest {}", algorithm)))?;
        Ok(MacData {
            algorithm,
            digest: digest.as_bytes().to_vec(),
            salt: salt.as_bytes().to_vec(),
            iterations,
        })
    }

    /// Checks the HMAC over `data` for each password encoding and returns
    /// the first one that verifies.
    pub fn verify<'a>(&self, data: &[u8], candidates: &'a [Vec<u8>]) -> Option<&'a [u8]> {
        debug!(algorithm = %self.algorithm, iterations = self.iterations, "verifying MAC");
        candidates
            .iter()
            .find(|password| {
                let key = self.algorithm.derive(
                    ID_MAC,
                    password,
                    &self.salt,
                    self.iterations,
                    self.algorithm.output_len(),
                );
                match self.algorithm {
                    DigestAlgorithm::Sha1 => hmac_matches::<Hmac<Sha1>>(&key, data, &self.digest),
                    DigestAlgorithm::Sha224 => hmac_matches::<Hmac<Sha224>>(&key, data, &self.digest),
                    DigestAlgorithm::Sha256 => hmac_matches::<Hmac<Sha256>>(&key, data, &self.digest),
                    DigestAlgorithm::Sha384 => hmac_matches::<Hmac<Sha384>>(&key, data, &self.digest),
                    DigestAlgorithm::Sha512 => hmac_matches::<Hmac<Sha512>>(&key, data, &self.digest),
                }
            })
            .map(Vec::as_slice)
    }

    /// Name of the integrity algorithm, e.g. `HMAC-SHA-256`.
    pub fn algorithm_name(&self) -> String {
        format!("HMAC-{}", self.algorithm)
    }
}

// verify_slice compares in constant time.
fn hmac_matches<M: Mac + KeyInit>(key: &[u8], data: &[u8], expected: &[u8]) -> bool {
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(key) else {
        return false;
    };
    Mac::update(&mut mac, data);
    mac.verify_slice(expected).is_ok()
}
