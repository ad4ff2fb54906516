use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_asn1::Element;
use pfxview_x509::{AlgorithmIdentifier, KeyAlgorithm};
use serde::Serialize;

use crate::algorithm_identifier;
use crate::error::Error;

/*
RFC 5958 Section 2

OneAsymmetricKey ::= SEQUENCE {
    version                   Version,
    privateKeyAlgorithm       PrivateKeyAlgorithmIdentifier,
    privateKey                PrivateKey,
    attributes            [0] Attributes OPTIONAL,
    ...,
    [[2: publicKey        [1] PublicKey OPTIONAL ]],
    ...
}

RFC 8017 Appendix A.1.2
RSAPrivateKey ::= SEQUENCE { version, modulus INTEGER, publicExponent INTEGER, ... }

RFC 5915 Section 3
ECPrivateKey ::= SEQUENCE {
    version        INTEGER { ecPrivkeyVer1(1) },
    privateKey     OCTET STRING,
    parameters [0] ECParameters {{ NamedCurve }} OPTIONAL,
    publicKey  [1] BIT STRING OPTIONAL
}
*/

/// Algorithm and size of a PKCS#8 private key. Key material is not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivateKeyInfo {
    pub algorithm: KeyAlgorithm,
    pub key_size_bits: Option<u64>,
}

impl DecodableFrom<Element> for PrivateKeyInfo {}

impl Decoder<Element, PrivateKeyInfo> for Element {
    type Error = Error;

    fn decode(&self) -> Result<PrivateKeyInfo, Self::Error> {
        let (algorithm, private_key) = match self.as_sequence() {
            Some([Element::Integer(_), algorithm, Element::OctetString(private_key), ..]) => {
                (algorithm_identifier(algorithm)?, private_key)
            }
            _ => {
                return Err(Error::Malformed(
                    "PrivateKeyInfo: expected version, algorithm and privateKey".to_string(),
                ));
            }
        };
        // The inner key structure is optional information; a key whose body
        // does not decode still reports its algorithm.
        let inner: Option<Element> = private_key.decode().ok();

        let mut key_algorithm = KeyAlgorithm::from_identifier(&algorithm);
        let mut parameters = algorithm.parameters.clone();
        if key_algorithm == (KeyAlgorithm::Ec { curve: None }) {
            if let Some(curve) = inner.as_ref().and_then(ec_private_key_curve) {
                parameters = Some(curve.clone());
                key_algorithm = KeyAlgorithm::from_identifier(&AlgorithmIdentifier {
                    algorithm: algorithm.algorithm.clone(),
                    parameters: parameters.clone(),
                });
            }
        }

        let key_size_bits = match key_algorithm {
            KeyAlgorithm::Rsa => match inner.as_ref().and_then(Element::as_sequence) {
                Some([Element::Integer(_), Element::Integer(modulus), ..]) => {
                    Some(modulus.as_bigint().bits())
                }
                _ => None,
            },
            _ => key_algorithm.parameter_bits(parameters.as_ref()),
        };
        Ok(PrivateKeyInfo {
            algorithm: key_algorithm,
            key_size_bits,
        })
    }
}

fn ec_private_key_curve(key: &Element) -> Option<&Element> {
    key.as_sequence()?.iter().find_map(|field| match field {
        Element::ContextSpecific {
            slot: 0,
            constructed: true,
            element,
        } => Some(element.as_ref()),
        _ => None,
    })
}
