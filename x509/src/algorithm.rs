use std::fmt;

use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_asn1::{Element, ObjectIdentifier};
use serde::Serialize;

use crate::error::Error;

/*
RFC 5280 Section 4.1.1.2

AlgorithmIdentifier  ::=  SEQUENCE  {
    algorithm               OBJECT IDENTIFIER,
    parameters              ANY DEFINED BY algorithm OPTIONAL
}
*/

const ALGORITHM_NAMES: &[(&str, &str)] = &[
    ("1.2.840.113549.1.1.1", "rsaEncryption"),
    ("1.2.840.113549.1.1.4", "md5WithRSAEncryption"),
    ("1.2.840.113549.1.1.5", "sha1WithRSAEncryption"),
    ("1.2.840.113549.1.1.10", "rsassaPss"),
    ("1.2.840.113549.1.1.11", "sha256WithRSAEncryption"),
    ("1.2.840.113549.1.1.12", "sha384WithRSAEncryption"),
    ("1.2.840.113549.1.1.13", "sha512WithRSAEncryption"),
    ("1.2.840.113549.1.1.14", "sha224WithRSAEncryption"),
    ("1.2.840.10045.2.1", "id-ecPublicKey"),
    ("1.2.840.10045.4.1", "ecdsa-with-SHA1"),
    ("1.2.840.10045.4.3.1", "ecdsa-with-SHA224"),
    ("1.2.840.10045.4.3.2", "ecdsa-with-SHA256"),
    ("1.2.840.10045.4.3.3", "ecdsa-with-SHA384"),
    ("1.2.840.10045.4.3.4", "ecdsa-with-SHA512"),
    ("1.2.840.10040.4.1", "dsaEncryption"),
    ("1.2.840.10040.4.3", "dsa-with-SHA1"),
    ("2.16.840.1.101.3.4.3.2", "dsa_with_SHA256"),
    ("1.3.101.110", "X25519"),
    ("1.3.101.111", "X448"),
    ("1.3.101.112", "ED25519"),
    ("1.3.101.113", "ED448"),
];

/// An algorithm OID with its parameters.
///
/// Parameters stay as a generic [`Element`]; each consumer (public keys,
/// PBE schemes, MAC digests) reads the shape it expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmIdentifier {
    pub algorithm: ObjectIdentifier,
    #[serde(skip)]
    pub parameters: Option<Element>,
}

impl AlgorithmIdentifier {
    /// Conventional name of the algorithm, when it is a well-known one.
    pub fn name(&self) -> Option<&'static str> {
        let oid = self.algorithm.to_string();
        ALGORITHM_NAMES
            .iter()
            .find(|(known, _)| *known == oid)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for AlgorithmIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.algorithm),
        }
    }
}

impl DecodableFrom<Element> for AlgorithmIdentifier {}

impl Decoder<Element, AlgorithmIdentifier> for Element {
    type Error = Error;

    fn decode(&self) -> Result<AlgorithmIdentifier, Self::Error> {
        match self.as_sequence() {
            Some([Element::ObjectIdentifier(oid)]) => Ok(AlgorithmIdentifier {
                algorithm: oid.clone(),
                parameters: None,
            }),
            Some([Element::ObjectIdentifier(oid), parameters]) => Ok(AlgorithmIdentifier {
                algorithm: oid.clone(),
                parameters: Some(parameters.clone()),
            }),
            Some(_) => Err(Error::InvalidAlgorithmIdentifier(
                "expected OBJECT IDENTIFIER and optional parameters".to_string(),
            )),
            None => Err(Error::InvalidAlgorithmIdentifier(
                "expected Sequence for AlgorithmIdentifier".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest(input, expected,
        case("1.2.840.113549.1.1.11", "sha256WithRSAEncryption"),
        case("1.2.840.10045.4.3.2", "ecdsa-with-SHA256"),
        case("1.3.101.112", "ED25519"),
        case("1.2.3.4.5", "1.2.3.4.5"),
    )]
    fn test_algorithm_display(input: &str, expected: &str) {
        let alg = AlgorithmIdentifier {
            algorithm: ObjectIdentifier::from_str(input).unwrap(),
            parameters: None,
        };
        assert_eq!(expected, alg.to_string());
    }

    #[test]
    fn test_decode_algorithm_identifier() {
        let oid = ObjectIdentifier::from_str("1.2.840.113549.1.1.1").unwrap();
        let element = Element::Sequence(vec![Element::ObjectIdentifier(oid.clone()), Element::Null]);
        let alg: AlgorithmIdentifier = element.decode().unwrap();
        assert_eq!(oid, alg.algorithm);
        assert_eq!(Some(Element::Null), alg.parameters);

        let absent = Element::Sequence(vec![Element::ObjectIdentifier(oid)]);
        let alg: AlgorithmIdentifier = absent.decode().unwrap();
        assert_eq!(None, alg.parameters);
    }

    #[rstest]
    #[case::empty(Element::Sequence(vec![]))]
    #[case::not_oid(Element::Sequence(vec![Element::Null]))]
    #[case::too_many(Element::Sequence(vec![Element::ObjectIdentifier(ObjectIdentifier::from_str("1.2.3").unwrap()), Element::Null, Element::Null]))]
    #[case::not_sequence(Element::Null)]
    fn test_decode_algorithm_identifier_invalid(#[case] input: Element) {
        let result: Result<AlgorithmIdentifier, Error> = input.decode();
        assert!(result.is_err());
    }
}
