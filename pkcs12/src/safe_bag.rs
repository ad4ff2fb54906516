use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_asn1::{Element, ObjectIdentifier};
use pfxview_x509::AlgorithmIdentifier;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::{algorithm_identifier, oid};

/*
RFC 7292 Section 4.2

SafeContents ::= SEQUENCE OF SafeBag

SafeBag ::= SEQUENCE {
    bagId          BAG-TYPE.&id ({PKCS12BagSet}),
    bagValue       [0] EXPLICIT BAG-TYPE.&Type({PKCS12BagSet}{@bagId}),
    bagAttributes  SET OF PKCS12Attribute OPTIONAL
}

CertBag ::= SEQUENCE {
    certId      BAG-TYPE.&id   ({CertTypes}),
    certValue   [0] EXPLICIT BAG-TYPE.&Type ({CertTypes}{@certId})
}

EncryptedPrivateKeyInfo ::= SEQUENCE {
    encryptionAlgorithm  EncryptionAlgorithmIdentifier,
    encryptedData        OCTET STRING
}
*/

// Nested SafeContentsBags deeper than this are rejected.
const MAX_SAFE_CONTENTS_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertBag {
    /// DER bytes of an X.509 certificate.
    X509(Vec<u8>),
    Other(ObjectIdentifier),
    /// A certBag whose value does not decode; the reason is kept for logging.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPrivateKeyInfo {
    pub algorithm: AlgorithmIdentifier,
    pub encrypted_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BagKind {
    Certificate(CertBag),
    /// A plaintext PKCS#8 PrivateKeyInfo.
    Key(Element),
    ShroudedKey(EncryptedPrivateKeyInfo),
    Crl,
    Secret,
    Unknown(ObjectIdentifier),
}

impl BagKind {
    fn name(&self) -> &'static str {
        match self {
            BagKind::Certificate(_) => "certBag",
            BagKind::Key(_) => "keyBag",
            BagKind::ShroudedKey(_) => "pkcs8ShroudedKeyBag",
            BagKind::Crl => "crlBag",
            BagKind::Secret => "secretBag",
            BagKind::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagAttributes {
    pub friendly_name: Option<String>,
    pub local_key_id: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeBag {
    pub kind: BagKind,
    pub attributes: BagAttributes,
}

/// Decodes a SafeContents, flattening nested SafeContentsBags in place.
pub(crate) fn parse_safe_contents(element: &Element) -> Result<Vec<SafeBag>> {
    let mut bags = Vec::new();
    collect_bags(element, 0, &mut bags)?;
    Ok(bags)
}

fn collect_bags(element: &Element, depth: usize, bags: &mut Vec<SafeBag>) -> Result<()> {
    if depth > MAX_SAFE_CONTENTS_DEPTH {
        return Err(Error::Malformed("SafeContents nested too deeply".to_string()));
    }
    let Some(elements) = element.as_sequence() else {
        return Err(Error::Malformed("SafeContents: expected Sequence".to_string()));
    };
    for bag in elements {
        let (bag_id, value, attributes) = split_bag(bag)?;
        if *bag_id == oid::SAFE_CONTENTS_BAG {
            collect_bags(value, depth + 1, bags)?;
            continue;
        }
        let kind = bag_kind(bag_id, value)?;
        debug!(kind = kind.name(), "found SafeBag");
        bags.push(SafeBag {
            kind,
            attributes: bag_attributes(attributes)?,
        });
    }
    Ok(())
}

fn split_bag(bag: &Element) -> Result<(&ObjectIdentifier, &Element, Option<&Element>)> {
    match bag.as_sequence() {
        Some(
            [
                Element::ObjectIdentifier(bag_id),
                Element::ContextSpecific {
                    slot: 0,
                    constructed: true,
                    element,
                },
                rest @ ..,
            ],
        ) if rest.len() <= 1 => Ok((bag_id, element.as_ref(), rest.first())),
        _ => Err(Error::Malformed(
            "SafeBag: expected bagId, [0] bagValue and optional attributes".to_string(),
        )),
    }
}

fn bag_kind(bag_id: &ObjectIdentifier, value: &Element) -> Result<BagKind> {
    let kind = match bag_id.to_string().as_str() {
        // A broken certBag is omitted later, not fatal to its neighbours.
        oid::CERT_BAG => {
            let cert_bag: Result<CertBag> = value.decode();
            BagKind::Certificate(cert_bag.unwrap_or_else(|e| {
                warn!(error = %e, "certBag does not decode");
                CertBag::Invalid(e.to_string())
            }))
        }
        oid::KEY_BAG => BagKind::Key(value.clone()),
        oid::PKCS8_SHROUDED_KEY_BAG => {
            let key_info: EncryptedPrivateKeyInfo = value.decode()?;
            BagKind::ShroudedKey(key_info)
        }
        oid::CRL_BAG => BagKind::Crl,
        oid::SECRET_BAG => BagKind::Secret,
        _ => BagKind::Unknown(bag_id.clone()),
    };
    Ok(kind)
}

/*
PKCS12Attribute ::= SEQUENCE {
    attrId      ATTRIBUTE.&id ({PKCS12AttrSet}),
    attrValues  SET OF ATTRIBUTE.&Type ({PKCS12AttrSet}{@attrId})
}

friendlyName: BMPString, localKeyId: OCTET STRING
*/
fn bag_attributes(attributes: Option<&Element>) -> Result<BagAttributes> {
    let mut out = BagAttributes::default();
    let Some(attributes) = attributes else {
        return Ok(out);
    };
    let Some(attributes) = attributes.as_set() else {
        return Err(Error::Malformed("bagAttributes: expected Set".to_string()));
    };
    for attribute in attributes {
        let Some([Element::ObjectIdentifier(attr_id), Element::Set(values)]) = attribute.as_sequence()
        else {
            return Err(Error::Malformed("PKCS12Attribute: expected attrId and attrValues".to_string()));
        };
        match (attr_id.to_string().as_str(), values.first()) {
            (oid::FRIENDLY_NAME, Some(Element::BMPString(name))) => {
                out.friendly_name = Some(name.clone())
            }
            (oid::LOCAL_KEY_ID, Some(Element::OctetString(id))) => {
                out.local_key_id = Some(id.as_bytes().to_vec())
            }
            (other, _) => debug!(attribute = other, "ignoring bag attribute"),
        }
    }
    Ok(out)
}

impl DecodableFrom<Element> for CertBag {}

impl Decoder<Element, CertBag> for Element {
    type Error = Error;

    fn decode(&self) -> Result<CertBag> {
        match self.as_sequence() {
            Some(
                [
                    Element::ObjectIdentifier(cert_id),
                    Element::ContextSpecific {
                        slot: 0,
                        constructed: true,
                        element,
                    },
                ],
            ) => match element.as_ref() {
                Element::OctetString(der) if *cert_id == oid::X509_CERTIFICATE => {
                    Ok(CertBag::X509(der.as_bytes().to_vec()))
                }
                _ if *cert_id == oid::X509_CERTIFICATE => Err(Error::Malformed(
                    "CertBag: x509Certificate value is not an OCTET STRING".to_string(),
                )),
                _ => Ok(CertBag::Other(cert_id.clone())),
            },
            _ => Err(Error::Malformed(
                "CertBag: expected certId and [0] certValue".to_string(),
            )),
        }
    }
}

impl DecodableFrom<Element> for EncryptedPrivateKeyInfo {}

impl Decoder<Element, EncryptedPrivateKeyInfo> for Element {
    type Error = Error;

    fn decode(&self) -> Result<EncryptedPrivateKeyInfo> {
        match self.as_sequence() {
            Some([algorithm, Element::OctetString(data)]) => Ok(EncryptedPrivateKeyInfo {
                algorithm: algorithm_identifier(algorithm)?,
                encrypted_data: data.as_bytes().to_vec(),
            }),
            _ => Err(Error::Malformed(
                "EncryptedPrivateKeyInfo: expected encryptionAlgorithm and encryptedData"
                    .to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pfxview_asn1::OctetString;
    use rstest::rstest;

    use super::*;

    fn object_id(value: &str) -> Element {
        Element::ObjectIdentifier(ObjectIdentifier::from_str(value).unwrap())
    }

    fn explicit(element: Element) -> Element {
        Element::ContextSpecific {
            slot: 0,
            constructed: true,
            element: Box::new(element),
        }
    }

    fn cert_bag(der: &[u8], attributes: Option<Element>) -> Element {
        let mut bag = vec![
            object_id(oid::CERT_BAG),
            explicit(Element::Sequence(vec![
                object_id(oid::X509_CERTIFICATE),
                explicit(Element::OctetString(OctetString::from(der))),
            ])),
        ];
        bag.extend(attributes);
        Element::Sequence(bag)
    }

    fn attributes(name: &str, key_id: &[u8]) -> Element {
        Element::Set(vec![
            Element::Sequence(vec![
                object_id(oid::FRIENDLY_NAME),
                Element::Set(vec![Element::BMPString(name.to_string())]),
            ]),
            Element::Sequence(vec![
                object_id(oid::LOCAL_KEY_ID),
                Element::Set(vec![Element::OctetString(OctetString::from(key_id))]),
            ]),
            Element::Sequence(vec![
                object_id("1.3.6.1.4.1.311.17.1"),
                Element::Set(vec![Element::BMPString("provider".to_string())]),
            ]),
        ])
    }

    #[test]
    fn test_parse_safe_contents_with_attributes() {
        let contents = Element::Sequence(vec![
            cert_bag(&[0x30, 0x00], Some(attributes("leaf", &[0xab, 0x8a]))),
            cert_bag(&[0x30, 0x01], None),
        ]);
        let bags = parse_safe_contents(&contents).unwrap();
        assert_eq!(2, bags.len());
        assert_eq!(BagKind::Certificate(CertBag::X509(vec![0x30, 0x00])), bags[0].kind);
        assert_eq!(Some("leaf".to_string()), bags[0].attributes.friendly_name);
        assert_eq!(Some(vec![0xab, 0x8a]), bags[0].attributes.local_key_id);
        assert_eq!(BagAttributes::default(), bags[1].attributes);
    }

    #[test]
    fn test_parse_safe_contents_flattens_nested_bags() {
        let nested = Element::Sequence(vec![
            object_id(oid::SAFE_CONTENTS_BAG),
            explicit(Element::Sequence(vec![
                cert_bag(&[0x02], None),
                Element::Sequence(vec![object_id(oid::CRL_BAG), explicit(Element::Null)]),
            ])),
        ]);
        let contents = Element::Sequence(vec![
            cert_bag(&[0x01], None),
            nested,
            Element::Sequence(vec![object_id("1.2.3.4"), explicit(Element::Null)]),
            cert_bag(&[0x03], None),
        ]);
        let kinds: Vec<BagKind> = parse_safe_contents(&contents)
            .unwrap()
            .into_iter()
            .map(|bag| bag.kind)
            .collect();
        assert_eq!(
            vec![
                BagKind::Certificate(CertBag::X509(vec![0x01])),
                BagKind::Certificate(CertBag::X509(vec![0x02])),
                BagKind::Crl,
                BagKind::Unknown(ObjectIdentifier::from_str("1.2.3.4").unwrap()),
                BagKind::Certificate(CertBag::X509(vec![0x03])),
            ],
            kinds
        );
    }

    #[test]
    fn test_parse_safe_contents_depth_limit() {
        let mut contents = Element::Sequence(vec![]);
        for _ in 0..=MAX_SAFE_CONTENTS_DEPTH {
            contents = Element::Sequence(vec![Element::Sequence(vec![
                object_id(oid::SAFE_CONTENTS_BAG),
                explicit(contents),
            ])]);
        }
        assert!(matches!(
            parse_safe_contents(&contents),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_cert_bag_other_type() {
        let input = Element::Sequence(vec![
            object_id("1.2.840.113549.1.9.22.2"),
            explicit(Element::IA5String("sdsi".to_string())),
        ]);
        let bag: CertBag = input.decode().unwrap();
        assert_eq!(
            CertBag::Other(ObjectIdentifier::from_str("1.2.840.113549.1.9.22.2").unwrap()),
            bag
        );
    }

    #[rstest(cert_value,
        case(explicit(Element::Integer(pfxview_asn1::Integer::from(1u64)))),
        case(Element::Null),
    )]
    fn test_parse_safe_contents_keeps_neighbours_of_broken_cert_bag(cert_value: Element) {
        let broken = Element::Sequence(vec![
            object_id(oid::CERT_BAG),
            explicit(Element::Sequence(vec![object_id(oid::X509_CERTIFICATE), cert_value])),
        ]);
        let contents = Element::Sequence(vec![cert_bag(&[0x30, 0x00], None), broken]);
        let bags = parse_safe_contents(&contents).unwrap();
        assert_eq!(2, bags.len());
        assert_eq!(BagKind::Certificate(CertBag::X509(vec![0x30, 0x00])), bags[0].kind);
        assert!(matches!(
            bags[1].kind,
            BagKind::Certificate(CertBag::Invalid(_))
        ));
    }

    #[rstest]
    #[case::not_sequence(Element::Null)]
    #[case::missing_value(Element::Sequence(vec![object_id(oid::CERT_BAG)]))]
    #[case::too_many_fields(Element::Sequence(vec![
        object_id(oid::KEY_BAG),
        explicit(Element::Null),
        Element::Set(vec![]),
        Element::Null,
    ]))]
    #[case::bad_attributes(Element::Sequence(vec![
        object_id(oid::KEY_BAG),
        explicit(Element::Null),
        Element::Set(vec![Element::Null]),
    ]))]
    fn test_parse_safe_bag_malformed(#[case] bag: Element) {
        let contents = Element::Sequence(vec![bag]);
        assert!(matches!(
            parse_safe_contents(&contents),
            Err(Error::Malformed(_))
        ));
    }
}
