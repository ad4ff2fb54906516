use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_asn1::{Element, ObjectIdentifier};
use pfxview_x509::AlgorithmIdentifier;
use tracing::debug;

use crate::error::Error;
use crate::{algorithm_identifier, oid};

/*
RFC 5652 Section 3 and 8

ContentInfo ::= SEQUENCE {
    contentType ContentType,
    content [0] EXPLICIT ANY DEFINED BY contentType
}

EncryptedData ::= SEQUENCE {
    version CMSVersion,
    encryptedContentInfo EncryptedContentInfo,
    unprotectedAttrs [1] IMPLICIT UnprotectedAttributes OPTIONAL
}

EncryptedContentInfo ::= SEQUENCE {
    contentType ContentType,
    contentEncryptionAlgorithm ContentEncryptionAlgorithmIdentifier,
    encryptedContent [0] IMPLICIT EncryptedContent OPTIONAL
}
*/

/// A PKCS#7 ContentInfo as it appears in a PFX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentInfo {
    Data(Vec<u8>),
    EncryptedData {
        algorithm: AlgorithmIdentifier,
        ciphertext: Vec<u8>,
    },
    /// Public-key integrity or privacy mode.
    SignedData,
    Other(ObjectIdentifier),
}

impl DecodableFrom<Element> for ContentInfo {}

impl Decoder<Element, ContentInfo> for Element {
    type Error = Error;

    fn decode(&self) -> Result<ContentInfo, Self::Error> {
        let (content_type, content) = match self.as_sequence() {
            Some([Element::ObjectIdentifier(oid)]) => (oid, None),
            Some(
                [
                    Element::ObjectIdentifier(oid),
                    Element::ContextSpecific {
                        slot: 0,
                        constructed: true,
                        element,
                    },
                ],
            ) => (oid, Some(element.as_ref())),
            _ => {
                return Err(Error::Malformed(
                    "ContentInfo: expected contentType and [0] content".to_string(),
                ));
            }
        };
        debug!(content_type = %content_type, "decoding ContentInfo");
        match content_type.to_string().as_str() {
            oid::DATA => match content {
                Some(Element::OctetString(data)) => Ok(ContentInfo::Data(data.as_bytes().to_vec())),
                _ => Err(Error::Malformed("data: expected OCTET STRING content".to_string())),
            },
            oid::ENCRYPTED_DATA => encrypted_data(content),
            oid::SIGNED_DATA => Ok(ContentInfo::SignedData),
            _ => Ok(ContentInfo::Other(content_type.clone())),
        }
    }
}

fn encrypted_data(content: Option<&Element>) -> Result<ContentInfo, Error> {
    let encrypted_content_info = match content.and_then(Element::as_sequence) {
        Some([Element::Integer(_), info, ..]) => info,
        _ => {
            return Err(Error::Malformed(
                "encryptedData: expected version and EncryptedContentInfo".to_string(),
            ));
        }
    };
    match encrypted_content_info.as_sequence() {
        Some([Element::ObjectIdentifier(_), algorithm, encrypted_content]) => {
            let algorithm = algorithm_identifier(algorithm)?;
            let ciphertext = implicit_octets(encrypted_content).ok_or_else(|| {
                Error::Malformed("encryptedData: invalid encryptedContent".to_string())
            })?;
            Ok(ContentInfo::EncryptedData {
                algorithm,
                ciphertext,
            })
        }
        Some([Element::ObjectIdentifier(_), _]) => Err(Error::Malformed(
            "encryptedData: encryptedContent is absent".to_string(),
        )),
        _ => Err(Error::Malformed(
            "encryptedData: invalid EncryptedContentInfo".to_string(),
        )),
    }
}

// [0] IMPLICIT OCTET STRING, primitive or in constructed segments.
fn implicit_octets(element: &Element) -> Option<Vec<u8>> {
    let Element::ContextSpecific {
        slot: 0,
        constructed,
        element,
    } = element
    else {
        return None;
    };
    match element.as_ref() {
        Element::OctetString(data) => Some(data.as_bytes().to_vec()),
        Element::Sequence(segments) if *constructed => {
            segments.iter().try_fold(Vec::new(), |mut out, segment| {
                out.extend_from_slice(segment.as_octet_string()?.as_bytes());
                Some(out)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn element(der: &[u8]) -> Element {
        Element::try_from(&pfxview_der::decode(der).unwrap()).unwrap()
    }

    #[test]
    fn test_decode_data() {
        // data, [0] { OCTET STRING 01 02 }
        let input = element(&[
            0x30, 0x11, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01, 0xa0,
            0x04, 0x04, 0x02, 0x01, 0x02,
        ]);
        let info: ContentInfo = input.decode().unwrap();
        assert_eq!(ContentInfo::Data(vec![0x01, 0x02]), info);
    }

    #[rstest(input, segmented,
        // primitive encryptedContent
        case(vec![0x80, 0x02, 0xaa, 0xbb], false),
        // constructed encryptedContent in two segments
        case(vec![0xa0, 0x06, 0x04, 0x01, 0xaa, 0x04, 0x01, 0xbb], true),
    )]
    fn test_decode_encrypted_data(input: Vec<u8>, segmented: bool) {
        // encryptedData, [0] { SEQUENCE { 0, SEQUENCE { data, SEQUENCE { pbeWithSHAAnd3-KeyTripleDES-CBC }, content } } }
        let algorithm = [
            0x30, 0x0c, 0x06, 0x0a, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x0c, 0x01, 0x03,
        ];
        let data_oid = [0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01];
        let mut eci = vec![0x30, (data_oid.len() + algorithm.len() + input.len()) as u8];
        eci.extend_from_slice(&data_oid);
        eci.extend_from_slice(&algorithm);
        eci.extend_from_slice(&input);
        let mut encrypted = vec![0x30, (eci.len() + 3) as u8, 0x02, 0x01, 0x00];
        encrypted.extend_from_slice(&eci);
        let mut der = vec![0x30, (encrypted.len() + 13) as u8];
        der.extend_from_slice(&[0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x06]);
        der.extend_from_slice(&[0xa0, encrypted.len() as u8]);
        der.extend_from_slice(&encrypted);

        let info: ContentInfo = element(&der).decode().unwrap();
        match info {
            ContentInfo::EncryptedData {
                algorithm,
                ciphertext,
            } => {
                assert_eq!("1.2.840.113549.1.12.1.3", algorithm.algorithm.to_string());
                assert_eq!(vec![0xaa, 0xbb], ciphertext, "segmented: {}", segmented);
            }
            other => panic!("expected encryptedData, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_signed_data() {
        let input = element(&[
            0x30, 0x0f, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02, 0xa0,
            0x02, 0x30, 0x00,
        ]);
        let info: ContentInfo = input.decode().unwrap();
        assert_eq!(ContentInfo::SignedData, info);
    }

    #[rstest]
    #[case::not_sequence(Element::Null)]
    #[case::data_without_octets(element(&[
        0x30, 0x0f, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01, 0xa0,
        0x02, 0x05, 0x00,
    ]))]
    #[case::encrypted_without_content(element(&[
        0x30, 0x0f, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x06, 0xa0,
        0x02, 0x30, 0x00,
    ]))]
    fn test_decode_content_info_malformed(#[case] input: Element) {
        let result: Result<ContentInfo, Error> = input.decode();
        assert!(matches!(result, Err(Error::Malformed(_))));
    }
}
