//! X.509 certificate decoding.
//!
//! [`parse_certificate`] turns DER bytes into a [`Certificate`]. The decoded
//! DER tree is kept alongside the typed fields so the certificate (and its
//! TBSCertificate) can be re-encoded byte for byte, which is what
//! fingerprints are computed over.

use std::fmt;

use num_bigint::Sign;
use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview::encoder::Encoder;
use pfxview_asn1::{BitString, Element, Integer, to_hex};
use pfxview_der::Tlv;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::Error;

pub mod algorithm;
pub mod error;
pub mod extensions;
pub mod name;
pub mod public_key;
pub mod validity;

pub use algorithm::AlgorithmIdentifier;
pub use extensions::{Extension, InterpretedValue, RawExtension};
pub use name::{AttributeTypeAndValue, Name, RelativeDistinguishedName};
pub use public_key::{KeyAlgorithm, SubjectPublicKeyInfo};
pub use validity::Validity;

/*
https://datatracker.ietf.org/doc/html/rfc5280#section-4.1

Certificate  ::=  SEQUENCE  {
    tbsCertificate       TBSCertificate,
    signatureAlgorithm   AlgorithmIdentifier,
    signatureValue       BIT STRING
}
 */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certificate {
    tbs_certificate: TBSCertificate,
    signature_algorithm: AlgorithmIdentifier,
    signature_value: BitString,
    #[serde(skip)]
    tlv: Tlv,
}

/// Decodes one DER-encoded certificate.
pub fn parse_certificate(der: &[u8]) -> Result<Certificate, Error> {
    let tlv = pfxview_der::decode(der)?;
    tlv.decode()
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        parse_certificate(der)
    }

    pub fn tbs_certificate(&self) -> &TBSCertificate {
        &self.tbs_certificate
    }

    pub fn signature_algorithm(&self) -> &AlgorithmIdentifier {
        &self.signature_algorithm
    }

    pub fn signature_value(&self) -> &BitString {
        &self.signature_value
    }

    pub fn version(&self) -> Version {
        self.tbs_certificate.version
    }

    pub fn serial_number(&self) -> &CertificateSerialNumber {
        &self.tbs_certificate.serial_number
    }

    pub fn issuer(&self) -> &Name {
        &self.tbs_certificate.issuer
    }

    pub fn subject(&self) -> &Name {
        &self.tbs_certificate.subject
    }

    pub fn validity(&self) -> &Validity {
        &self.tbs_certificate.validity
    }

    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfo {
        &self.tbs_certificate.subject_public_key_info
    }

    pub fn extensions(&self) -> &[RawExtension] {
        &self.tbs_certificate.extensions
    }

    /// Finds and parses the extension `T`, if the certificate carries it.
    pub fn extension<T: Extension>(&self) -> Result<Option<T>, Error> {
        self.extensions()
            .iter()
            .find(|ext| *ext.oid() == T::OID)
            .map(|ext| ext.parse::<T>())
            .transpose()
    }

    /// Subject and issuer are equal. The signature is not checked.
    pub fn is_self_issued(&self) -> bool {
        self.tbs_certificate.subject == self.tbs_certificate.issuer
    }

    /// Canonical DER of the whole certificate.
    pub fn to_der(&self) -> Result<Vec<u8>, Error> {
        Ok(self.tlv.encode()?)
    }

    /// Canonical DER of the TBSCertificate.
    pub fn tbs_der(&self) -> Result<Vec<u8>, Error> {
        let tbs = self
            .tlv
            .tlvs()
            .and_then(|tlvs| tlvs.first())
            .ok_or_else(|| Error::InvalidCertificate("missing TBSCertificate".to_string()))?;
        Ok(tbs.encode()?)
    }
}

impl DecodableFrom<Tlv> for Certificate {}

impl Decoder<Tlv, Certificate> for Tlv {
    type Error = Error;

    fn decode(&self) -> Result<Certificate, Self::Error> {
        let element = Element::try_from(self)?;
        let Some([tbs, signature_algorithm, Element::BitString(signature_value)]) =
            element.as_sequence()
        else {
            return Err(Error::InvalidCertificate(
                "expected Sequence of TBSCertificate, AlgorithmIdentifier and BIT STRING"
                    .to_string(),
            ));
        };

        let tbs_certificate: TBSCertificate = tbs.decode()?;
        let signature_algorithm: AlgorithmIdentifier = signature_algorithm.decode()?;
        if signature_algorithm.algorithm != tbs_certificate.signature.algorithm {
            debug!(
                outer = %signature_algorithm,
                inner = %tbs_certificate.signature,
                "signature algorithm differs from TBSCertificate signature"
            );
        }
        debug!(
            serial = %tbs_certificate.serial_number,
            subject = %tbs_certificate.subject,
            "decoded certificate"
        );

        Ok(Certificate {
            tbs_certificate,
            signature_algorithm,
            signature_value: signature_value.clone(),
            tlv: self.clone(),
        })
    }
}

/*
TBSCertificate  ::=  SEQUENCE  {
     version         [0]  EXPLICIT Version DEFAULT v1,
     serialNumber         CertificateSerialNumber,
     signature            AlgorithmIdentifier,
     issuer               Name,
     validity             Validity,
     subject              Name,
     subjectPublicKeyInfo SubjectPublicKeyInfo,
     issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
                          -- If present, version MUST be v2 or v3
     subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
                          -- If present, version MUST be v2 or v3
     extensions      [3]  EXPLICIT Extensions OPTIONAL
                          -- If present, version MUST be v3
}
 */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TBSCertificate {
    version: Version,
    serial_number: CertificateSerialNumber,
    signature: AlgorithmIdentifier,
    issuer: Name,
    validity: Validity,
    subject: Name,
    subject_public_key_info: SubjectPublicKeyInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer_unique_id: Option<BitString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_unique_id: Option<BitString>,
    extensions: Vec<RawExtension>,
}

impl TBSCertificate {
    pub fn signature(&self) -> &AlgorithmIdentifier {
        &self.signature
    }

    pub fn issuer_unique_id(&self) -> Option<&BitString> {
        self.issuer_unique_id.as_ref()
    }

    pub fn subject_unique_id(&self) -> Option<&BitString> {
        self.subject_unique_id.as_ref()
    }
}

fn unique_identifier(element: &Element) -> Result<BitString, Error> {
    match element {
        Element::OctetString(octets) => Ok(BitString::try_from(octets.as_bytes())?),
        _ => Err(Error::InvalidUniqueIdentifier(
            "expected IMPLICIT BIT STRING".to_string(),
        )),
    }
}

impl DecodableFrom<Element> for TBSCertificate {}

impl Decoder<Element, TBSCertificate> for Element {
    type Error = Error;

    fn decode(&self) -> Result<TBSCertificate, Self::Error> {
        let elements = self.as_sequence().ok_or_else(|| {
            Error::InvalidCertificate("expected Sequence for TBSCertificate".to_string())
        })?;
        let mut fields = elements.iter().peekable();

        let version = match fields.peek() {
            Some(Element::ContextSpecific {
                slot: 0, element, ..
            }) => {
                let version: Version = element.as_ref().decode()?;
                fields.next();
                version
            }
            _ => Version::V1,
        };

        let mut next = |field: &str| {
            fields
                .next()
                .ok_or_else(|| Error::InvalidCertificate(format!("missing {}", field)))
        };
        let serial_number: CertificateSerialNumber = next("serialNumber")?.decode()?;
        let signature: AlgorithmIdentifier = next("signature")?.decode()?;
        let issuer: Name = next("issuer")?.decode()?;
        let validity: Validity = next("validity")?.decode()?;
        let subject: Name = next("subject")?.decode()?;
        let subject_public_key_info: SubjectPublicKeyInfo =
            next("subjectPublicKeyInfo")?.decode()?;

        let mut issuer_unique_id = None;
        let mut subject_unique_id = None;
        let mut extensions = Vec::new();
        for field in fields {
            match field {
                Element::ContextSpecific {
                    slot: 1, element, ..
                } => issuer_unique_id = Some(unique_identifier(element)?),
                Element::ContextSpecific {
                    slot: 2, element, ..
                } => subject_unique_id = Some(unique_identifier(element)?),
                Element::ContextSpecific {
                    slot: 3, element, ..
                } => {
                    let list = element.as_sequence().ok_or_else(|| {
                        Error::InvalidExtension("expected Sequence of Extension".to_string())
                    })?;
                    extensions = list
                        .iter()
                        .map(|ext| ext.decode())
                        .collect::<Result<Vec<RawExtension>, _>>()?;
                }
                other => {
                    return Err(Error::InvalidCertificate(format!(
                        "unexpected TBSCertificate field {}",
                        other
                    )));
                }
            }
        }

        Ok(TBSCertificate {
            version,
            serial_number,
            signature,
            issuer,
            validity,
            subject,
            subject_public_key_info,
            issuer_unique_id,
            subject_unique_id,
            extensions,
        })
    }
}

/*
Version  ::=  INTEGER  {  v1(0), v2(1), v3(2)  }
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Version {
    V1 = 0,
    V2 = 1,
    V3 = 2,
}

impl Version {
    /// The human-facing version number (1, 2 or 3).
    pub fn number(&self) -> u8 {
        *self as u8 + 1
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

impl DecodableFrom<Element> for Version {}

impl Decoder<Element, Version> for Element {
    type Error = Error;

    fn decode(&self) -> Result<Version, Self::Error> {
        match self.as_integer().map(Integer::to_u64) {
            Some(Some(0)) => Ok(Version::V1),
            Some(Some(1)) => Ok(Version::V2),
            Some(Some(2)) => Ok(Version::V3),
            Some(_) => Err(Error::InvalidVersion(format!(
                "unknown version value: {}",
                self
            ))),
            None => Err(Error::InvalidVersion(
                "expected Integer for Version".to_string(),
            )),
        }
    }
}

/// CertificateSerialNumber ::= INTEGER
///
/// Serials are up to 20 octets and are rendered as hex, never as a number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CertificateSerialNumber {
    inner: Integer,
}

impl CertificateSerialNumber {
    pub fn as_integer(&self) -> &Integer {
        &self.inner
    }

    fn sign_prefix(&self) -> &'static str {
        if self.inner.as_bigint().sign() == Sign::Minus {
            "-"
        } else {
            ""
        }
    }

    fn magnitude(&self) -> Vec<u8> {
        self.inner.as_bigint().magnitude().to_bytes_be()
    }

    /// Upper-case hex of the magnitude in whole octets, e.g. `1001`.
    pub fn to_hex(&self) -> String {
        format!("{}{}", self.sign_prefix(), to_hex(&self.magnitude(), ""))
    }

    /// Hex octets joined by `separator`, e.g. `10:01`.
    pub fn to_colon_hex(&self, separator: &str) -> String {
        format!(
            "{}{}",
            self.sign_prefix(),
            to_hex(&self.magnitude(), separator)
        )
    }
}

impl fmt::Display for CertificateSerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for CertificateSerialNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl DecodableFrom<Element> for CertificateSerialNumber {}

impl Decoder<Element, CertificateSerialNumber> for Element {
    type Error = Error;

    fn decode(&self) -> Result<CertificateSerialNumber, Self::Error> {
        match self {
            Element::Integer(i) => Ok(CertificateSerialNumber { inner: i.clone() }),
            _ => Err(Error::InvalidCertificateSerialNumber(
                "expected Integer for CertificateSerialNumber".to_string(),
            )),
        }
    }
}
