//! X.509 v3 extensions and their interpretation.
//!
//! Every extension is kept as a [`RawExtension`]. [`interpret`] looks the OID
//! up in a fixed dispatch table and, when an interpreter exists and the
//! value decodes, returns an [`InterpretedValue`]; otherwise the caller falls
//! back to [`RawExtension::render_raw`].

use std::fmt;

use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_asn1::{Element, ObjectIdentifier, OctetString, to_hex};
use serde::Serialize;
use tracing::warn;

use crate::error::Error;

mod basic_constraints;
mod extended_key_usage;
mod general_name;
mod key_usage;
mod subject_alt_name;

pub use basic_constraints::BasicConstraints;
pub use extended_key_usage::{ExtendedKeyUsage, KeyPurpose};
pub use general_name::{GeneralName, GeneralNameKind};
pub use key_usage::KeyUsage;
pub use subject_alt_name::SubjectAltName;

/// A typed extension with a fixed OID.
pub trait Extension: Sized {
    const OID: &'static str;

    fn parse(value: &OctetString) -> Result<Self, Error>;
}

const EXTENSION_LABELS: &[(&str, &str)] = &[
    ("2.5.29.14", "Subject Key Identifier"),
    ("2.5.29.15", "Key Usage"),
    ("2.5.29.17", "Subject Alternative Name"),
    ("2.5.29.18", "Issuer Alternative Name"),
    ("2.5.29.19", "Basic Constraints"),
    ("2.5.29.30", "Name Constraints"),
    ("2.5.29.31", "CRL Distribution Points"),
    ("2.5.29.32", "Certificate Policies"),
    ("2.5.29.33", "Policy Mappings"),
    ("2.5.29.35", "Authority Key Identifier"),
    ("2.5.29.36", "Policy Constraints"),
    ("2.5.29.37", "Extended Key Usage"),
    ("2.5.29.46", "Freshest CRL"),
    ("2.5.29.54", "Inhibit Any Policy"),
    ("1.3.6.1.5.5.7.1.1", "Authority Information Access"),
    ("1.3.6.1.5.5.7.1.11", "Subject Information Access"),
    ("1.3.6.1.4.1.11129.2.4.2", "CT Precertificate SCTs"),
    ("2.16.840.1.113730.1.1", "Netscape Cert Type"),
];

/// Known display label for an extension OID.
pub fn extension_label(oid: &str) -> Option<&'static str> {
    EXTENSION_LABELS
        .iter()
        .find(|(known, _)| *known == oid)
        .map(|(_, label)| *label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interpreter {
    SubjectAltName,
    KeyUsage,
    ExtendedKeyUsage,
    BasicConstraints,
    /// Labelled pass-through of the decoded value.
    Labeled(&'static str),
}

const INTERPRETERS: &[(&str, Interpreter)] = &[
    (SubjectAltName::OID, Interpreter::SubjectAltName),
    (KeyUsage::OID, Interpreter::KeyUsage),
    (ExtendedKeyUsage::OID, Interpreter::ExtendedKeyUsage),
    (BasicConstraints::OID, Interpreter::BasicConstraints),
    ("2.5.29.14", Interpreter::Labeled("Subject Key Identifier")),
    ("2.5.29.35", Interpreter::Labeled("Authority Key Identifier")),
    ("2.5.29.31", Interpreter::Labeled("CRL Distribution Points")),
    ("1.3.6.1.5.5.7.1.1", Interpreter::Labeled("Authority Information Access")),
    ("2.5.29.32", Interpreter::Labeled("Certificate Policies")),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum InterpretedValue {
    SubjectAltName(SubjectAltName),
    KeyUsage(KeyUsage),
    ExtendedKeyUsage(ExtendedKeyUsage),
    BasicConstraints(BasicConstraints),
    Labeled { label: &'static str, value: String },
}

impl fmt::Display for InterpretedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpretedValue::SubjectAltName(san) => write!(f, "{}", san),
            InterpretedValue::KeyUsage(ku) => write!(f, "{}", ku),
            InterpretedValue::ExtendedKeyUsage(eku) => write!(f, "{}", eku),
            InterpretedValue::BasicConstraints(bc) => write!(f, "{}", bc),
            InterpretedValue::Labeled { value, .. } => write!(f, "{}", value),
        }
    }
}

/// Interprets an extension value by OID.
///
/// Returns None when the OID has no interpreter or the value does not decode.
pub fn interpret(oid: &ObjectIdentifier, raw: &OctetString) -> Option<InterpretedValue> {
    let key = oid.to_string();
    let (_, interpreter) = INTERPRETERS.iter().find(|(known, _)| *known == key)?;
    let interpreted = match interpreter {
        Interpreter::SubjectAltName => {
            SubjectAltName::parse(raw).map(InterpretedValue::SubjectAltName)
        }
        Interpreter::KeyUsage => KeyUsage::parse(raw).map(InterpretedValue::KeyUsage),
        Interpreter::ExtendedKeyUsage => {
            ExtendedKeyUsage::parse(raw).map(InterpretedValue::ExtendedKeyUsage)
        }
        Interpreter::BasicConstraints => {
            BasicConstraints::parse(raw).map(InterpretedValue::BasicConstraints)
        }
        Interpreter::Labeled(label) => raw
            .decode()
            .map(|element: Element| InterpretedValue::Labeled {
                label,
                value: element.to_string(),
            })
            .map_err(Error::from),
    };
    match interpreted {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(oid = %key, error = %e, "extension value could not be interpreted");
            None
        }
    }
}

/*
RFC 5280 Section 4.1.2.9

Extension  ::=  SEQUENCE  {
    extnID      OBJECT IDENTIFIER,
    critical    BOOLEAN DEFAULT FALSE,
    extnValue   OCTET STRING
                -- contains the DER encoding of an ASN.1 value
                -- corresponding to the extension type identified
                -- by extnID
}
*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawExtension {
    oid: ObjectIdentifier,
    critical: bool,
    value: OctetString,
}

impl RawExtension {
    pub fn new(oid: ObjectIdentifier, critical: bool, value: OctetString) -> Self {
        RawExtension {
            oid,
            critical,
            value,
        }
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }

    pub fn critical(&self) -> bool {
        self.critical
    }

    pub fn value(&self) -> &OctetString {
        &self.value
    }

    pub fn label(&self) -> Option<&'static str> {
        extension_label(&self.oid.to_string())
    }

    pub fn interpret(&self) -> Option<InterpretedValue> {
        interpret(&self.oid, &self.value)
    }

    /// Parses the value as `T`, checking the OID first.
    pub fn parse<T: Extension>(&self) -> Result<T, Error> {
        if self.oid != T::OID {
            return Err(Error::OidMismatch {
                expected: T::OID.to_string(),
                actual: self.oid.to_string(),
            });
        }
        T::parse(&self.value)
    }

    /// Best-effort rendering of the value: the decoded ASN.1 value when it
    /// parses, the hex octets otherwise.
    pub fn render_raw(&self) -> String {
        let decoded: Result<Element, _> = self.value.decode();
        match decoded {
            Ok(element) => element.to_string(),
            Err(_) => to_hex(self.value.as_bytes(), ":"),
        }
    }
}

impl DecodableFrom<Element> for RawExtension {}

impl Decoder<Element, RawExtension> for Element {
    type Error = Error;

    fn decode(&self) -> Result<RawExtension, Self::Error> {
        let (oid, critical, value) = match self.as_sequence() {
            Some([Element::ObjectIdentifier(oid), Element::OctetString(value)]) => {
                (oid, false, value)
            }
            Some(
                [
                    Element::ObjectIdentifier(oid),
                    Element::Boolean(critical),
                    Element::OctetString(value),
                ],
            ) => (oid, *critical, value),
            _ => {
                return Err(Error::InvalidExtension(
                    "expected Sequence of OBJECT IDENTIFIER, optional BOOLEAN and OCTET STRING"
                        .to_string(),
                ));
            }
        };
        Ok(RawExtension::new(oid.clone(), critical, value.clone()))
    }
}
