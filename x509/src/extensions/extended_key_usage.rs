use std::fmt;

use pfxview::decoder::Decoder;
use pfxview_asn1::{Element, OctetString};
use serde::Serialize;

use super::Extension;
use crate::error::Error;

/*
RFC 5280 Section 4.2.1.12
ExtendedKeyUsage ::= SEQUENCE SIZE (1..MAX) OF KeyPurposeId
KeyPurposeId ::= OBJECT IDENTIFIER
*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum KeyPurpose {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
    /// Unmapped purpose, as its dotted OID.
    Other(String),
}

impl KeyPurpose {
    pub const SERVER_AUTH: &'static str = "1.3.6.1.5.5.7.3.1";
    pub const CLIENT_AUTH: &'static str = "1.3.6.1.5.5.7.3.2";
    pub const CODE_SIGNING: &'static str = "1.3.6.1.5.5.7.3.3";
    pub const EMAIL_PROTECTION: &'static str = "1.3.6.1.5.5.7.3.4";
    pub const TIME_STAMPING: &'static str = "1.3.6.1.5.5.7.3.8";
    pub const OCSP_SIGNING: &'static str = "1.3.6.1.5.5.7.3.9";
}

impl From<&str> for KeyPurpose {
    fn from(oid: &str) -> Self {
        match oid {
            KeyPurpose::SERVER_AUTH => KeyPurpose::ServerAuth,
            KeyPurpose::CLIENT_AUTH => KeyPurpose::ClientAuth,
            KeyPurpose::CODE_SIGNING => KeyPurpose::CodeSigning,
            KeyPurpose::EMAIL_PROTECTION => KeyPurpose::EmailProtection,
            KeyPurpose::TIME_STAMPING => KeyPurpose::TimeStamping,
            KeyPurpose::OCSP_SIGNING => KeyPurpose::OcspSigning,
            other => KeyPurpose::Other(other.to_string()),
        }
    }
}

impl fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPurpose::ServerAuth => write!(f, "serverAuth"),
            KeyPurpose::ClientAuth => write!(f, "clientAuth"),
            KeyPurpose::CodeSigning => write!(f, "codeSigning"),
            KeyPurpose::EmailProtection => write!(f, "emailProtection"),
            KeyPurpose::TimeStamping => write!(f, "timeStamping"),
            KeyPurpose::OcspSigning => write!(f, "OCSPSigning"),
            KeyPurpose::Other(oid) => write!(f, "{}", oid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtendedKeyUsage {
    pub purposes: Vec<KeyPurpose>,
}

impl Extension for ExtendedKeyUsage {
    const OID: &'static str = "2.5.29.37";

    fn parse(value: &OctetString) -> Result<Self, Error> {
        let element: Element = value.decode()?;
        let elements = element
            .as_sequence()
            .ok_or_else(|| Error::InvalidExtendedKeyUsage("expected Sequence".to_string()))?;
        if elements.is_empty() {
            return Err(Error::InvalidExtendedKeyUsage(
                "empty sequence - at least one KeyPurposeId required".to_string(),
            ));
        }
        let purposes = elements
            .iter()
            .map(|elem| match elem {
                Element::ObjectIdentifier(oid) => Ok(KeyPurpose::from(oid.to_string().as_str())),
                other => Err(Error::InvalidExtendedKeyUsage(format!(
                    "expected ObjectIdentifier, got {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExtendedKeyUsage { purposes })
    }
}

impl fmt::Display for ExtendedKeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let purposes = self
            .purposes
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", purposes)
    }
}
