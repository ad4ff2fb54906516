use std::fmt;

use pfxview_asn1::Element;
use pfxview_der::Tlv;
use serde::Serialize;

use crate::error::{Error, Result};

const PEM_PREFIX: &str = "-----BEGIN ";

/// Encoding of the bytes handed to [`crate::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// RFC 7468 text with one or more blocks.
    Pem,
    /// A single DER certificate.
    DerCertificate,
    /// A DER PFX.
    Pkcs12,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Pem => write!(f, "PEM"),
            InputFormat::DerCertificate => write!(f, "DER certificate"),
            InputFormat::Pkcs12 => write!(f, "PKCS#12"),
        }
    }
}

/// Input after format detection. DER inputs keep their decoded tree.
#[derive(Debug)]
pub(crate) enum Detected<'a> {
    Pem(&'a str),
    Der(InputFormat, Tlv),
}

impl Detected<'_> {
    pub(crate) fn format(&self) -> InputFormat {
        match self {
            Detected::Pem(_) => InputFormat::Pem,
            Detected::Der(format, _) => *format,
        }
    }
}

/*
A PFX and a certificate are both a SEQUENCE; they differ in the first field.

PFX ::= SEQUENCE { version INTEGER, ... }
Certificate ::= SEQUENCE { tbsCertificate TBSCertificate (a SEQUENCE), ... }
*/
pub(crate) fn detect(bytes: &[u8]) -> Result<Detected<'_>> {
    if bytes.is_empty() {
        return Err(Error::EmptyInput);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        if text.contains(PEM_PREFIX) {
            return Ok(Detected::Pem(text));
        }
    }

    let root = pfxview_der::decode(bytes)?;
    let element = Element::try_from(&root)?;
    let format = match element.as_sequence() {
        Some([Element::Integer(_), ..]) => InputFormat::Pkcs12,
        Some([Element::Sequence(_), ..]) => InputFormat::DerCertificate,
        _ => {
            return Err(Error::UnrecognizedInput(
                "expected a PFX or a certificate".to_string(),
            ));
        }
    };
    Ok(Detected::Der(format, root))
}
