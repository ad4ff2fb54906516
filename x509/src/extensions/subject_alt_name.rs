use std::fmt;

use pfxview::decoder::Decoder;
use pfxview_asn1::{Element, OctetString};
use serde::Serialize;

use super::Extension;
use super::general_name::GeneralName;
use crate::error::Error;

/*
RFC 5280 Section 4.2.1.6
SubjectAltName ::= GeneralNames

GeneralNames ::= SEQUENCE SIZE (1..MAX) OF GeneralName
*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectAltName {
    pub names: Vec<GeneralName>,
}

impl Extension for SubjectAltName {
    const OID: &'static str = "2.5.29.17";

    fn parse(value: &OctetString) -> Result<Self, Error> {
        let element: Element = value.decode()?;
        let elements = element
            .as_sequence()
            .ok_or_else(|| Error::InvalidSubjectAltName("expected Sequence".to_string()))?;
        if elements.is_empty() {
            return Err(Error::InvalidSubjectAltName("empty sequence".to_string()));
        }
        let names = elements
            .iter()
            .map(|elem| elem.decode())
            .collect::<Result<Vec<GeneralName>, _>>()?;
        Ok(SubjectAltName { names })
    }
}

impl fmt::Display for SubjectAltName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .names
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", names)
    }
}
