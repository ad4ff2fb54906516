use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_asn1::{Element, ObjectIdentifier, to_hex};
use serde::Serialize;

use crate::error::Error;
use crate::name::Name;

/*
RFC 5280 Section 4.2.1.6
GeneralName ::= CHOICE {
    otherName                 [0] OtherName,
    rfc822Name                [1] IA5String,
    dNSName                   [2] IA5String,
    x400Address               [3] ORAddress,
    directoryName             [4] Name,
    ediPartyName              [5] EDIPartyName,
    uniformResourceIdentifier [6] IA5String,
    iPAddress                 [7] OCTET STRING,
    registeredID              [8] OBJECT IDENTIFIER
}
*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GeneralName {
    /// rfc822Name [1]
    Rfc822Name(String),
    /// dNSName [2]
    DnsName(String),
    /// directoryName [4]
    DirectoryName(Name),
    /// uniformResourceIdentifier [6]
    Uri(String),
    /// iPAddress [7] holding a 4 or 16 octet address
    IpAddress(IpAddr),
    /// registeredID [8]
    RegisteredId(ObjectIdentifier),
    /// Any other form, or an iPAddress of unexpected length, with its raw rendering.
    Other { slot: u32, raw: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralNameKind {
    Dns,
    Ip,
    Other,
}

impl GeneralName {
    pub fn kind(&self) -> GeneralNameKind {
        match self {
            GeneralName::DnsName(_) => GeneralNameKind::Dns,
            GeneralName::IpAddress(_) => GeneralNameKind::Ip,
            _ => GeneralNameKind::Other,
        }
    }
}

fn ia5(slot: u32, data: &[u8]) -> Result<String, Error> {
    if !data.is_ascii() {
        return Err(Error::InvalidGeneralName(format!(
            "[{}] is not an IA5String",
            slot
        )));
    }
    String::from_utf8(data.to_vec())
        .map_err(|_| Error::InvalidGeneralName(format!("[{}] is not an IA5String", slot)))
}

fn ip_address(data: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(data) {
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(data) {
        return Some(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    None
}

impl DecodableFrom<Element> for GeneralName {}

impl Decoder<Element, GeneralName> for Element {
    type Error = Error;

    fn decode(&self) -> Result<GeneralName, Self::Error> {
        let Element::ContextSpecific {
            slot,
            constructed,
            element,
        } = self
        else {
            return Err(Error::InvalidGeneralName(
                "expected context-specific tag".to_string(),
            ));
        };

        // implicit primitive forms arrive as the raw content octets.
        let primitive = match (constructed, element.as_ref()) {
            (false, Element::OctetString(octets)) => Some(octets.as_bytes()),
            _ => None,
        };

        match (slot, primitive) {
            (1, Some(data)) => ia5(1, data).map(GeneralName::Rfc822Name),
            (2, Some(data)) => ia5(2, data).map(GeneralName::DnsName),
            (6, Some(data)) => ia5(6, data).map(GeneralName::Uri),
            (7, Some(data)) => Ok(match ip_address(data) {
                Some(addr) => GeneralName::IpAddress(addr),
                None => GeneralName::Other {
                    slot: 7,
                    raw: to_hex(data, ":"),
                },
            }),
            (8, Some(data)) => Ok(GeneralName::RegisteredId(ObjectIdentifier::try_from(
                data,
            )?)),
            // Name is a CHOICE, so [4] is always explicit.
            (4, None) => element.as_ref().decode().map(GeneralName::DirectoryName),
            (slot, _) => Ok(GeneralName::Other {
                slot: *slot,
                raw: element.to_string(),
            }),
        }
    }
}

impl fmt::Display for GeneralName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneralName::Rfc822Name(email) => write!(f, "email:{}", email),
            GeneralName::DnsName(dns) => write!(f, "DNS:{}", dns),
            GeneralName::DirectoryName(name) => write!(f, "DirName:{}", name),
            GeneralName::Uri(uri) => write!(f, "URI:{}", uri),
            GeneralName::IpAddress(addr) => write!(f, "IP Address:{}", addr),
            GeneralName::RegisteredId(oid) => write!(f, "Registered ID:{}", oid),
            GeneralName::Other { slot, raw } => write!(f, "othername[{}]:{}", slot, raw),
        }
    }
}
