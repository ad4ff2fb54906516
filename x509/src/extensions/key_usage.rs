use std::fmt;

use pfxview::decoder::Decoder;
use pfxview_asn1::{Element, OctetString};
use serde::Serialize;

use super::Extension;
use crate::error::Error;

/*
RFC 5280 Section 4.2.1.3
KeyUsage ::= BIT STRING {
    digitalSignature        (0),
    nonRepudiation          (1), -- renamed to contentCommitment
    keyEncipherment         (2),
    dataEncipherment        (3),
    keyAgreement            (4),
    keyCertSign             (5),
    cRLSign                 (6),
    encipherOnly            (7),
    decipherOnly            (8)
}
*/

const KEY_USAGE_NAMES: [&str; 9] = [
    "digitalSignature",
    "nonRepudiation",
    "keyEncipherment",
    "dataEncipherment",
    "keyAgreement",
    "keyCertSign",
    "cRLSign",
    "encipherOnly",
    "decipherOnly",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyUsage {
    pub digital_signature: bool,
    pub non_repudiation: bool,
    pub key_encipherment: bool,
    pub data_encipherment: bool,
    pub key_agreement: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
    pub encipher_only: bool,
    pub decipher_only: bool,
}

impl KeyUsage {
    fn bits(&self) -> [bool; 9] {
        [
            self.digital_signature,
            self.non_repudiation,
            self.key_encipherment,
            self.data_encipherment,
            self.key_agreement,
            self.key_cert_sign,
            self.crl_sign,
            self.encipher_only,
            self.decipher_only,
        ]
    }

    /// Names of the asserted capabilities, in bit order.
    pub fn names(&self) -> Vec<&'static str> {
        self.bits()
            .iter()
            .zip(KEY_USAGE_NAMES)
            .filter(|(set, _)| **set)
            .map(|(_, name)| name)
            .collect()
    }
}

impl Extension for KeyUsage {
    const OID: &'static str = "2.5.29.15";

    fn parse(value: &OctetString) -> Result<Self, Error> {
        let element: Element = value.decode()?;
        let Element::BitString(bs) = element else {
            return Err(Error::InvalidKeyUsage("expected BitString".to_string()));
        };
        Ok(KeyUsage {
            digital_signature: bs.bit(0),
            non_repudiation: bs.bit(1),
            key_encipherment: bs.bit(2),
            data_encipherment: bs.bit(3),
            key_agreement: bs.bit(4),
            key_cert_sign: bs.bit(5),
            crl_sign: bs.bit(6),
            encipher_only: bs.bit(7),
            decipher_only: bs.bit(8),
        })
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(", "))
    }
}
