//! Name and related types
//!
//! Defined in RFC 5280 Section 4.1.2.4
//!
//! ```asn1
//! Name ::= CHOICE { -- only one possibility for now --
//!     rdnSequence  RDNSequence
//! }
//!
//! RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
//!
//! RelativeDistinguishedName ::= SET OF AttributeTypeAndValue
//!
//! AttributeTypeAndValue ::= SEQUENCE {
//!     type     AttributeType,
//!     value    AttributeValue
//! }
//! ```

use std::fmt;

use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_asn1::{Element, ObjectIdentifier};
use serde::Serialize;

use crate::error::Error;

/// Short names for the attribute types seen in certificate subjects.
const ATTRIBUTE_SHORT_NAMES: &[(&str, &str)] = &[
    ("2.5.4.3", "CN"),
    ("2.5.4.4", "SN"),
    ("2.5.4.5", "SERIALNUMBER"),
    ("2.5.4.6", "C"),
    ("2.5.4.7", "L"),
    ("2.5.4.8", "ST"),
    ("2.5.4.9", "STREET"),
    ("2.5.4.10", "O"),
    ("2.5.4.11", "OU"),
    ("2.5.4.12", "T"),
    ("2.5.4.42", "GN"),
    ("1.2.840.113549.1.9.1", "E"),
    ("0.9.2342.19200300.100.1.1", "UID"),
    ("0.9.2342.19200300.100.1.25", "DC"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeTypeAndValue {
    pub attribute_type: ObjectIdentifier,
    pub value: String,
}

impl AttributeTypeAndValue {
    /// Conventional short name, or the dotted OID when there is none.
    pub fn short_name(&self) -> String {
        let oid = self.attribute_type.to_string();
        ATTRIBUTE_SHORT_NAMES
            .iter()
            .find(|(known, _)| *known == oid)
            .map(|(_, short)| short.to_string())
            .unwrap_or(oid)
    }
}

impl fmt::Display for AttributeTypeAndValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.short_name(), self.value)
    }
}

impl DecodableFrom<Element> for AttributeTypeAndValue {}

impl Decoder<Element, AttributeTypeAndValue> for Element {
    type Error = Error;

    fn decode(&self) -> Result<AttributeTypeAndValue, Self::Error> {
        match self.as_sequence() {
            Some([Element::ObjectIdentifier(oid), value]) => Ok(AttributeTypeAndValue {
                attribute_type: oid.clone(),
                // non-string values are kept in their raw rendering.
                value: value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string()),
            }),
            Some(_) => Err(Error::InvalidAttributeTypeAndValue(
                "expected OBJECT IDENTIFIER and value".to_string(),
            )),
            None => Err(Error::InvalidAttributeTypeAndValue(
                "expected Sequence".to_string(),
            )),
        }
    }
}

/// One RDN. Multi-valued RDNs keep every attribute in encoded order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelativeDistinguishedName {
    pub attributes: Vec<AttributeTypeAndValue>,
}

impl DecodableFrom<Element> for RelativeDistinguishedName {}

impl Decoder<Element, RelativeDistinguishedName> for Element {
    type Error = Error;

    fn decode(&self) -> Result<RelativeDistinguishedName, Self::Error> {
        let elements = self.as_set().ok_or_else(|| {
            Error::InvalidRelativeDistinguishedName("expected Set".to_string())
        })?;
        if elements.is_empty() {
            return Err(Error::InvalidRelativeDistinguishedName(
                "empty set".to_string(),
            ));
        }
        let attributes = elements
            .iter()
            .map(|elem| elem.decode())
            .collect::<Result<Vec<AttributeTypeAndValue>, _>>()?;
        Ok(RelativeDistinguishedName { attributes })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Name {
    rdn_sequence: Vec<RelativeDistinguishedName>,
}

impl Name {
    pub fn new(rdn_sequence: Vec<RelativeDistinguishedName>) -> Self {
        Name { rdn_sequence }
    }

    pub fn rdn_sequence(&self) -> &[RelativeDistinguishedName] {
        &self.rdn_sequence
    }

    pub fn is_empty(&self) -> bool {
        self.rdn_sequence.is_empty()
    }

    /// Collapses the name into `(short name, value)` pairs.
    ///
    /// A repeated short name keeps the position of its first occurrence and
    /// the value of its last one, so `OU=a, OU=b` flattens to `OU=b`.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut flat: Vec<(String, String)> = Vec::new();
        for attr in self.rdn_sequence.iter().flat_map(|rdn| &rdn.attributes) {
            let key = attr.short_name();
            match flat.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = attr.value.clone(),
                None => flat.push((key, attr.value.clone())),
            }
        }
        flat
    }

    /// The last commonName in the name.
    pub fn common_name(&self) -> Option<&str> {
        self.rdn_sequence
            .iter()
            .flat_map(|rdn| &rdn.attributes)
            .filter(|attr| attr.attribute_type == "2.5.4.3")
            .map(|attr| attr.value.as_str())
            .last()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .rdn_sequence
            .iter()
            .map(|rdn| {
                rdn.attributes
                    .iter()
                    .map(|attr| attr.to_string())
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", formatted)
    }
}

impl DecodableFrom<Element> for Name {}

impl Decoder<Element, Name> for Element {
    type Error = Error;

    fn decode(&self) -> Result<Name, Self::Error> {
        match self {
            Element::Sequence(elements) => {
                let rdn_sequence = elements
                    .iter()
                    .map(|elem| elem.decode())
                    .collect::<Result<Vec<RelativeDistinguishedName>, _>>()?;
                Ok(Name { rdn_sequence })
            }
            _ => Err(Error::InvalidName("expected Sequence for Name".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    fn atv(oid: &str, value: &str) -> AttributeTypeAndValue {
        AttributeTypeAndValue {
            attribute_type: ObjectIdentifier::from_str(oid).unwrap(),
            value: value.to_string(),
        }
    }

    fn rdn(attributes: Vec<AttributeTypeAndValue>) -> RelativeDistinguishedName {
        RelativeDistinguishedName { attributes }
    }

    fn element_atv(oid: &str, value: Element) -> Element {
        Element::Sequence(vec![
            Element::ObjectIdentifier(ObjectIdentifier::from_str(oid).unwrap()),
            value,
        ])
    }

    #[rstest(input, expected,
        case(atv("2.5.4.3", "x"), "CN"),
        case(atv("1.2.840.113549.1.9.1", "x"), "E"),
        case(atv("0.9.2342.19200300.100.1.25", "x"), "DC"),
        case(atv("1.3.6.1.4.1.55555.9", "x"), "1.3.6.1.4.1.55555.9"),
    )]
    fn test_short_name(input: AttributeTypeAndValue, expected: &str) {
        assert_eq!(expected, input.short_name());
    }

    #[test]
    fn test_decode_name_keeps_multi_valued_rdn() {
        let element = Element::Sequence(vec![
            Element::Set(vec![element_atv(
                "2.5.4.6",
                Element::PrintableString("JP".to_string()),
            )]),
            Element::Set(vec![
                element_atv("2.5.4.3", Element::UTF8String("host".to_string())),
                element_atv("1.2.840.113549.1.9.1", Element::IA5String("a@b".to_string())),
            ]),
        ]);
        let name: Name = element.decode().unwrap();
        assert_eq!(2, name.rdn_sequence().len());
        assert_eq!(2, name.rdn_sequence()[1].attributes.len());
        assert_eq!("C=JP, CN=host+E=a@b", name.to_string());
        assert_eq!(Some("host"), name.common_name());
    }

    #[test]
    fn test_flatten_last_wins_in_place() {
        let name = Name::new(vec![
            rdn(vec![atv("2.5.4.11", "first")]),
            rdn(vec![atv("2.5.4.3", "cn")]),
            rdn(vec![atv("2.5.4.11", "second")]),
        ]);
        assert_eq!(
            vec![
                ("OU".to_string(), "second".to_string()),
                ("CN".to_string(), "cn".to_string()),
            ],
            name.flatten()
        );
        // the model itself is not collapsed.
        assert_eq!(3, name.rdn_sequence().len());
    }

    #[test]
    fn test_attribute_value_non_string_is_rendered_raw() {
        let element = element_atv("2.5.4.45", Element::OctetString(vec![0xab, 0xcd].into()));
        let attr: AttributeTypeAndValue = element.decode().unwrap();
        assert_eq!("AB:CD", attr.value);
    }

    #[rstest]
    #[case::not_sequence(Element::Null)]
    #[case::rdn_not_set(Element::Sequence(vec![Element::Null]))]
    #[case::empty_rdn(Element::Sequence(vec![Element::Set(vec![])]))]
    fn test_decode_name_invalid(#[case] input: Element) {
        let result: Result<Name, Error> = input.decode();
        assert!(result.is_err());
    }
}
