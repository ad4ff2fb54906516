use std::fmt;

use pfxview::decoder::Decoder;
use pfxview_asn1::{Element, OctetString};
use serde::Serialize;

use super::Extension;
use crate::error::Error;

/*
RFC 5280 Section 4.2.1.9
BasicConstraints ::= SEQUENCE {
    cA                      BOOLEAN DEFAULT FALSE,
    pathLenConstraint       INTEGER (0..MAX) OPTIONAL
}
*/

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BasicConstraints {
    pub ca: bool,
    pub path_len_constraint: Option<u32>,
}

impl Extension for BasicConstraints {
    const OID: &'static str = "2.5.29.19";

    fn parse(value: &OctetString) -> Result<Self, Error> {
        let element: Element = value.decode()?;
        let elements = element
            .as_sequence()
            .ok_or_else(|| Error::InvalidBasicConstraints("expected Sequence".to_string()))?;
        let (ca, path_len_constraint) = match elements {
            [] => (false, None),
            [Element::Boolean(ca)] => (*ca, None),
            [Element::Integer(n)] => (false, Some(n)),
            [Element::Boolean(ca), Element::Integer(n)] => (*ca, Some(n)),
            _ => {
                return Err(Error::InvalidBasicConstraints(
                    "unexpected element".to_string(),
                ));
            }
        };
        let path_len_constraint = path_len_constraint
            .map(|n| {
                n.to_u32().ok_or_else(|| {
                    Error::InvalidBasicConstraints(format!("pathLenConstraint {} out of range", n))
                })
            })
            .transpose()?;
        Ok(BasicConstraints {
            ca,
            path_len_constraint,
        })
    }
}

impl fmt::Display for BasicConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CA:{}", if self.ca { "TRUE" } else { "FALSE" })?;
        if let Some(path_len) = self.path_len_constraint {
            write!(f, ", pathlen:{}", path_len)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(input, expected,
        case(vec![0x30, 0x00], BasicConstraints { ca: false, path_len_constraint: None }),
        case(vec![0x30, 0x03, 0x01, 0x01, 0xff], BasicConstraints { ca: true, path_len_constraint: None }),
        case(vec![0x30, 0x06, 0x01, 0x01, 0xff, 0x02, 0x01, 0x00], BasicConstraints { ca: true, path_len_constraint: Some(0) }),
        case(vec![0x30, 0x03, 0x02, 0x01, 0x03], BasicConstraints { ca: false, path_len_constraint: Some(3) }),
    )]
    fn test_basic_constraints_parse(input: Vec<u8>, expected: BasicConstraints) {
        assert_eq!(expected, BasicConstraints::parse(&OctetString::from(input)).unwrap());
    }

    #[rstest]
    #[case::negative_path_len(vec![0x30, 0x06, 0x01, 0x01, 0xff, 0x02, 0x01, 0xff])]
    #[case::wrong_order(vec![0x30, 0x06, 0x02, 0x01, 0x00, 0x01, 0x01, 0xff])]
    #[case::not_sequence(vec![0x01, 0x01, 0xff])]
    fn test_basic_constraints_invalid(#[case] input: Vec<u8>) {
        assert!(BasicConstraints::parse(&OctetString::from(input)).is_err());
    }

    #[rstest(input, expected,
        case(BasicConstraints { ca: true, path_len_constraint: Some(0) }, "CA:TRUE, pathlen:0"),
        case(BasicConstraints::default(), "CA:FALSE"),
    )]
    fn test_basic_constraints_display(input: BasicConstraints, expected: &str) {
        assert_eq!(expected, input.to_string());
    }
}
