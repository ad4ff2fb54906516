use chrono::{DateTime, Utc};
use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_asn1::Element;
use serde::Serialize;

use crate::error::Error;

/*
Validity ::= SEQUENCE {
    notBefore      Time,
    notAfter       Time
}

Time ::= CHOICE {
    utcTime        UTCTime,
    generalTime    GeneralizedTime
}
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl DecodableFrom<Element> for Validity {}

impl Decoder<Element, Validity> for Element {
    type Error = Error;

    fn decode(&self) -> Result<Validity, Self::Error> {
        match self.as_sequence() {
            Some([not_before, not_after]) => {
                let not_before = not_before
                    .as_time()
                    .ok_or_else(|| Error::InvalidValidity("notBefore is not a Time".to_string()))?;
                let not_after = not_after
                    .as_time()
                    .ok_or_else(|| Error::InvalidValidity("notAfter is not a Time".to_string()))?;
                Ok(Validity {
                    not_before,
                    not_after,
                })
            }
            _ => Err(Error::InvalidValidity(
                "expected Sequence of two Time values".to_string(),
            )),
        }
    }
}
