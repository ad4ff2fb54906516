//! Error types for typed ASN.1 decoding.

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid boolean")]
    InvalidBoolean,

    #[error("INTEGER: no data")]
    IntegerNoData,

    #[error("OBJECT IDENTIFIER: no data")]
    ObjectIdentifierNoData,
    #[error("OBJECT IDENTIFIER: incomplete encoding")]
    ObjectIdentifierIncompleteEncoding,
    #[error("OBJECT IDENTIFIER: arc does not fit in 64 bits")]
    ObjectIdentifierArcOverflow,
    #[error("OBJECT IDENTIFIER: invalid component: {0}")]
    ObjectIdentifierInvalidComponent(ParseIntError),

    #[error("BIT STRING: no data")]
    BitStringNoData,
    #[error("BIT STRING: unused bits {0} out of range (must be 0-7)")]
    BitStringUnusedBitsOutOfRange(u8),

    #[error("constructed OCTET STRING: unexpected segment {0}")]
    OctetStringInvalidSegment(String),

    #[error("UTF8String: invalid UTF-8")]
    Utf8StringInvalidUtf8,
    #[error("{0}: invalid character")]
    InvalidCharacterString(&'static str),
    #[error("BMPString: odd byte length {0}")]
    BmpStringOddLength(usize),
    #[error("BMPString: unpaired surrogate")]
    BmpStringInvalidCodePoint,
    #[error("UniversalString: invalid length {0}")]
    UniversalStringInvalidLength(usize),
    #[error("UniversalString: invalid code point 0x{0:08X}")]
    UniversalStringInvalidCodePoint(u32),

    #[error("UTCTime: invalid format")]
    UtcTimeInvalidFormat,
    #[error("GeneralizedTime: invalid format")]
    GeneralizedTimeInvalidFormat,

    #[error("invalid DER encoding: {0}")]
    FailedToDecodeDer(#[from] pfxview_der::error::Error),
}
