//! Typed ASN.1 values decoded from a [`Tlv`] tree.
//!
//! [`Element`] is the schema-free view every higher layer matches on.
//! Universal types are decoded into Rust values; context-specific values keep
//! their slot so the caller can apply its own schema; anything else is kept
//! as [`Element::Unimplemented`] with the original node.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview_der::{Tag, Tlv, UniversalTag};
use serde::{Serialize, Serializer};

use error::Error;

pub mod error;
mod time;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Boolean(bool),
    Integer(Integer),
    BitString(BitString),
    OctetString(OctetString),
    Null,
    ObjectIdentifier(ObjectIdentifier),
    Enumerated(Integer),
    UTF8String(String),
    NumericString(String),
    PrintableString(String),
    TeletexString(String),
    IA5String(String),
    VisibleString(String),
    UniversalString(String),
    BMPString(String),
    UTCTime(DateTime<Utc>),
    GeneralizedTime(DateTime<Utc>),
    Sequence(Vec<Element>),
    Set(Vec<Element>),
    /// A constructed context-specific value wraps its single child; when the
    /// value holds zero or several children they are wrapped in a
    /// `Sequence`. A primitive one carries its raw content as an
    /// `OctetString`, to be reinterpreted by the caller's schema.
    ContextSpecific {
        slot: u32,
        constructed: bool,
        element: Box<Element>,
    },
    Unimplemented(Tlv),
}

impl Element {
    pub fn as_sequence(&self) -> Option<&[Element]> {
        match self {
            Element::Sequence(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[Element]> {
        match self {
            Element::Set(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            Element::Integer(integer) => Some(integer),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&ObjectIdentifier> {
        match self {
            Element::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_octet_string(&self) -> Option<&OctetString> {
        match self {
            Element::OctetString(octets) => Some(octets),
            _ => None,
        }
    }

    /// Returns the text of any character string type.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Element::UTF8String(s)
            | Element::NumericString(s)
            | Element::PrintableString(s)
            | Element::TeletexString(s)
            | Element::IA5String(s)
            | Element::VisibleString(s)
            | Element::UniversalString(s)
            | Element::BMPString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Element::UTCTime(t) | Element::GeneralizedTime(t) => Some(*t),
            _ => None,
        }
    }
}

impl DecodableFrom<Tlv> for Element {}

impl Decoder<Tlv, Element> for Tlv {
    type Error = Error;

    fn decode(&self) -> Result<Element, Self::Error> {
        Element::try_from(self)
    }
}

impl TryFrom<&Tlv> for Element {
    type Error = Error;

    fn try_from(tlv: &Tlv) -> Result<Self, Self::Error> {
        match tlv.tag() {
            Tag::Universal {
                tag,
                constructed: true,
            } => match tag {
                UniversalTag::Sequence => Ok(Element::Sequence(children(tlv)?)),
                UniversalTag::Set => Ok(Element::Set(children(tlv)?)),
                UniversalTag::OctetString => {
                    // BER constructed form: the value is the concatenation of its segments.
                    let mut data = Vec::new();
                    collect_segments(tlv, &mut data)?;
                    Ok(Element::OctetString(OctetString::from(data)))
                }
                _ => Ok(Element::Unimplemented(tlv.clone())),
            },
            Tag::Universal {
                tag,
                constructed: false,
            } => decode_primitive(*tag, tlv),
            Tag::ContextSpecific {
                slot,
                constructed: true,
            } => {
                let mut elements = children(tlv)?;
                let element = if elements.len() == 1 {
                    elements.remove(0)
                } else {
                    Element::Sequence(elements)
                };
                Ok(Element::ContextSpecific {
                    slot: *slot,
                    constructed: true,
                    element: Box::new(element),
                })
            }
            Tag::ContextSpecific {
                slot,
                constructed: false,
            } => Ok(Element::ContextSpecific {
                slot: *slot,
                constructed: false,
                element: Box::new(Element::OctetString(OctetString::from(
                    tlv.data().unwrap_or_default(),
                ))),
            }),
            Tag::Application { .. } | Tag::Private { .. } => Ok(Element::Unimplemented(tlv.clone())),
        }
    }
}

fn children(tlv: &Tlv) -> Result<Vec<Element>, Error> {
    tlv.tlvs()
        .unwrap_or_default()
        .iter()
        .map(Element::try_from)
        .collect()
}

fn collect_segments(tlv: &Tlv, out: &mut Vec<u8>) -> Result<(), Error> {
    if let Some(data) = tlv.data() {
        out.extend_from_slice(data);
        return Ok(());
    }
    for segment in tlv.tlvs().unwrap_or_default() {
        match segment.tag().universal() {
            Some(UniversalTag::OctetString) => collect_segments(segment, out)?,
            _ => return Err(Error::OctetStringInvalidSegment(segment.tag().to_string())),
        }
    }
    Ok(())
}

fn decode_primitive(tag: UniversalTag, tlv: &Tlv) -> Result<Element, Error> {
    let data = tlv.data().unwrap_or_default();
    match tag {
        UniversalTag::Boolean => match data {
            [0x00] => Ok(Element::Boolean(false)),
            [_] => Ok(Element::Boolean(true)),
            _ => Err(Error::InvalidBoolean),
        },
        UniversalTag::Integer => Integer::try_from(data).map(Element::Integer),
        UniversalTag::Enumerated => Integer::try_from(data).map(Element::Enumerated),
        UniversalTag::BitString => BitString::try_from(data).map(Element::BitString),
        UniversalTag::OctetString => Ok(Element::OctetString(OctetString::from(data))),
        UniversalTag::Null => Ok(Element::Null),
        UniversalTag::ObjectIdentifier => {
            ObjectIdentifier::try_from(data).map(Element::ObjectIdentifier)
        }
        UniversalTag::UTF8String => String::from_utf8(data.to_vec())
            .map(Element::UTF8String)
            .map_err(|_| Error::Utf8StringInvalidUtf8),
        UniversalTag::NumericString => {
            ascii_string(data, "NumericString").map(Element::NumericString)
        }
        UniversalTag::PrintableString => {
            ascii_string(data, "PrintableString").map(Element::PrintableString)
        }
        UniversalTag::IA5String => ascii_string(data, "IA5String").map(Element::IA5String),
        UniversalTag::VisibleString => {
            ascii_string(data, "VisibleString").map(Element::VisibleString)
        }
        UniversalTag::TeletexString => Ok(Element::TeletexString(teletex_string(data))),
        UniversalTag::BMPString => decode_bmp_string(data).map(Element::BMPString),
        UniversalTag::UniversalString => {
            decode_universal_string(data).map(Element::UniversalString)
        }
        UniversalTag::UTCTime => time::parse_utc_time(data).map(Element::UTCTime),
        UniversalTag::GeneralizedTime => {
            time::parse_generalized_time(data).map(Element::GeneralizedTime)
        }
        UniversalTag::Sequence | UniversalTag::Set | UniversalTag::Unimplemented(_) => {
            Ok(Element::Unimplemented(tlv.clone()))
        }
    }
}

fn ascii_string(data: &[u8], kind: &'static str) -> Result<String, Error> {
    if !data.is_ascii() {
        return Err(Error::InvalidCharacterString(kind));
    }
    String::from_utf8(data.to_vec()).map_err(|_| Error::InvalidCharacterString(kind))
}

// T.61 is rarely honoured in practice; most producers put UTF-8 or Latin-1 here.
fn teletex_string(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => data.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Decodes UTF-16BE text, as used by BMPString and PKCS#12 friendly names.
pub fn decode_bmp_string(data: &[u8]) -> Result<String, Error> {
    if data.len() % 2 != 0 {
        return Err(Error::BmpStringOddLength(data.len()));
    }
    let units = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| Error::BmpStringInvalidCodePoint)
}

fn decode_universal_string(data: &[u8]) -> Result<String, Error> {
    if data.len() % 4 != 0 {
        return Err(Error::UniversalStringInvalidLength(data.len()));
    }
    data.chunks_exact(4)
        .map(|quad| {
            let code = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
            char::from_u32(code).ok_or(Error::UniversalStringInvalidCodePoint(code))
        })
        .collect()
}

/// Renders bytes as upper-case hex pairs joined by `separator`.
pub fn to_hex(bytes: &[u8], separator: &str) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(separator)
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Element::Boolean(true) => write!(f, "TRUE"),
            Element::Boolean(false) => write!(f, "FALSE"),
            Element::Integer(i) | Element::Enumerated(i) => write!(f, "{}", i),
            Element::BitString(bs) => write!(f, "{}", to_hex(bs.as_bytes(), ":")),
            Element::OctetString(os) => write!(f, "{}", to_hex(os.as_bytes(), ":")),
            Element::Null => write!(f, "NULL"),
            Element::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Element::UTF8String(s)
            | Element::NumericString(s)
            | Element::PrintableString(s)
            | Element::TeletexString(s)
            | Element::IA5String(s)
            | Element::VisibleString(s)
            | Element::UniversalString(s)
            | Element::BMPString(s) => write!(f, "{}", s),
            Element::UTCTime(t) | Element::GeneralizedTime(t) => {
                write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S UTC"))
            }
            Element::Sequence(elements) => write!(f, "[{}]", join(elements)),
            Element::Set(elements) => write!(f, "{{{}}}", join(elements)),
            Element::ContextSpecific { slot, element, .. } => write!(f, "[{}] {}", slot, element),
            Element::Unimplemented(tlv) => match tlv.data() {
                Some(data) => write!(f, "{} {}", tlv.tag(), to_hex(data, ":")),
                None => write!(f, "{} (constructed)", tlv.tag()),
            },
        }
    }
}

fn join(elements: &[Element]) -> String {
    elements
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ASN.1 INTEGER is arbitrary precision and may be negative.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Integer {
    inner: BigInt,
}

impl Integer {
    pub fn as_bigint(&self) -> &BigInt {
        &self.inner
    }

    pub fn to_u32(&self) -> Option<u32> {
        self.inner.to_u32()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.inner.to_u64()
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.inner.to_i64()
    }

    /// Minimal two's complement big-endian encoding.
    pub fn to_signed_bytes_be(&self) -> Vec<u8> {
        self.inner.to_signed_bytes_be()
    }
}

impl TryFrom<&[u8]> for Integer {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::IntegerNoData);
        }
        Ok(Integer {
            inner: BigInt::from_signed_bytes_be(value),
        })
    }
}

impl From<BigInt> for Integer {
    fn from(inner: BigInt) -> Self {
        Integer { inner }
    }
}

impl From<u64> for Integer {
    fn from(value: u64) -> Self {
        Integer {
            inner: BigInt::from(value),
        }
    }
}

impl Display for Integer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl Serialize for Integer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.inner.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    inner: Vec<u64>,
}

impl ObjectIdentifier {
    pub fn arcs(&self) -> &[u64] {
        &self.inner
    }
}

impl TryFrom<&[u8]> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::ObjectIdentifierNoData);
        }

        let mut subidentifiers = Vec::new();
        let mut current = 0u64;
        let mut pending = false;
        for &b in value {
            if current > (u64::MAX >> 7) {
                return Err(Error::ObjectIdentifierArcOverflow);
            }
            current = (current << 7) | u64::from(b & 0x7f);
            pending = b & 0x80 != 0;
            if !pending {
                subidentifiers.push(current);
                current = 0;
            }
        }
        if pending {
            return Err(Error::ObjectIdentifierIncompleteEncoding);
        }

        // the first subidentifier packs the first two arcs as 40 * X + Y.
        let mut inner = Vec::with_capacity(subidentifiers.len() + 1);
        match subidentifiers[0] {
            first @ 0..40 => inner.extend([0, first]),
            first @ 40..80 => inner.extend([1, first - 40]),
            first => inner.extend([2, first - 80]),
        }
        inner.extend_from_slice(&subidentifiers[1..]);
        Ok(ObjectIdentifier { inner })
    }
}

impl Display for ObjectIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = self
            .inner
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}", s)
    }
}

impl FromStr for ObjectIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .split('.')
            .map(|arc| arc.parse::<u64>().map_err(Error::ObjectIdentifierInvalidComponent))
            .collect::<Result<Vec<u64>, Error>>()?;
        Ok(ObjectIdentifier { inner })
    }
}

impl PartialEq<&str> for ObjectIdentifier {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl Serialize for ObjectIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString {
    unused: u8,
    data: Vec<u8>,
}

impl BitString {
    pub fn new(unused: u8, data: Vec<u8>) -> Self {
        BitString { unused, data }
    }

    pub fn unused_bits(&self) -> u8 {
        self.unused
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bit_len(&self) -> usize {
        (self.data.len() * 8).saturating_sub(usize::from(self.unused))
    }

    /// Returns bit `index`, counting from the most significant bit of the first octet.
    pub fn bit(&self, index: usize) -> bool {
        if index >= self.bit_len() {
            return false;
        }
        self.data
            .get(index / 8)
            .is_some_and(|byte| byte & (0x80 >> (index % 8)) != 0)
    }
}

impl TryFrom<&[u8]> for BitString {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value.split_first() {
            Some((&unused, _)) if unused > 7 => Err(Error::BitStringUnusedBitsOutOfRange(unused)),
            Some((&unused, data)) => Ok(BitString {
                unused,
                data: data.to_vec(),
            }),
            None => Err(Error::BitStringNoData),
        }
    }
}

impl AsRef<[u8]> for BitString {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Serialize for BitString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_hex(&self.data, ":"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctetString {
    inner: Vec<u8>,
}

impl OctetString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.inner
    }
}

impl From<Vec<u8>> for OctetString {
    fn from(value: Vec<u8>) -> Self {
        OctetString { inner: value }
    }
}

impl From<&[u8]> for OctetString {
    fn from(value: &[u8]) -> Self {
        OctetString {
            inner: value.to_vec(),
        }
    }
}

impl AsRef<[u8]> for OctetString {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl Display for OctetString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_hex(&self.inner, ":"))
    }
}

impl Serialize for OctetString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_hex(&self.inner, ":"))
    }
}

/// Parses the content octets as exactly one nested DER value.
impl DecodableFrom<OctetString> for Element {}

impl Decoder<OctetString, Element> for OctetString {
    type Error = Error;

    fn decode(&self) -> Result<Element, Self::Error> {
        let tlv = pfxview_der::decode(&self.inner)?;
        Element::try_from(&tlv)
    }
}
