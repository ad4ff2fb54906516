//! Tag-length-value reader for definite-length BER and DER.
//!
//! [`decode`] reads exactly one value and rejects anything after it;
//! [`decode_all`] reads a stream of back-to-back values. Constructed values
//! are always expanded into child [`Tlv`]s, so every node in the tree has had
//! its length checked against the bytes that actually enclose it.
//!
//! Re-encoding a [`Tlv`] through [`Encoder`] always yields DER with minimal
//! tag and length forms.

use std::fmt::{self, Display, Formatter};

use nom::Parser;
use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use pfxview::decoder::{DecodableFrom, Decoder};
use pfxview::encoder::{EncodableTo, Encoder};

use error::Error;

pub mod error;

/// Maximum number of nested constructed values accepted by the reader.
pub const MAX_DEPTH: usize = 64;

pub const TAG_CONSTRUCTED: u8 = 0x20;
const TAG_NUMBER_MASK: u8 = 0x1f;
const LENGTH_LONG_FORM: u8 = 0x80;
const LENGTH_INDEFINITE: u8 = 0x80;
const LENGTH_RESERVED: u8 = 0xff;

type NomError<'a> = nom::error::Error<&'a [u8]>;

/// A sequence of top-level values read from one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Der {
    elements: Vec<Tlv>,
}

impl Der {
    pub fn new(elements: Vec<Tlv>) -> Self {
        Der { elements }
    }

    pub fn elements(&self) -> &[Tlv] {
        &self.elements
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniversalTag {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    Enumerated,
    UTF8String,
    Sequence,
    Set,
    NumericString,
    PrintableString,
    TeletexString,
    IA5String,
    UTCTime,
    GeneralizedTime,
    VisibleString,
    UniversalString,
    BMPString,
    Unimplemented(u32),
}

impl UniversalTag {
    pub fn number(&self) -> u32 {
        match self {
            UniversalTag::Boolean => 0x01,
            UniversalTag::Integer => 0x02,
            UniversalTag::BitString => 0x03,
            UniversalTag::OctetString => 0x04,
            UniversalTag::Null => 0x05,
            UniversalTag::ObjectIdentifier => 0x06,
            UniversalTag::Enumerated => 0x0a,
            UniversalTag::UTF8String => 0x0c,
            UniversalTag::Sequence => 0x10,
            UniversalTag::Set => 0x11,
            UniversalTag::NumericString => 0x12,
            UniversalTag::PrintableString => 0x13,
            UniversalTag::TeletexString => 0x14,
            UniversalTag::IA5String => 0x16,
            UniversalTag::UTCTime => 0x17,
            UniversalTag::GeneralizedTime => 0x18,
            UniversalTag::VisibleString => 0x1a,
            UniversalTag::UniversalString => 0x1c,
            UniversalTag::BMPString => 0x1e,
            UniversalTag::Unimplemented(n) => *n,
        }
    }
}

impl From<u32> for UniversalTag {
    fn from(value: u32) -> Self {
        match value {
            0x01 => UniversalTag::Boolean,
            0x02 => UniversalTag::Integer,
            0x03 => UniversalTag::BitString,
            0x04 => UniversalTag::OctetString,
            0x05 => UniversalTag::Null,
            0x06 => UniversalTag::ObjectIdentifier,
            0x0a => UniversalTag::Enumerated,
            0x0c => UniversalTag::UTF8String,
            0x10 => UniversalTag::Sequence,
            0x11 => UniversalTag::Set,
            0x12 => UniversalTag::NumericString,
            0x13 => UniversalTag::PrintableString,
            0x14 => UniversalTag::TeletexString,
            0x16 => UniversalTag::IA5String,
            0x17 => UniversalTag::UTCTime,
            0x18 => UniversalTag::GeneralizedTime,
            0x1a => UniversalTag::VisibleString,
            0x1c => UniversalTag::UniversalString,
            0x1e => UniversalTag::BMPString,
            n => UniversalTag::Unimplemented(n),
        }
    }
}

/// Identifier octets of a value: class, constructed bit and tag number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Universal { tag: UniversalTag, constructed: bool },
    Application { number: u32, constructed: bool },
    ContextSpecific { slot: u32, constructed: bool },
    Private { number: u32, constructed: bool },
}

impl Tag {
    pub const SEQUENCE: Tag = Tag::Universal {
        tag: UniversalTag::Sequence,
        constructed: true,
    };

    pub fn is_constructed(&self) -> bool {
        match self {
            Tag::Universal { constructed, .. }
            | Tag::Application { constructed, .. }
            | Tag::ContextSpecific { constructed, .. }
            | Tag::Private { constructed, .. } => *constructed,
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            Tag::Universal { tag, .. } => tag.number(),
            Tag::Application { number, .. } | Tag::Private { number, .. } => *number,
            Tag::ContextSpecific { slot, .. } => *slot,
        }
    }

    pub fn universal(&self) -> Option<UniversalTag> {
        match self {
            Tag::Universal { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    fn class_bits(&self) -> u8 {
        match self {
            Tag::Universal { .. } => 0x00,
            Tag::Application { .. } => 0x40,
            Tag::ContextSpecific { .. } => 0x80,
            Tag::Private { .. } => 0xc0,
        }
    }

    fn encoded_len(&self) -> usize {
        let number = self.number();
        if number < u32::from(TAG_NUMBER_MASK) {
            1
        } else {
            1 + base128_len(number)
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        let mut first = self.class_bits();
        if self.is_constructed() {
            first |= TAG_CONSTRUCTED;
        }
        let number = self.number();
        if number < u32::from(TAG_NUMBER_MASK) {
            out.push(first | number as u8);
            return;
        }
        out.push(first | TAG_NUMBER_MASK);
        let len = base128_len(number);
        for i in (0..len).rev() {
            let group = ((number >> (7 * i)) & 0x7f) as u8;
            out.push(if i == 0 { group } else { group | 0x80 });
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Universal { tag, .. } => match tag {
                UniversalTag::Unimplemented(n) => write!(f, "UNIVERSAL {}", n),
                tag => write!(f, "{:?}", tag),
            },
            Tag::Application { number, .. } => write!(f, "[APPLICATION {}]", number),
            Tag::ContextSpecific { slot, .. } => write!(f, "[{}]", slot),
            Tag::Private { number, .. } => write!(f, "[PRIVATE {}]", number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Tlv(Vec<Tlv>),
    Data(Vec<u8>),
}

/// One decoded value. `length` is the content length as declared in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: Tag,
    length: usize,
    value: Value,
}

impl Tlv {
    pub fn new_primitive(tag: Tag, data: Vec<u8>) -> Self {
        Tlv {
            tag,
            length: data.len(),
            value: Value::Data(data),
        }
    }

    pub fn new_constructed(tag: Tag, tlvs: Vec<Tlv>) -> Self {
        let length = tlvs.iter().map(Tlv::encoded_len).sum();
        Tlv {
            tag,
            length,
            value: Value::Tlv(tlvs),
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn data(&self) -> Option<&[u8]> {
        match &self.value {
            Value::Data(data) => Some(data),
            Value::Tlv(_) => None,
        }
    }

    pub fn tlvs(&self) -> Option<&[Tlv]> {
        match &self.value {
            Value::Tlv(tlvs) => Some(tlvs),
            Value::Data(_) => None,
        }
    }

    fn content_len(&self) -> usize {
        match &self.value {
            Value::Data(data) => data.len(),
            Value::Tlv(tlvs) => tlvs.iter().map(Tlv::encoded_len).sum(),
        }
    }

    fn encoded_len(&self) -> usize {
        let content_len = self.content_len();
        self.tag.encoded_len() + length_len(content_len) + content_len
    }

    fn write(&self, out: &mut Vec<u8>) {
        self.tag.write(out);
        write_length(self.content_len(), out);
        match &self.value {
            Value::Data(data) => out.extend_from_slice(data),
            Value::Tlv(tlvs) => tlvs.iter().for_each(|tlv| tlv.write(out)),
        }
    }

    fn parse(input: &[u8], depth: usize) -> Result<(&[u8], Tlv), Error> {
        let (input, tag) = parse_tag(input)?;
        let (input, length) = parse_length(input)?;
        if length > input.len() {
            return Err(Error::TruncatedData);
        }
        let (input, content) = read_bytes(input, length)?;

        if tag.is_constructed() {
            if depth >= MAX_DEPTH {
                return Err(Error::NestingTooDeep(MAX_DEPTH));
            }
            // children must consume the content region exactly.
            let mut tlvs = Vec::new();
            let mut content = content;
            while !content.is_empty() {
                let (rest, tlv) = Self::parse(content, depth + 1)?;
                content = rest;
                tlvs.push(tlv);
            }
            return Ok((
                input,
                Tlv {
                    tag,
                    length,
                    value: Value::Tlv(tlvs),
                },
            ));
        }

        Ok((
            input,
            Tlv {
                tag,
                length,
                value: Value::Data(content.to_vec()),
            },
        ))
    }
}

/// Decodes exactly one value from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Tlv, Error> {
    let (rest, tlv) = Tlv::parse(bytes, 0)?;
    if !rest.is_empty() {
        return Err(Error::TrailingData(rest.len()));
    }
    Ok(tlv)
}

/// Decodes consecutive top-level values until `bytes` is exhausted.
pub fn decode_all(bytes: &[u8]) -> Result<Der, Error> {
    let mut elements = Vec::new();
    let mut input = bytes;
    while !input.is_empty() {
        let (rest, tlv) = Tlv::parse(input, 0)?;
        input = rest;
        elements.push(tlv);
    }
    Ok(Der { elements })
}

impl DecodableFrom<&[u8]> for Tlv {}

impl Decoder<&[u8], Tlv> for &[u8] {
    type Error = Error;

    fn decode(&self) -> Result<Tlv, Self::Error> {
        crate::decode(self)
    }
}

impl DecodableFrom<Vec<u8>> for Der {}

impl Decoder<Vec<u8>, Der> for Vec<u8> {
    type Error = Error;

    fn decode(&self) -> Result<Der, Self::Error> {
        crate::decode_all(self)
    }
}

impl EncodableTo<Tlv> for Vec<u8> {}

impl Encoder<Tlv, Vec<u8>> for Tlv {
    type Error = Error;

    fn encode(&self) -> Result<Vec<u8>, Self::Error> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write(&mut out);
        Ok(out)
    }
}

impl EncodableTo<Der> for Vec<u8> {}

impl Encoder<Der, Vec<u8>> for Der {
    type Error = Error;

    fn encode(&self) -> Result<Vec<u8>, Self::Error> {
        let mut out = Vec::new();
        self.elements.iter().for_each(|tlv| tlv.write(&mut out));
        Ok(out)
    }
}

fn read_u8(input: &[u8]) -> Result<(&[u8], u8), Error> {
    be_u8::<&[u8], NomError>(input).map_err(|_| Error::TruncatedData)
}

fn read_bytes(input: &[u8], count: usize) -> Result<(&[u8], &[u8]), Error> {
    take::<usize, &[u8], NomError>(count)
        .parse(input)
        .map_err(|_| Error::TruncatedData)
}

fn parse_tag(input: &[u8]) -> Result<(&[u8], Tag), Error> {
    let (input, first) = read_u8(input)?;
    let constructed = first & TAG_CONSTRUCTED == TAG_CONSTRUCTED;
    let (input, number) = if first & TAG_NUMBER_MASK == TAG_NUMBER_MASK {
        parse_high_tag_number(input)?
    } else {
        (input, u32::from(first & TAG_NUMBER_MASK))
    };

    let tag = match first >> 6 {
        0 => {
            if number == 0 {
                return Err(Error::InvalidTag("end-of-contents".to_string()));
            }
            Tag::Universal {
                tag: UniversalTag::from(number),
                constructed,
            }
        }
        1 => Tag::Application {
            number,
            constructed,
        },
        2 => Tag::ContextSpecific {
            slot: number,
            constructed,
        },
        _ => Tag::Private {
            number,
            constructed,
        },
    };
    Ok((input, tag))
}

fn parse_high_tag_number(input: &[u8]) -> Result<(&[u8], u32), Error> {
    let mut input = input;
    let mut number: u32 = 0;
    let mut leading = true;
    loop {
        let (rest, b) = read_u8(input)?;
        input = rest;
        if leading && b == 0x80 {
            return Err(Error::InvalidTag("non-minimal tag number".to_string()));
        }
        leading = false;
        number = number
            .checked_mul(128)
            .and_then(|n| n.checked_add(u32::from(b & 0x7f)))
            .ok_or_else(|| Error::InvalidTag("tag number overflow".to_string()))?;
        if b & 0x80 == 0 {
            break;
        }
    }
    if number < u32::from(TAG_NUMBER_MASK) {
        return Err(Error::InvalidTag(format!(
            "tag number {} in high tag number form",
            number
        )));
    }
    Ok((input, number))
}

fn parse_length(input: &[u8]) -> Result<(&[u8], usize), Error> {
    let (input, n) = read_u8(input)?;
    match n {
        LENGTH_INDEFINITE => Err(Error::UnsupportedEncoding),
        LENGTH_RESERVED => Err(Error::LengthOverflow),
        n if n & LENGTH_LONG_FORM == 0 => Ok((input, usize::from(n))),
        n => {
            // long form: low 7 bits count the length octets that follow.
            let count = usize::from(n & 0x7f);
            if count > std::mem::size_of::<usize>() {
                return Err(Error::LengthOverflow);
            }
            let (input, bytes) = read_bytes(input, count)?;
            let length = bytes
                .iter()
                .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
            Ok((input, length))
        }
    }
}

fn base128_len(number: u32) -> usize {
    let mut len = 1;
    let mut n = number >> 7;
    while n > 0 {
        len += 1;
        n >>= 7;
    }
    len
}

fn length_len(length: usize) -> usize {
    if length < usize::from(LENGTH_LONG_FORM) {
        1
    } else {
        1 + (usize::BITS - length.leading_zeros()).div_ceil(8) as usize
    }
}

fn write_length(length: usize, out: &mut Vec<u8>) {
    if length < usize::from(LENGTH_LONG_FORM) {
        out.push(length as u8);
        return;
    }
    let bytes = length.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(LENGTH_LONG_FORM | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

#[cfg(test)]
mod tests {
    use pfxview::encoder::Encoder;
    use rstest::rstest;

    use super::*;

    const LEAF_DER: &[u8] = include_bytes!("../../testdata/leaf.der");

    #[rstest(input, expected,
        case(vec![0x02], Tag::Universal { tag: UniversalTag::Integer, constructed: false }),
        case(vec![0x30, 0x01], Tag::SEQUENCE),
        case(vec![0x31], Tag::Universal { tag: UniversalTag::Set, constructed: true }),
        case(vec![0x1e], Tag::Universal { tag: UniversalTag::BMPString, constructed: false }),
        case(vec![0xa0], Tag::ContextSpecific { slot: 0, constructed: true }),
        case(vec![0x82], Tag::ContextSpecific { slot: 2, constructed: false }),
        case(vec![0x61], Tag::Application { number: 1, constructed: true }),
        case(vec![0xdf, 0x21], Tag::Private { number: 33, constructed: false }),
        case(vec![0x9f, 0x81, 0x00], Tag::ContextSpecific { slot: 128, constructed: false }),
        case(vec![0x07], Tag::Universal { tag: UniversalTag::Unimplemented(7), constructed: false }),
    )]
    fn test_parse_tag(input: Vec<u8>, expected: Tag) {
        let (_, actual) = parse_tag(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest]
    #[case::end_of_contents(vec![0x00])]
    #[case::non_minimal(vec![0x9f, 0x80, 0x01])]
    #[case::low_number_in_high_form(vec![0x9f, 0x05])]
    #[case::overflow(vec![0x9f, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f])]
    fn test_parse_tag_invalid(#[case] input: Vec<u8>) {
        assert!(matches!(parse_tag(&input), Err(Error::InvalidTag(_))));
    }

    #[rstest(input, expected,
        case(vec![0x02], 0x02),
        case(vec![0x7f], 0x7f),
        case(vec![0x81, 0x80], 0x80),
        case(vec![0x82, 0x02, 0x10], 256 * 0x02 + 0x10),
        case(vec![0x83, 0x01, 0x00, 0x00], 256 * 256),
        case(vec![0x82, 0xff, 0xff], 256 * 0xff + 0xff),
    )]
    fn test_parse_length(input: Vec<u8>, expected: usize) {
        let (_, actual) = parse_length(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest]
    #[case::indefinite(vec![0x80], Error::UnsupportedEncoding)]
    #[case::reserved(vec![0xff], Error::LengthOverflow)]
    #[case::too_wide(vec![0x89, 1, 2, 3, 4, 5, 6, 7, 8, 9], Error::LengthOverflow)]
    #[case::missing_octets(vec![0x82, 0x01], Error::TruncatedData)]
    #[case::empty(vec![], Error::TruncatedData)]
    fn test_parse_length_error(#[case] input: Vec<u8>, #[case] expected: Error) {
        assert_eq!(Err(expected), parse_length(&input).map(|(_, n)| n));
    }

    #[rstest(input, expected,
        case(vec![0x02, 0x01, 0x01], Tlv::new_primitive(Tag::Universal { tag: UniversalTag::Integer, constructed: false }, vec![0x01])),
        case(vec![0x05, 0x00], Tlv::new_primitive(Tag::Universal { tag: UniversalTag::Null, constructed: false }, vec![])),
        case(vec![0x13, 0x02, 0x68, 0x69], Tlv::new_primitive(Tag::Universal { tag: UniversalTag::PrintableString, constructed: false }, vec![0x68, 0x69])),
        case(vec![0x06, 0x03, 0x55, 0x04, 0x03], Tlv::new_primitive(Tag::Universal { tag: UniversalTag::ObjectIdentifier, constructed: false }, vec![0x55, 0x04, 0x03])),
        case(vec![0x80, 0x02, 0xca, 0xfe], Tlv::new_primitive(Tag::ContextSpecific { slot: 0, constructed: false }, vec![0xca, 0xfe])),
        case(vec![0x30, 0x06, 0x02, 0x01, 0x07, 0x02, 0x01, 0x08], Tlv::new_constructed(Tag::SEQUENCE, vec![
            Tlv::new_primitive(Tag::Universal { tag: UniversalTag::Integer, constructed: false }, vec![0x07]),
            Tlv::new_primitive(Tag::Universal { tag: UniversalTag::Integer, constructed: false }, vec![0x08]),
        ])),
        case(vec![0xa0, 0x03, 0x02, 0x01, 0x02], Tlv::new_constructed(Tag::ContextSpecific { slot: 0, constructed: true }, vec![
            Tlv::new_primitive(Tag::Universal { tag: UniversalTag::Integer, constructed: false }, vec![0x02]),
        ])),
        case(vec![0x30, 0x00], Tlv::new_constructed(Tag::SEQUENCE, vec![])),
    )]
    fn test_decode(input: Vec<u8>, expected: Tlv) {
        let actual = decode(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest]
    #[case::empty(vec![], Error::TruncatedData)]
    #[case::declared_length_exceeds_input(vec![0x04, 0x05, 0x01, 0x02], Error::TruncatedData)]
    #[case::child_exceeds_parent(vec![0x30, 0x03, 0x02, 0x02, 0x01, 0x00], Error::TruncatedData)]
    #[case::indefinite_length(vec![0x30, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00], Error::UnsupportedEncoding)]
    #[case::trailing(vec![0x02, 0x01, 0x01, 0x00], Error::TrailingData(1))]
    #[case::trailing_value(vec![0x02, 0x01, 0x01, 0x05, 0x00], Error::TrailingData(2))]
    fn test_decode_error(#[case] input: Vec<u8>, #[case] expected: Error) {
        assert_eq!(Err(expected), decode(&input));
    }

    #[test]
    fn test_decode_all_reads_stream() {
        let input = vec![0x02, 0x01, 0x01, 0x05, 0x00, 0x30, 0x00];
        let der = decode_all(&input).unwrap();
        assert_eq!(3, der.elements().len());
        assert_eq!(input, der.encode().unwrap());
    }

    #[test]
    fn test_nesting_limit() {
        let null = Tlv::new_primitive(
            Tag::Universal {
                tag: UniversalTag::Null,
                constructed: false,
            },
            vec![],
        );
        let nest = |depth: usize| {
            (0..depth).fold(null.clone(), |inner, _| {
                Tlv::new_constructed(Tag::SEQUENCE, vec![inner])
            })
        };

        let shallow = nest(MAX_DEPTH).encode().unwrap();
        assert!(decode(&shallow).is_ok());

        let deep = nest(MAX_DEPTH + 1).encode().unwrap();
        assert_eq!(Err(Error::NestingTooDeep(MAX_DEPTH)), decode(&deep));
    }

    #[rstest]
    #[case::short_form(vec![0x30, 0x03, 0x02, 0x01, 0x05])]
    #[case::long_form(vec![0x04, 0x81, 0x80].into_iter().chain(std::iter::repeat_n(0xaa, 0x80)).collect())]
    #[case::high_tag(vec![0xbf, 0x81, 0x00, 0x02, 0x05, 0x00])]
    fn test_encode_round_trip(#[case] input: Vec<u8>) {
        let tlv = decode(&input).unwrap();
        assert_eq!(input, tlv.encode().unwrap());
    }

    #[test]
    fn test_encode_canonicalises_lengths() {
        // BER long form for a one-byte length inside a sequence.
        let input = vec![0x30, 0x81, 0x04, 0x04, 0x81, 0x01, 0xff];
        let tlv = decode(&input).unwrap();
        assert_eq!(4, tlv.length());
        assert_eq!(vec![0x30, 0x03, 0x04, 0x01, 0xff], tlv.encode().unwrap());
    }

    #[test]
    fn test_certificate_round_trip() {
        let tlv = decode(LEAF_DER).unwrap();
        assert_eq!(Tag::SEQUENCE, *tlv.tag());
        assert_eq!(3, tlv.tlvs().unwrap().len());
        assert_eq!(LEAF_DER, tlv.encode().unwrap().as_slice());
    }
}
