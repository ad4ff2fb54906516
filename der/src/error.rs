use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("truncated data")]
    TruncatedData,
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    #[error("unsupported encoding: indefinite length")]
    UnsupportedEncoding,
    #[error("length overflow")]
    LengthOverflow,
    #[error("nesting deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("{0} bytes of trailing data")]
    TrailingData(usize),
}
