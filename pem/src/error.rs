use base64::DecodeError;
use thiserror::Error;

/// Errors raised while scanning PEM text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// No `-----BEGIN ...-----` line was found.
    #[error("missing a pre encapsulation boundary")]
    MissingPreEncapsulationBoundary,

    /// A block was opened but never closed.
    #[error("missing a post encapsulation boundary")]
    MissingPostEncapsulationBoundary,

    #[error("missing PEM data")]
    MissingData,

    #[error("label doesn't match: BEGIN {begin}, END {end}")]
    LabelMissMatch { begin: String, end: String },

    #[error("base64 decode: {0}")]
    Base64Decode(DecodeError),
}
