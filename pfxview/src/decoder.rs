//! Decoder trait for typed conversions.
//!
//! `Decoder<T, D>` converts a source `T` into a destination `D`. The
//! destination opts in through the `DecodableFrom<T>` marker, so a pair of
//! types can only be converted when both sides agree on it.
//!
//! ```no_run
//! use pfxview::decoder::{DecodableFrom, Decoder};
//!
//! struct Octets(Vec<u8>);
//! struct Label(String);
//!
//! #[derive(Debug)]
//! struct LabelError;
//!
//! impl DecodableFrom<Octets> for Label {}
//!
//! impl Decoder<Octets, Label> for Octets {
//!     type Error = LabelError;
//!
//!     fn decode(&self) -> Result<Label, Self::Error> {
//!         String::from_utf8(self.0.clone()).map(Label).map_err(|_| LabelError)
//!     }
//! }
//! ```

/// Converts `self` (of type `T`) into `D`.
///
/// Implemented on the source type. Decoding never takes ownership: every
/// layer keeps its input intact so callers can fall back to a raw rendering
/// when a typed decode fails.
pub trait Decoder<T, D: DecodableFrom<T>> {
    /// The error type returned when decoding fails.
    type Error;

    /// Decodes `self` into `D`.
    ///
    /// # Errors
    ///
    /// Returns an error when `self` does not hold a valid encoding of `D`.
    fn decode(&self) -> Result<D, Self::Error>;
}

/// Marker trait declaring that `Self` can be decoded from `T`.
pub trait DecodableFrom<T> {}
