//! Encoder trait, the reverse of [`crate::decoder::Decoder`].

/// Converts `self` (of type `T`) into its encoded form `E`.
pub trait Encoder<T, E: EncodableTo<T>> {
    type Error;

    fn encode(&self) -> Result<E, Self::Error>;
}

/// Marker trait declaring that `Self` is an encoding of `T`.
pub trait EncodableTo<T> {}
