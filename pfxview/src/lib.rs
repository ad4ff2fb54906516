//! # pfxview
//!
//! Conversion traits shared by every layer of the pfxview certificate
//! container engine.
//!
//! ## Overview
//!
//! Untrusted bytes move through a chain of typed representations:
//! ```text
//! bytes → Tlv (der) → Element (asn1) → Certificate (x509) / Pkcs12Container (pkcs12) → ParseOutcome (viewer)
//! ```
//!
//! Each hop implements [`decoder::Decoder`]. The only hop that goes back the
//! other way is the DER re-encoder, which implements [`encoder::Encoder`] so
//! that fingerprints are always taken over canonical bytes.
//!
//! ## Example
//!
//! ```ignore
//! use pfxview::decoder::Decoder;
//! use pfxview::encoder::Encoder;
//! use pfxview_der::Tlv;
//!
//! let bytes: &[u8] = &[0x30, 0x03, 0x02, 0x01, 0x07];
//! let tlv: Tlv = bytes.decode().unwrap();
//! let encoded: Vec<u8> = tlv.encode().unwrap();
//! assert_eq!(bytes, encoded.as_slice());
//! ```

#![forbid(unsafe_code)]

pub mod decoder;
pub mod encoder;
