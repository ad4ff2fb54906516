//! PKCS#12 key derivation (RFC 7292 Appendix B) and password encodings.

use std::fmt;

use sha1::Sha1;
use sha2::digest::{Digest, FixedOutputReset};
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::oid;

pub const ID_KEY: u8 = 1;
pub const ID_IV: u8 = 2;
pub const ID_MAC: u8 = 3;

/// BMPString encoding of a password: UTF-16BE followed by two zero bytes.
pub fn bmp_password(password: &str) -> Vec<u8> {
    let mut out: Vec<u8> = password
        .encode_utf16()
        .flat_map(u16::to_be_bytes)
        .collect();
    out.extend_from_slice(&[0, 0]);
    out
}

/// Byte encodings to try for a password.
///
/// Producers disagree on the empty password: RFC 7292 gives the two-byte
/// terminator, some tools use a zero-length string. Both are tried.
pub fn password_candidates(password: &str) -> Vec<Vec<u8>> {
    if password.is_empty() {
        vec![vec![0, 0], Vec::new()]
    } else {
        vec![bmp_password(password)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Looks up a message digest OID, as found in MacData.
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            oid::SHA1 => Some(DigestAlgorithm::Sha1),
            oid::SHA224 => Some(DigestAlgorithm::Sha224),
            oid::SHA256 => Some(DigestAlgorithm::Sha256),
            oid::SHA384 => Some(DigestAlgorithm::Sha384),
            oid::SHA512 => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Looks up an HMAC OID, as used for the PBKDF2 PRF.
    pub fn from_hmac_oid(oid: &str) -> Option<Self> {
        match oid {
            oid::HMAC_WITH_SHA1 => Some(DigestAlgorithm::Sha1),
            oid::HMAC_WITH_SHA224 => Some(DigestAlgorithm::Sha224),
            oid::HMAC_WITH_SHA256 => Some(DigestAlgorithm::Sha256),
            oid::HMAC_WITH_SHA384 => Some(DigestAlgorithm::Sha384),
            oid::HMAC_WITH_SHA512 => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    // Hash block size in bytes, the `v` of the KDF.
    fn block_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 | DigestAlgorithm::Sha224 | DigestAlgorithm::Sha256 => 64,
            DigestAlgorithm::Sha384 | DigestAlgorithm::Sha512 => 128,
        }
    }

    /// Derives `len` bytes of key material for the given purpose `id`.
    ///
    /// `password` is already encoded (see [`bmp_password`]).
    pub fn derive(
        self,
        id: u8,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        len: usize,
    ) -> Vec<u8> {
        let v = self.block_len();
        match self {
            DigestAlgorithm::Sha1 => derive::<Sha1>(id, password, salt, iterations, len, v),
            DigestAlgorithm::Sha224 => derive::<Sha224>(id, password, salt, iterations, len, v),
            DigestAlgorithm::Sha256 => derive::<Sha256>(id, password, salt, iterations, len, v),
            DigestAlgorithm::Sha384 => derive::<Sha384>(id, password, salt, iterations, len, v),
            DigestAlgorithm::Sha512 => derive::<Sha512>(id, password, salt, iterations, len, v),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha224 => "SHA-224",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        };
        write!(f, "{}", name)
    }
}

fn derive<D: Digest + FixedOutputReset>(
    id: u8,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    len: usize,
    v: usize,
) -> Vec<u8> {
    let diversifier = vec![id; v];
    let mut input = repeat_to_block(salt, v);
    input.extend(repeat_to_block(password, v));

    let mut hasher = D::new();
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        Digest::update(&mut hasher, &diversifier);
        Digest::update(&mut hasher, &input);
        let mut block = hasher.finalize_reset().to_vec();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &block);
            block = hasher.finalize_reset().to_vec();
        }
        let take = (len - out.len()).min(block.len());
        out.extend_from_slice(&block[..take]);

        if out.len() < len {
            let b = repeat_to_block(&block, v);
            for chunk in input.chunks_mut(v) {
                add_one_plus(chunk, &b);
            }
        }
    }
    out
}

// Concatenates copies of `data` up to the next multiple of `v`; empty stays empty.
fn repeat_to_block(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let len = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(len).collect()
}

// chunk = (chunk + b + 1) mod 2^(8v), big-endian
fn add_one_plus(chunk: &mut [u8], b: &[u8]) {
    let mut carry = 1u16;
    for (x, y) in chunk.iter_mut().zip(b).rev() {
        let sum = *x as u16 + *y as u16 + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}
