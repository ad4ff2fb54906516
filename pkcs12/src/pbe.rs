//! Password-based encryption schemes used for encrypted safe contents and
//! shrouded key bags.

use std::fmt;

use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, KeyIvInit};
use pfxview_asn1::Element;
use pfxview_x509::AlgorithmIdentifier;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use tracing::debug;

use crate::error::{Error, Result};
use crate::kdf::{DigestAlgorithm, ID_IV, ID_KEY};
use crate::{algorithm_identifier, iteration_count, oid};

/*
RFC 7292 Appendix C

pkcs-12PbeParams ::= SEQUENCE {
    salt        OCTET STRING,
    iterations  INTEGER
}
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pkcs12Cipher {
    TripleDes,
    TwoKeyTripleDes,
    Rc2With128BitKey,
    Rc2With40BitKey,
}

impl Pkcs12Cipher {
    fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            oid::PBE_SHA1_3DES => Some(Pkcs12Cipher::TripleDes),
            oid::PBE_SHA1_2DES => Some(Pkcs12Cipher::TwoKeyTripleDes),
            oid::PBE_SHA1_RC2_128 => Some(Pkcs12Cipher::Rc2With128BitKey),
            oid::PBE_SHA1_RC2_40 => Some(Pkcs12Cipher::Rc2With40BitKey),
            _ => None,
        }
    }

    fn key_len(self) -> usize {
        match self {
            Pkcs12Cipher::TripleDes => 24,
            Pkcs12Cipher::TwoKeyTripleDes | Pkcs12Cipher::Rc2With128BitKey => 16,
            Pkcs12Cipher::Rc2With40BitKey => 5,
        }
    }

    fn decrypt(self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        match self {
            Pkcs12Cipher::TripleDes => cbc_decrypt::<cbc::Decryptor<des::TdesEde3>>(key, iv, ciphertext),
            Pkcs12Cipher::TwoKeyTripleDes => {
                cbc_decrypt::<cbc::Decryptor<des::TdesEde2>>(key, iv, ciphertext)
            }
            // RC2's effective key length follows the key length.
            Pkcs12Cipher::Rc2With128BitKey | Pkcs12Cipher::Rc2With40BitKey => {
                cbc_decrypt::<cbc::Decryptor<rc2::Rc2>>(key, iv, ciphertext)
            }
        }
    }
}

impl fmt::Display for Pkcs12Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pkcs12Cipher::TripleDes => "pbeWithSHAAnd3-KeyTripleDES-CBC",
            Pkcs12Cipher::TwoKeyTripleDes => "pbeWithSHAAnd2-KeyTripleDES-CBC",
            Pkcs12Cipher::Rc2With128BitKey => "pbeWithSHAAnd128BitRC2-CBC",
            Pkcs12Cipher::Rc2With40BitKey => "pbeWithSHAAnd40BitRC2-CBC",
        };
        write!(f, "{}", name)
    }
}

/*
RFC 8018 Appendix A.2 and A.4

PBKDF2-params ::= SEQUENCE {
    salt CHOICE {
        specified OCTET STRING,
        otherSource AlgorithmIdentifier {{PBKDF2-SaltSources}}
    },
    iterationCount INTEGER (1..MAX),
    keyLength INTEGER (1..MAX) OPTIONAL,
    prf AlgorithmIdentifier {{PBKDF2-PRFs}} DEFAULT algid-hmacWithSHA1
}

PBES2-params ::= SEQUENCE {
    keyDerivationFunc AlgorithmIdentifier {{PBES2-KDFs}},
    encryptionScheme AlgorithmIdentifier {{PBES2-Encs}}
}
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pbes2Cipher {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    DesEde3Cbc,
}

impl Pbes2Cipher {
    fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            oid::AES_128_CBC => Some(Pbes2Cipher::Aes128Cbc),
            oid::AES_192_CBC => Some(Pbes2Cipher::Aes192Cbc),
            oid::AES_256_CBC => Some(Pbes2Cipher::Aes256Cbc),
            oid::DES_EDE3_CBC => Some(Pbes2Cipher::DesEde3Cbc),
            _ => None,
        }
    }

    fn key_len(self) -> usize {
        match self {
            Pbes2Cipher::Aes128Cbc => 16,
            Pbes2Cipher::Aes192Cbc | Pbes2Cipher::DesEde3Cbc => 24,
            Pbes2Cipher::Aes256Cbc => 32,
        }
    }

    fn iv_len(self) -> usize {
        match self {
            Pbes2Cipher::DesEde3Cbc => 8,
            _ => 16,
        }
    }

    fn decrypt(self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        match self {
            Pbes2Cipher::Aes128Cbc => cbc_decrypt::<cbc::Decryptor<aes::Aes128>>(key, iv, ciphertext),
            Pbes2Cipher::Aes192Cbc => cbc_decrypt::<cbc::Decryptor<aes::Aes192>>(key, iv, ciphertext),
            Pbes2Cipher::Aes256Cbc => cbc_decrypt::<cbc::Decryptor<aes::Aes256>>(key, iv, ciphertext),
            Pbes2Cipher::DesEde3Cbc => {
                cbc_decrypt::<cbc::Decryptor<des::TdesEde3>>(key, iv, ciphertext)
            }
        }
    }
}

impl fmt::Display for Pbes2Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pbes2Cipher::Aes128Cbc => "AES-128-CBC",
            Pbes2Cipher::Aes192Cbc => "AES-192-CBC",
            Pbes2Cipher::Aes256Cbc => "AES-256-CBC",
            Pbes2Cipher::DesEde3Cbc => "DES-EDE3-CBC",
        };
        write!(f, "{}", name)
    }
}

/// A password-based encryption scheme with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptionScheme {
    /// RFC 7292 Appendix C: SHA-1 PKCS#12 KDF over the BMPString password.
    Pkcs12 {
        cipher: Pkcs12Cipher,
        salt: Vec<u8>,
        iterations: u32,
    },
    /// RFC 8018 PBES2: PBKDF2 over the UTF-8 password.
    Pbes2 {
        prf: DigestAlgorithm,
        salt: Vec<u8>,
        iterations: u32,
        cipher: Pbes2Cipher,
        iv: Vec<u8>,
    },
}

impl EncryptionScheme {
    pub fn from_algorithm(algorithm: &AlgorithmIdentifier, max_iterations: u32) -> Result<Self> {
        let algorithm_oid = algorithm.algorithm.to_string();
        let scheme = if let Some(cipher) = Pkcs12Cipher::from_oid(&algorithm_oid) {
            let (salt, iterations) = match algorithm.parameters.as_ref().and_then(Element::as_sequence) {
                Some([Element::OctetString(salt), Element::Integer(iterations)]) => (
                    salt.as_bytes().to_vec(),
                    iteration_count(iterations, max_iterations)?,
                ),
                _ => {
                    return Err(Error::Malformed(format!(
                        "{}: expected pkcs-12PbeParams",
                        cipher
                    )));
                }
            };
            EncryptionScheme::Pkcs12 {
                cipher,
                salt,
                iterations,
            }
        } else if algorithm_oid == oid::PBES2 {
            pbes2(algorithm.parameters.as_ref(), max_iterations)?
        } else {
            return Err(Error::UnsupportedAlgorithm(format!(
                "encryption algorithm {}",
                algorithm
            )));
        };
        debug!(scheme = %scheme, "selected password-based encryption scheme");
        Ok(scheme)
    }

    /// Decrypts `ciphertext`.
    ///
    /// PBES2 keys come from the UTF-8 password; PKCS#12 keys from each of
    /// `candidates` (BMPString encodings) in turn until one unpads cleanly.
    pub fn decrypt(&self, ciphertext: &[u8], password: &str, candidates: &[Vec<u8>]) -> Result<Vec<u8>> {
        match self {
            EncryptionScheme::Pkcs12 {
                cipher,
                salt,
                iterations,
            } => {
                for candidate in candidates {
                    let key = DigestAlgorithm::Sha1.derive(ID_KEY, candidate, salt, *iterations, cipher.key_len());
                    let iv = DigestAlgorithm::Sha1.derive(ID_IV, candidate, salt, *iterations, 8);
                    match cipher.decrypt(&key, &iv, ciphertext) {
                        Err(Error::InvalidPassword) => continue,
                        result => return result,
                    }
                }
                Err(Error::InvalidPassword)
            }
            EncryptionScheme::Pbes2 {
                prf,
                salt,
                iterations,
                cipher,
                iv,
            } => {
                let mut key = vec![0u8; cipher.key_len()];
                let password = password.as_bytes();
                match prf {
                    DigestAlgorithm::Sha1 => pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, *iterations, &mut key),
                    DigestAlgorithm::Sha224 => pbkdf2::pbkdf2_hmac::<Sha224>(password, salt, *iterations, &mut key),
                    DigestAlgorithm::Sha256 => pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, *iterations, &mut key),
                    DigestAlgorithm::Sha384 => pbkdf2::pbkdf2_hmac::<Sha384>(password, salt, *iterations, &mut key),
                    DigestAlgorithm::Sha512 => pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, *iterations, &mut key),
                }
                cipher.decrypt(&key, iv, ciphertext)
            }
        }
    }
}

impl fmt::Display for EncryptionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionScheme::Pkcs12 { cipher, .. } => write!(f, "{}", cipher),
            EncryptionScheme::Pbes2 { prf, cipher, .. } => {
                write!(f, "PBES2 (PBKDF2-HMAC-{}, {})", prf, cipher)
            }
        }
    }
}

fn pbes2(parameters: Option<&Element>, max_iterations: u32) -> Result<EncryptionScheme> {
    let Some([kdf, encryption]) = parameters.and_then(Element::as_sequence) else {
        return Err(Error::Malformed("PBES2: expected PBES2-params".to_string()));
    };
    let kdf = algorithm_identifier(kdf)?;
    if kdf.algorithm != oid::PBKDF2 {
        return Err(Error::UnsupportedAlgorithm(format!(
            "PBES2 key derivation {}",
            kdf.algorithm
        )));
    }
    let encryption = algorithm_identifier(encryption)?;
    let cipher = Pbes2Cipher::from_oid(&encryption.algorithm.to_string()).ok_or_else(|| {
        Error::UnsupportedAlgorithm(format!("PBES2 encryption {}", encryption))
    })?;
    let iv = match &encryption.parameters {
        Some(Element::OctetString(iv)) if iv.as_bytes().len() == cipher.iv_len() => iv.as_bytes().to_vec(),
        _ => return Err(Error::Malformed(format!("{}: invalid IV", cipher))),
    };

    let Some([salt, iterations, rest @ ..]) = kdf.parameters.as_ref().and_then(Element::as_sequence) else {
        return Err(Error::Malformed("PBKDF2: expected PBKDF2-params".to_string()));
    };
    let salt = match salt {
        Element::OctetString(salt) => salt.as_bytes().to_vec(),
        Element::Sequence(_) => {
            return Err(Error::UnsupportedAlgorithm("PBKDF2 salt source".to_string()));
        }
        _ => return Err(Error::Malformed("PBKDF2: invalid salt".to_string())),
    };
    let iterations = match iterations {
        Element::Integer(n) => iteration_count(n, max_iterations)?,
        _ => return Err(Error::Malformed("PBKDF2: invalid iteration count".to_string())),
    };
    let (key_length, prf) = match rest {
        [] => (None, None),
        [Element::Integer(len)] => (Some(len), None),
        [prf @ Element::Sequence(_)] => (None, Some(prf)),
        [Element::Integer(len), prf @ Element::Sequence(_)] => (Some(len), Some(prf)),
        _ => return Err(Error::Malformed("PBKDF2: unexpected parameters".to_string())),
    };
    if let Some(len) = key_length {
        if len.to_u64() != Some(cipher.key_len() as u64) {
            return Err(Error::Malformed(format!(
                "PBKDF2: key length {} does not match {}",
                len, cipher
            )));
        }
    }
    let prf = match prf {
        None => DigestAlgorithm::Sha1,
        Some(prf) => {
            let prf = algorithm_identifier(prf)?;
            DigestAlgorithm::from_hmac_oid(&prf.algorithm.to_string())
                .ok_or_else(|| Error::UnsupportedAlgorithm(format!("PBKDF2 PRF {}", prf)))?
        }
    };

    Ok(EncryptionScheme::Pbes2 {
        prf,
        salt,
        iterations,
        cipher,
        iv,
    })
}

// Bad padding is the only signal of a wrong key, so it maps to InvalidPassword.
fn cbc_decrypt<D: KeyIvInit + BlockDecryptMut>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % D::block_size() != 0 {
        return Err(Error::Malformed(format!(
            "ciphertext length {} is not a multiple of the block size",
            ciphertext.len()
        )));
    }
    let decryptor = D::new_from_slices(key, iv)
        .map_err(|_| Error::Malformed("invalid key or IV length".to_string()))?;
    let mut buf = ciphertext.to_vec();
    let len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| Error::InvalidPassword)?
        .len();
    buf.truncate(len);
    Ok(buf)
}
