//! Object identifiers used by PKCS#12, PKCS#5 and PKCS#7.

// PKCS#7 content types
pub const DATA: &str = "1.2.840.113549.1.7.1";
pub const SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
pub const ENCRYPTED_DATA: &str = "1.2.840.113549.1.7.6";

// PKCS#12 bag types
pub const KEY_BAG: &str = "1.2.840.113549.1.12.10.1.1";
pub const PKCS8_SHROUDED_KEY_BAG: &str = "1.2.840.113549.1.12.10.1.2";
pub const CERT_BAG: &str = "1.2.840.113549.1.12.10.1.3";
pub const CRL_BAG: &str = "1.2.840.113549.1.12.10.1.4";
pub const SECRET_BAG: &str = "1.2.840.113549.1.12.10.1.5";
pub const SAFE_CONTENTS_BAG: &str = "1.2.840.113549.1.12.10.1.6";

pub const X509_CERTIFICATE: &str = "1.2.840.113549.1.9.22.1";

// PKCS#9 attributes
pub const FRIENDLY_NAME: &str = "1.2.840.113549.1.9.20";
pub const LOCAL_KEY_ID: &str = "1.2.840.113549.1.9.21";

// PKCS#12 password-based encryption
pub const PBE_SHA1_3DES: &str = "1.2.840.113549.1.12.1.3";
pub const PBE_SHA1_2DES: &str = "1.2.840.113549.1.12.1.4";
pub const PBE_SHA1_RC2_128: &str = "1.2.840.113549.1.12.1.5";
pub const PBE_SHA1_RC2_40: &str = "1.2.840.113549.1.12.1.6";

// PKCS#5 v2
pub const PBES2: &str = "1.2.840.113549.1.5.13";
pub const PBKDF2: &str = "1.2.840.113549.1.5.12";
pub const HMAC_WITH_SHA1: &str = "1.2.840.113549.2.7";
pub const HMAC_WITH_SHA224: &str = "1.2.840.113549.2.8";
pub const HMAC_WITH_SHA256: &str = "1.2.840.113549.2.9";
pub const HMAC_WITH_SHA384: &str = "1.2.840.113549.2.10";
pub const HMAC_WITH_SHA512: &str = "1.2.840.113549.2.11";
pub const AES_128_CBC: &str = "2.16.840.1.101.3.4.1.2";
pub const AES_192_CBC: &str = "2.16.840.1.101.3.4.1.22";
pub const AES_256_CBC: &str = "2.16.840.1.101.3.4.1.42";
pub const DES_EDE3_CBC: &str = "1.2.840.113549.3.7";

// Digests
pub const SHA1: &str = "1.3.14.3.2.26";
pub const SHA224: &str = "2.16.840.1.101.3.4.2.4";
pub const SHA256: &str = "2.16.840.1.101.3.4.2.1";
pub const SHA384: &str = "2.16.840.1.101.3.4.2.2";
pub const SHA512: &str = "2.16.840.1.101.3.4.2.3";
