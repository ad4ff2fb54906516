use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),
    #[error("invalid version: {0}")]
    InvalidVersion(String),
    #[error("invalid certificate serial number: {0}")]
    InvalidCertificateSerialNumber(String),
    #[error("invalid algorithm identifier: {0}")]
    InvalidAlgorithmIdentifier(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("invalid relative distinguished name: {0}")]
    InvalidRelativeDistinguishedName(String),
    #[error("invalid attribute type and value: {0}")]
    InvalidAttributeTypeAndValue(String),
    #[error("invalid validity: {0}")]
    InvalidValidity(String),
    #[error("invalid subject public key info: {0}")]
    InvalidSubjectPublicKeyInfo(String),
    #[error("invalid unique identifier: {0}")]
    InvalidUniqueIdentifier(String),
    #[error("invalid extension: {0}")]
    InvalidExtension(String),
    #[error("invalid SubjectAltName: {0}")]
    InvalidSubjectAltName(String),
    #[error("invalid GeneralName: {0}")]
    InvalidGeneralName(String),
    #[error("invalid KeyUsage: {0}")]
    InvalidKeyUsage(String),
    #[error("invalid ExtendedKeyUsage: {0}")]
    InvalidExtendedKeyUsage(String),
    #[error("invalid BasicConstraints: {0}")]
    InvalidBasicConstraints(String),
    #[error("extension OID mismatch: expected {expected}, actual {actual}")]
    OidMismatch { expected: String, actual: String },
    #[error("invalid ASN.1: {0}")]
    InvalidASN1(#[from] pfxview_asn1::error::Error),
    #[error("invalid DER: {0}")]
    InvalidDer(#[from] pfxview_der::error::Error),
}
