use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported PFX version {0}")]
    UnsupportedVersion(String),
    #[error("integrity check failed")]
    IntegrityCheckFailed,
    #[error("invalid password")]
    InvalidPassword,
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("malformed container: {0}")]
    Malformed(String),

    #[error("invalid DER: {0}")]
    InvalidDer(#[from] pfxview_der::error::Error),
    #[error("invalid ASN.1: {0}")]
    InvalidASN1(#[from] pfxview_asn1::error::Error),
    #[error("invalid certificate: {0}")]
    InvalidCertificate(#[from] pfxview_x509::error::Error),
}

impl Error {
    /// True for failures that a different password could resolve.
    pub fn is_password_error(&self) -> bool {
        matches!(self, Error::IntegrityCheckFailed | Error::InvalidPassword)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
