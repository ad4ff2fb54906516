use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("empty input")]
    EmptyInput,
    #[error("unrecognized input: {0}")]
    UnrecognizedInput(String),
    #[error("no certificate could be decoded ({0} omitted)")]
    NoCertificates(usize),
    #[error("{event} is not valid in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    #[error("invalid DER: {0}")]
    InvalidDer(#[from] pfxview_der::error::Error),
    #[error("invalid ASN.1: {0}")]
    InvalidASN1(#[from] pfxview_asn1::error::Error),
    #[error("invalid PEM: {0}")]
    InvalidPem(#[from] pfxview_pem::error::Error),
    #[error("invalid certificate: {0}")]
    InvalidCertificate(#[from] pfxview_x509::error::Error),
    #[error(transparent)]
    Pkcs12(#[from] pfxview_pkcs12::error::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
