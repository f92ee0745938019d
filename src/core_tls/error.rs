// Error handling for the TLS module
use crate::core_ftpcommand::reply::Reply;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("Failed to load SSL certificate: {0}")]
    CertificateLoadError(String),

    #[error("Failed to load SSL private key: {0}")]
    PrivateKeyLoadError(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshakeError(String),

    #[error("TLS handshake timed out")]
    TlsHandshakeTimeout,

    #[error("TLS configuration error: {0}")]
    TlsConfigError(String),

    #[error("TLS not configured")]
    TlsNotConfigured,

    #[error("Transport is not a plain TCP stream")]
    NotPlainTransport,
}

impl TlsError {
    pub fn to_ftp_response(&self) -> Reply {
        match self {
            TlsError::TlsNotConfigured => Reply::new(550, "SSL/TLS not available."),
            TlsError::TlsHandshakeTimeout => {
                Reply::new(421, "TLS negotiation timeout; closing connection.")
            }
            _ => Reply::new(550, "SSL/TLS initialization failed."),
        }
    }
}
