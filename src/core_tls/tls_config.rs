// TLS configuration for explicit FTPS (AUTH TLS / PROT P)
use crate::core_tls::error::TlsError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Enables AUTH TLS on the control connection and PROT P on data connections.
    pub enabled: bool,

    /// PEM certificate chain.
    pub cert_file: PathBuf,

    /// PEM private key (PKCS#8 or RSA).
    pub key_file: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_file: PathBuf::from("etc/ssl/cert.pem"),
            key_file: PathBuf::from("etc/ssl/key.pem"),
        }
    }
}

impl TlsConfig {
    /// Checks that the certificate and key files exist when TLS is enabled.
    pub fn validate(&self) -> Result<(), TlsError> {
        if self.enabled {
            if !self.cert_file.exists() {
                return Err(TlsError::CertificateLoadError(format!(
                    "Certificate file not found: {:?}",
                    self.cert_file
                )));
            }

            if !self.key_file.exists() {
                return Err(TlsError::PrivateKeyLoadError(format!(
                    "Private key file not found: {:?}",
                    self.key_file
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_never_touches_the_filesystem() {
        let config = TlsConfig {
            enabled: false,
            cert_file: PathBuf::from("/nonexistent/cert.pem"),
            key_file: PathBuf::from("/nonexistent/key.pem"),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn enabled_config_requires_certificate() {
        let config = TlsConfig {
            enabled: true,
            cert_file: PathBuf::from("/nonexistent/cert.pem"),
            key_file: PathBuf::from("/nonexistent/key.pem"),
        };
        assert!(matches!(
            config.validate(),
            Err(TlsError::CertificateLoadError(_))
        ));
    }
}
