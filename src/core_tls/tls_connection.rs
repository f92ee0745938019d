// TLS acceptor shared by every worker
use crate::core_network::transport::Rewind;
use crate::core_tls::error::TlsError;
use crate::core_tls::tls_config::TlsConfig;
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::{rustls, TlsAcceptor};

pub type ServerTlsStream = tokio_rustls::server::TlsStream<Rewind<TcpStream>>;

/// Immutable server-side TLS context.
///
/// Built once at startup and shared by reference with every worker. The
/// same acceptor serves the control channel (AUTH TLS) and data channels
/// (PROT P): the server always takes the TLS server role, even on data
/// connections where it is the TCP initiator.
#[derive(Clone)]
pub struct TlsConnection {
    tls_acceptor: TlsAcceptor,
}

impl std::fmt::Debug for TlsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnection").finish_non_exhaustive()
    }
}

impl TlsConnection {
    pub fn new(config: &TlsConfig) -> Result<Self, TlsError> {
        config.validate()?;

        let cert_chain = load_certificates(&config.cert_file)?;
        let private_key = load_private_key(&config.key_file)?;

        let server_config = rustls::ServerConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_single_cert(cert_chain, private_key)
            .map_err(|e| TlsError::TlsConfigError(e.to_string()))?;

        info!(
            "TLS context ready (certificate {:?}, key {:?})",
            config.cert_file, config.key_file
        );

        Ok(Self {
            tls_acceptor: TlsAcceptor::from(Arc::new(server_config)),
        })
    }

    /// Runs the server-side handshake over `stream`.
    ///
    /// `buffered` holds bytes already pulled off the socket by the plaintext
    /// reader; they are replayed to the handshake before any new socket read.
    pub async fn accept_tls(
        &self,
        stream: TcpStream,
        buffered: Vec<u8>,
        limit: Duration,
    ) -> Result<ServerTlsStream, TlsError> {
        debug!(
            "Starting TLS handshake ({} bytes replayed from plaintext buffer)",
            buffered.len()
        );
        let handshake = self.tls_acceptor.accept(Rewind::new(stream, buffered));
        match tokio::time::timeout(limit, handshake).await {
            Ok(Ok(tls_stream)) => Ok(tls_stream),
            Ok(Err(e)) => Err(TlsError::TlsHandshakeError(e.to_string())),
            Err(_) => Err(TlsError::TlsHandshakeTimeout),
        }
    }
}

fn load_certificates(path: &Path) -> Result<Vec<rustls::Certificate>, TlsError> {
    let file = File::open(path).map_err(|e| TlsError::CertificateLoadError(e.to_string()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .map_err(|e| TlsError::CertificateLoadError(e.to_string()))?;
    if certs.is_empty() {
        return Err(TlsError::CertificateLoadError(format!(
            "No certificate found in {:?}",
            path
        )));
    }
    Ok(certs.into_iter().map(rustls::Certificate).collect())
}

fn load_private_key(path: &Path) -> Result<rustls::PrivateKey, TlsError> {
    let pem = std::fs::read(path).map_err(|e| TlsError::PrivateKeyLoadError(e.to_string()))?;

    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut &pem[..])
        .map_err(|e| TlsError::PrivateKeyLoadError(e.to_string()))?;
    if keys.is_empty() {
        keys = rustls_pemfile::rsa_private_keys(&mut &pem[..])
            .map_err(|e| TlsError::PrivateKeyLoadError(e.to_string()))?;
    }

    match keys.pop() {
        Some(key) => Ok(rustls::PrivateKey(key)),
        None => Err(TlsError::PrivateKeyLoadError(
            "No private key found".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_files_are_fatal() {
        let config = TlsConfig {
            enabled: true,
            cert_file: "/nonexistent/cert.pem".into(),
            key_file: "/nonexistent/key.pem".into(),
        };
        assert!(TlsConnection::new(&config).is_err());
    }

    #[test]
    fn empty_certificate_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::File::create(&cert).unwrap();
        let mut key_file = std::fs::File::create(&key).unwrap();
        key_file.write_all(b"not a key").unwrap();

        let config = TlsConfig {
            enabled: true,
            cert_file: cert,
            key_file: key,
        };
        assert!(matches!(
            TlsConnection::new(&config),
            Err(TlsError::CertificateLoadError(_))
        ));
    }
}
