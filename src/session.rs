use crate::config::ServerConfig;
use crate::core_ftpcommand::reply::Reply;
use crate::helpers::{self, PathError};
use std::net::{SocketAddr, SocketAddrV4};
use std::path::PathBuf;

/// Control-channel protection, per RFC 4217.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Plain,
    AuthRequested,
    TlsNegotiating,
    TlsEstablished,
}

/// Data-channel protection level chosen with PROT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataProtection {
    Clear,
    Private,
}

/// State of one control connection.
///
/// Owned by the worker thread that services the connection; command
/// handlers receive it by `&mut` and never keep it.
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    pub peer: SocketAddr,
    pub username: Option<String>,
    pub is_authenticated: bool,
    /// Always absolute and `/`-terminated, relative to `root`.
    pub current_dir: String,
    pub root: PathBuf,
    pub data_endpoint: Option<SocketAddrV4>,
    pub transport_mode: TransportMode,
    pub data_protection: DataProtection,
    /// One-shot REST offset for the next RETR/STOR.
    pub file_offset: Option<u64>,
    pub type_: String,
    pub tls_available: bool,
    pub download_chunk_size: usize,
    pub upload_chunk_size: usize,
    pub port_require_peer_ip: bool,
}

impl Session {
    pub fn new(
        id: u64,
        peer: SocketAddr,
        root: PathBuf,
        config: &ServerConfig,
        tls_available: bool,
    ) -> Self {
        Self {
            id,
            peer,
            username: None,
            is_authenticated: false,
            current_dir: String::from("/"),
            root,
            data_endpoint: None,
            transport_mode: TransportMode::Plain,
            data_protection: DataProtection::Clear,
            file_offset: None,
            type_: "A".to_string(),
            tls_available,
            download_chunk_size: config.download_chunk_size,
            upload_chunk_size: config.upload_chunk_size,
            port_require_peer_ip: config.port_require_peer_ip,
        }
    }

    /// Whether data connections must be wrapped in TLS.
    pub fn data_channel_private(&self) -> bool {
        self.transport_mode == TransportMode::TlsEstablished
            && self.data_protection == DataProtection::Private
    }

    /// Resolves a file argument against the current directory.
    pub fn resolve_file(&self, name: &str) -> Result<PathBuf, PathError> {
        let virtual_path = helpers::resolve_virtual(&self.current_dir, name);
        if virtual_path == "/" {
            return Err(PathError::NotAFileName(name.to_string()));
        }
        let physical = helpers::to_physical(&self.root, &virtual_path);
        helpers::ensure_within_root(&self.root, &physical)?;
        Ok(physical)
    }

    /// Resolves a directory argument; returns the `/`-terminated virtual path
    /// and its physical location.
    pub fn resolve_directory(&self, arg: &str) -> Result<(String, PathBuf), PathError> {
        let virtual_path = helpers::as_directory(&helpers::resolve_virtual(&self.current_dir, arg));
        let physical = helpers::to_physical(&self.root, &virtual_path);
        helpers::ensure_within_root(&self.root, &physical)?;
        Ok((virtual_path, physical))
    }

    /// Who the session acts as, for transfer logs.
    pub fn user_label(&self) -> &str {
        match (&self.username, self.is_authenticated) {
            (Some(name), true) => name,
            _ => "anonymous",
        }
    }

    /// The data endpoint set by PORT, or the reply explaining its absence.
    pub fn require_data_endpoint(&self) -> Result<SocketAddrV4, Reply> {
        self.data_endpoint
            .ok_or_else(|| Reply::new(425, "Use PORT first."))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::session_at;
    use super::*;

    #[test]
    fn new_session_starts_plain_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_at(dir.path());
        assert_eq!(session.current_dir, "/");
        assert_eq!(session.transport_mode, TransportMode::Plain);
        assert!(!session.data_channel_private());
        assert!(session.file_offset.is_none());
    }

    #[test]
    fn private_data_requires_established_tls() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_at(dir.path());
        session.data_protection = DataProtection::Private;
        assert!(!session.data_channel_private());
        session.transport_mode = TransportMode::TlsEstablished;
        assert!(session.data_channel_private());
    }

    #[test]
    fn file_resolution_uses_current_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_at(dir.path());
        session.current_dir = "/pub/".to_string();
        let path = session.resolve_file("a.txt").unwrap();
        assert_eq!(path, session.root.join("pub/a.txt"));
        assert!(session.resolve_file("..").is_err());
    }

    #[test]
    fn user_label_needs_a_completed_login() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_at(dir.path());
        assert_eq!(session.user_label(), "anonymous");
        session.username = Some("carol".to_string());
        assert_eq!(session.user_label(), "anonymous");
        session.is_authenticated = true;
        assert_eq!(session.user_label(), "carol");
    }

    #[test]
    fn missing_port_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_at(dir.path());
        assert_eq!(session.require_data_endpoint().unwrap_err().code(), 425);
    }
}
