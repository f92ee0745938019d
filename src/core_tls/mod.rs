// SSL/TLS support: AUTH upgrades the control channel, PROT selects data-channel protection.

pub mod error;
pub mod tls_config;
pub mod tls_connection;

pub use error::TlsError;
pub use tls_config::TlsConfig;
pub use tls_connection::{ServerTlsStream, TlsConnection};
