use crate::constants::*;
use crate::core_tls::TlsConfig;
use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    /// Root jail; every session path resolves below it.
    pub root_dir: PathBuf,
    pub workers: usize,
    pub idle_timeout_secs: u64,
    pub data_connect_timeout_secs: u64,
    pub read_chunk_size: usize,
    pub download_chunk_size: usize,
    pub upload_chunk_size: usize,
    pub low_water_mark: usize,
    pub banner: String,
    /// Reject PORT addresses that differ from the control connection's peer.
    pub port_require_peer_ip: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tls: TlsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: String::from("0.0.0.0"),
            listen_port: DEFAULT_LISTEN_PORT,
            root_dir: PathBuf::from("/var/ftp"),
            workers: DEFAULT_WORKERS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            data_connect_timeout_secs: DEFAULT_DATA_CONNECT_TIMEOUT_SECS,
            read_chunk_size: DEFAULT_READ_CHUNK,
            download_chunk_size: DEFAULT_DOWNLOAD_CHUNK,
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            banner: String::from(DEFAULT_BANNER),
            port_require_peer_ip: false,
        }
    }
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn data_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.data_connect_timeout_secs)
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        if server.workers == 0 {
            bail!("server.workers must be at least 1");
        }
        if server.read_chunk_size == 0
            || server.download_chunk_size == 0
            || server.upload_chunk_size == 0
        {
            bail!("chunk sizes must be greater than zero");
        }
        if server.low_water_mark < server.download_chunk_size {
            bail!("server.low_water_mark must be at least server.download_chunk_size");
        }
        if server.idle_timeout_secs == 0 || server.data_connect_timeout_secs == 0 {
            bail!("timeouts must be greater than zero");
        }
        Ok(())
    }
}

// Helper function to log configuration options
pub fn log_config(config: &Config) {
    info!(
        "  Listen Address: {}:{}",
        config.server.listen_address, config.server.listen_port
    );
    info!("  Root Directory: {}", config.server.root_dir.display());
    info!("  Workers: {}", config.server.workers);
    info!("  Idle Timeout: {}s", config.server.idle_timeout_secs);
    info!(
        "  Download Chunk: {} KB, Upload Chunk: {} KB, Low-Water Mark: {} KB",
        config.server.download_chunk_size / 1024,
        config.server.upload_chunk_size / 1024,
        config.server.low_water_mark / 1024
    );
    info!(
        "  TLS: {}",
        if config.tls.enabled { "enabled" } else { "disabled" }
    );
}
