use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::warn;
use std::io::Write;
use std::path::Path;
use xftpd::core_cli::Cli;
use xftpd::{server, Config};

const DEFAULT_CONFIG_PATH: &str = "/etc/xftpd.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Initialize the logger with a custom format
    let default_filter = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();

    // An explicit path must load; the default one may be absent
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::load_from_file(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => {
            warn!(
                "No configuration file at {}, using defaults",
                DEFAULT_CONFIG_PATH
            );
            Config::default()
        }
    };
    args.apply(&mut config);

    // Run the FTP server
    server::run(config).await?;

    Ok(())
}
