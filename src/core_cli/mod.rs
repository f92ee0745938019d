use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "xftpd", about = "An active-mode FTP server with explicit TLS.")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listening port, overrides the configuration file
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Root directory served to clients, overrides the configuration file
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Number of worker threads, overrides the configuration file
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.listen_port = port;
        }
        if let Some(root) = &self.root {
            config.server.root_dir = root.clone();
        }
        if let Some(workers) = self.workers {
            config.server.workers = workers;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_file_values() {
        let cli = Cli::parse_from(["xftpd", "--port", "2121", "--root", "/srv/ftp", "-w", "2"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.server.listen_port, 2121);
        assert_eq!(config.server.root_dir, PathBuf::from("/srv/ftp"));
        assert_eq!(config.server.workers, 2);
        assert!(!cli.verbose);
    }

    #[test]
    fn absent_flags_keep_configuration() {
        let cli = Cli::parse_from(["xftpd", "-v"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.server.listen_port, 21);
        assert!(cli.verbose);
        assert!(cli.config.is_none());
    }
}
