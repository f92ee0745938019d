use crate::config::{log_config, Config, ServerConfig};
use crate::core_ftpcommand::handlers::{initialize_command_handlers, CommandRegistry};
use crate::core_network::worker::WorkerPool;
use crate::core_tls::TlsConnection;
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Immutable state shared by every worker.
pub struct ServerContext {
    pub config: ServerConfig,
    /// Canonical root jail.
    pub root: PathBuf,
    pub registry: CommandRegistry,
    /// Present when TLS is enabled; AUTH fails closed otherwise.
    pub tls: Option<TlsConnection>,
}

impl ServerContext {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let root = config.server.root_dir.canonicalize().with_context(|| {
            format!(
                "Root directory {} is not accessible",
                config.server.root_dir.display()
            )
        })?;

        let tls = if config.tls.enabled {
            Some(TlsConnection::new(&config.tls).context("Failed to initialise TLS")?)
        } else {
            None
        };

        let registry = initialize_command_handlers().context("Failed to build command table")?;

        Ok(Self {
            config: config.server.clone(),
            root,
            registry,
            tls,
        })
    }
}

/// The accept loop and the worker pool behind it.
pub struct Server {
    listener: TcpListener,
    pool: WorkerPool,
    next_id: u64,
}

impl Server {
    pub async fn bind(config: &Config) -> Result<Self> {
        let ctx = Arc::new(ServerContext::new(config)?);

        let addr = format!(
            "{}:{}",
            config.server.listen_address, config.server.listen_port
        );
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        let pool = WorkerPool::start(config.server.workers, ctx)?;
        Ok(Self {
            listener,
            pool,
            next_id: 0,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` resolves, then stops the workers.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    self.next_id += 1;
                    let id = self.next_id;
                    match self.pool.dispatch(socket, peer, id) {
                        Ok(worker) => info!("#{} New connection from {} on worker {}", id, peer, worker),
                        Err(e) => error!("#{} Failed to hand off connection from {}: {:#}", id, peer, e),
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        let Server { listener, pool, .. } = self;
        drop(listener);
        tokio::task::spawn_blocking(move || pool.shutdown())
            .await
            .context("Worker shutdown failed")?;
        Ok(())
    }
}

/// Runs the FTP server until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    info!("Starting server with config:");
    log_config(&config);

    let server = Server::bind(&config).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}
