use crate::core_network::network::handle_connection;
use crate::server::ServerContext;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::LocalSet;

/// Messages from the accept loop to a worker thread.
#[derive(Debug)]
pub enum WorkerMsg {
    /// A freshly accepted control connection, detached from the accepting
    /// runtime so it can be registered on the worker's reactor.
    Session {
        stream: std::net::TcpStream,
        peer: SocketAddr,
        id: u64,
    },
    /// Breaks the worker's event loop.
    Stop,
}

/// One event-loop thread: a current-thread runtime driving a `LocalSet`.
///
/// Every session and data task on the worker is spawned with
/// `spawn_local` and never leaves this thread.
pub struct Worker {
    index: usize,
    sender: UnboundedSender<WorkerMsg>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(index: usize, ctx: Arc<ServerContext>) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .with_context(|| format!("Failed to build runtime for worker {}", index))?;

        let thread = std::thread::Builder::new()
            .name(format!("xftpd-worker-{}", index))
            .spawn(move || {
                let local = LocalSet::new();
                local.block_on(&runtime, worker_loop(index, receiver, ctx));
                debug!("Worker {} event loop stopped", index);
            })
            .with_context(|| format!("Failed to spawn worker thread {}", index))?;

        Ok(Self {
            index,
            sender,
            thread: Some(thread),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Queues a message; fails only if the worker thread has exited.
    pub fn send(&self, msg: WorkerMsg) -> Result<()> {
        self.sender
            .send(msg)
            .map_err(|_| anyhow!("worker {} is no longer running", self.index))
    }

    /// Sends the stop sentinel and joins the thread.
    pub fn stop(&mut self) {
        let _ = self.sender.send(WorkerMsg::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Worker {} panicked", self.index);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn worker_loop(
    index: usize,
    mut receiver: UnboundedReceiver<WorkerMsg>,
    ctx: Arc<ServerContext>,
) {
    info!("Worker {} started", index);
    while let Some(msg) = receiver.recv().await {
        match msg {
            WorkerMsg::Session { stream, peer, id } => {
                let stream = match TcpStream::from_std(stream) {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!("#{} Worker {} could not adopt socket: {}", id, index, e);
                        continue;
                    }
                };
                debug!("#{} Session from {} bound to worker {}", id, peer, index);
                let ctx = Arc::clone(&ctx);
                tokio::task::spawn_local(async move {
                    if let Err(e) = handle_connection(stream, peer, id, ctx).await {
                        warn!("#{} Connection error: {}", id, e);
                    }
                    info!("#{} Connection closed for {}", id, peer);
                });
            }
            WorkerMsg::Stop => break,
        }
    }
    info!("Worker {} stopping", index);
}

/// Fixed set of workers fed round-robin.
pub struct WorkerPool {
    workers: Vec<Worker>,
    last: usize,
}

impl WorkerPool {
    pub fn start(count: usize, ctx: Arc<ServerContext>) -> Result<Self> {
        if count == 0 {
            return Err(anyhow!("worker pool needs at least one worker"));
        }
        let workers = (0..count)
            .map(|index| Worker::spawn(index, Arc::clone(&ctx)))
            .collect::<Result<Vec<_>>>()?;
        info!("Started {} workers", count);
        Ok(Self {
            workers,
            last: count - 1,
        })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Advances the round-robin cursor: `(last + 1) % n`.
    pub fn next_index(&mut self) -> usize {
        self.last = (self.last + 1) % self.workers.len();
        self.last
    }

    /// Hands an accepted connection to the next worker.
    pub fn dispatch(&mut self, stream: TcpStream, peer: SocketAddr, id: u64) -> Result<usize> {
        let stream = stream
            .into_std()
            .with_context(|| format!("Failed to detach socket from {}", peer))?;
        let index = self.next_index();
        self.workers[index].send(WorkerMsg::Session { stream, peer, id })?;
        Ok(index)
    }

    /// Stops every worker and joins its thread. Blocks.
    pub fn shutdown(mut self) {
        for worker in &mut self.workers {
            worker.stop();
        }
        info!("All workers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn context() -> (tempfile::TempDir, Arc<ServerContext>) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.server.root_dir = dir.path().to_path_buf();
        let ctx = ServerContext::new(&config).unwrap();
        (dir, Arc::new(ctx))
    }

    #[test]
    fn round_robin_wraps_around() {
        let (_dir, ctx) = context();
        let mut pool = WorkerPool::start(3, ctx).unwrap();
        let picks: Vec<usize> = (0..7).map(|_| pool.next_index()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
        pool.shutdown();
    }

    #[test]
    fn empty_pool_is_rejected() {
        let (_dir, ctx) = context();
        assert!(WorkerPool::start(0, ctx).is_err());
    }

    #[test]
    fn stopped_worker_refuses_work() {
        let (_dir, ctx) = context();
        let mut worker = Worker::spawn(0, ctx).unwrap();
        worker.stop();
        assert!(worker.send(WorkerMsg::Stop).is_err());
        assert_eq!(worker.index(), 0);
    }
}
