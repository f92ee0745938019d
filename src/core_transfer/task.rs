use crate::core_ftpcommand::reply::Reply;
use crate::core_network::port::connect_to_port;
use crate::core_network::transport::Transport;
use crate::core_tls::TlsConnection;
use crate::core_transfer::channel::OutboundQueue;
use crate::core_transfer::download::Download;
use crate::core_transfer::error::{is_transient, TransferError};
use crate::core_transfer::listing::Listing;
use crate::core_transfer::state::TransferState;
use crate::core_transfer::upload::Upload;
use log::{debug, info, warn};
use std::net::SocketAddrV4;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Server writes to the data socket (LIST, RETR).
    Send,
    /// Server reads from the data socket (STOR).
    Receive,
}

/// Outcome of one `on_writable` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Eof,
}

#[derive(Debug)]
pub enum DataEvent {
    Connected,
    /// Every byte has been handed to the socket, or the peer finished sending.
    Complete,
    Timeout,
    Error(TransferError),
}

/// Callbacks a data command implements to stream one transfer.
///
/// Calls are synchronous and bounded: each one moves at most one chunk so a
/// large transfer never monopolises the worker it runs on.
pub trait DataHandler {
    fn name(&self) -> &'static str;

    fn direction(&self) -> Direction;

    /// Queues the next chunk for sending.
    fn on_writable(&mut self, _queue: &mut OutboundQueue) -> Result<Step, TransferError> {
        Ok(Step::Eof)
    }

    /// Consumes bytes read from the data socket.
    fn on_readable(&mut self, _data: &[u8]) -> Result<(), TransferError> {
        Ok(())
    }

    /// Runs once the stream has ended, before the transfer counts as complete.
    fn finish(&mut self) -> Result<(), TransferError> {
        Ok(())
    }

    /// Returns the control reply an event produces, if any.
    fn on_event(&mut self, event: DataEvent) -> Option<Reply>;
}

/// The data commands, each owning its own file handle or payload.
#[derive(Debug)]
pub enum DataTask {
    Listing(Listing),
    Download(Download),
    Upload(Upload),
}

impl DataTask {
    fn handler(&mut self) -> &mut dyn DataHandler {
        match self {
            DataTask::Listing(task) => task,
            DataTask::Download(task) => task,
            DataTask::Upload(task) => task,
        }
    }
}

/// Everything a data task needs from its session, copied out at spawn time.
#[derive(Debug, Clone)]
pub struct TransferContext {
    pub session_id: u64,
    pub endpoint: SocketAddrV4,
    /// Present only when the data channel must be protected.
    pub tls: Option<TlsConnection>,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub low_water_mark: usize,
    pub receive_chunk: usize,
    pub replies: UnboundedSender<Reply>,
}

/// Drives `task` from connect to completion and posts the final reply.
pub async fn run(mut task: DataTask, ctx: TransferContext) {
    let handler = task.handler();
    let name = handler.name();
    let mut state = TransferState::Idle;

    let reply = match drive(handler, &ctx, &mut state).await {
        Ok(reply) => {
            info!("#{} {} transfer complete", ctx.session_id, name);
            reply
        }
        Err(e) => {
            warn!("#{} {} transfer failed in {:?}: {}", ctx.session_id, name, state, e);
            let _ = state.advance(TransferState::Failed);
            let event = match e {
                TransferError::Timeout => DataEvent::Timeout,
                other => DataEvent::Error(other),
            };
            handler.on_event(event)
        }
    };

    if let Some(reply) = reply {
        // The session may already be gone; nobody is left to tell.
        let _ = ctx.replies.send(reply);
    }
}

async fn drive(
    handler: &mut dyn DataHandler,
    ctx: &TransferContext,
    state: &mut TransferState,
) -> Result<Option<Reply>, TransferError> {
    state.advance(TransferState::Connecting)?;
    let mut transport =
        connect_to_port(ctx.endpoint, ctx.tls.as_ref(), ctx.connect_timeout).await?;
    state.advance(TransferState::Streaming)?;
    if let Some(reply) = handler.on_event(DataEvent::Connected) {
        let _ = ctx.replies.send(reply);
    }

    match handler.direction() {
        Direction::Send => send_loop(handler, ctx, state, &mut transport).await?,
        Direction::Receive => receive_loop(handler, ctx, state, &mut transport).await?,
    }

    handler.finish()?;
    state.advance(TransferState::Complete)?;
    Ok(handler.on_event(DataEvent::Complete))
}

async fn send_loop(
    handler: &mut dyn DataHandler,
    ctx: &TransferContext,
    state: &mut TransferState,
    transport: &mut Transport,
) -> Result<(), TransferError> {
    let mut queue = OutboundQueue::new();
    let mut sent: u64 = 0;

    loop {
        // Read ahead only while the socket keeps up.
        while *state == TransferState::Streaming && queue.len() < ctx.low_water_mark {
            if handler.on_writable(&mut queue)? == Step::Eof {
                state.advance(TransferState::Draining)?;
            }
        }

        if queue.is_empty() {
            break;
        }

        let written = match timeout(ctx.idle_timeout, transport.write(queue.front())).await {
            Err(_) => return Err(TransferError::Timeout),
            Ok(Ok(0)) => return Err(TransferError::UnexpectedEof),
            Ok(Ok(n)) => n,
            Ok(Err(e)) if is_transient(&e) => continue,
            Ok(Err(e)) => return Err(TransferError::from_send(e)),
        };
        queue.consume(written);
        sent += written as u64;
    }

    match timeout(ctx.idle_timeout, transport.flush()).await {
        Err(_) => return Err(TransferError::Timeout),
        Ok(Err(e)) => return Err(TransferError::from_send(e)),
        Ok(Ok(())) => {}
    }
    if let Err(e) = transport.shutdown().await {
        debug!("#{} data shutdown: {}", ctx.session_id, e);
    }
    debug!("#{} sent {} bytes", ctx.session_id, sent);
    Ok(())
}

async fn receive_loop(
    handler: &mut dyn DataHandler,
    ctx: &TransferContext,
    state: &mut TransferState,
    transport: &mut Transport,
) -> Result<(), TransferError> {
    let mut buffer = vec![0u8; ctx.receive_chunk.max(1)];
    let mut received: u64 = 0;

    loop {
        match timeout(ctx.idle_timeout, transport.read(&mut buffer)).await {
            Err(_) => return Err(TransferError::Timeout),
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                handler.on_readable(&buffer[..n])?;
                received += n as u64;
            }
            Ok(Err(e)) if is_transient(&e) => continue,
            Ok(Err(e)) => return Err(TransferError::Receive(e)),
        }
    }

    state.advance(TransferState::Draining)?;
    let _ = transport.shutdown().await;
    debug!("#{} received {} bytes", ctx.session_id, received);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    async fn data_listener() -> (TcpListener, SocketAddrV4) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = match listener.local_addr().unwrap() {
            std::net::SocketAddr::V4(v4) => v4,
            other => panic!("unexpected address {}", other),
        };
        (listener, addr)
    }

    fn context(
        endpoint: SocketAddrV4,
        low_water_mark: usize,
    ) -> (TransferContext, mpsc::UnboundedReceiver<Reply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = TransferContext {
            session_id: 7,
            endpoint,
            tls: None,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(5),
            low_water_mark,
            receive_chunk: 1024,
            replies: tx,
        };
        (ctx, rx)
    }

    #[tokio::test]
    async fn download_streams_whole_file_then_replies_226() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&payload)
            .unwrap();

        let (listener, addr) = data_listener().await;
        // Small chunk and low-water mark force many read-ahead rounds.
        let task = DataTask::Download(Download::open(&path, 0, 4096).unwrap());
        let (ctx, mut replies) = context(addr, 16 * 1024);

        let client = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        run(task, ctx).await;
        let received = client.await.unwrap();
        assert_eq!(received, payload);
        assert_eq!(replies.recv().await.unwrap().code(), 226);
    }

    #[tokio::test]
    async fn upload_writes_until_peer_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("up.txt");
        let (listener, addr) = data_listener().await;
        let task = DataTask::Upload(Upload::create(&path, 0).unwrap());
        let (ctx, mut replies) = context(addr, 1024);

        let client = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"uploaded bytes").await.unwrap();
            socket.shutdown().await.unwrap();
        });

        run(task, ctx).await;
        client.await.unwrap();
        assert_eq!(replies.recv().await.unwrap().code(), 226);
        assert_eq!(std::fs::read(&path).unwrap(), b"uploaded bytes");
    }

    #[tokio::test]
    async fn refused_connection_replies_425() {
        let (listener, addr) = data_listener().await;
        drop(listener);
        let task = DataTask::Listing(Listing::from_payload(b"x\r\n".to_vec()));
        let (ctx, mut replies) = context(addr, 1024);

        run(task, ctx).await;
        assert_eq!(
            replies.recv().await.unwrap(),
            Reply::new(425, "Can't build data connection.")
        );
    }

    #[tokio::test]
    async fn silent_uploader_times_out_and_keeps_partial_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.txt");
        let (listener, addr) = data_listener().await;
        let task = DataTask::Upload(Upload::create(&path, 0).unwrap());
        let (mut ctx, mut replies) = context(addr, 1024);
        ctx.idle_timeout = Duration::from_millis(200);

        let client = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"partial").await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        run(task, ctx).await;
        let reply = replies.recv().await.unwrap();
        assert_eq!(reply, Reply::new(426, "Transfer timeout; connection closed."));
        assert_eq!(std::fs::read(&path).unwrap(), b"partial");
        client.abort();
    }
}
