use crate::core_ftpcommand::handlers::Action;
use crate::core_ftpcommand::reply::Reply;
use crate::core_network::codec::LineCodec;
use crate::core_network::transport::Transport;
use crate::core_tls::TlsError;
use crate::core_transfer::{self, DataTask, TransferContext};
use crate::server::ServerContext;
use crate::session::{Session, TransportMode};
use log::{debug, info, warn};
use std::io;
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

/// The data task currently bound to a session.
///
/// Dropping it aborts the task, which closes its socket and file handle.
struct ActiveTransfer {
    handle: JoinHandle<()>,
}

impl ActiveTransfer {
    fn spawn(task: DataTask, ctx: TransferContext) -> Self {
        Self {
            handle: tokio::task::spawn_local(core_transfer::run(task, ctx)),
        }
    }
}

impl Drop for ActiveTransfer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// What the read loop does after a batch of commands.
enum Flow {
    Continue,
    Close,
}

/// Serves one control connection until QUIT, EOF, error or idle timeout.
///
/// Must run inside a `LocalSet`: data tasks are spawned onto the same
/// worker thread as the session that owns them.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    id: u64,
    ctx: Arc<ServerContext>,
) -> io::Result<()> {
    let config = &ctx.config;
    let mut transport = Transport::Plain(stream);
    let mut codec = LineCodec::new(config.read_chunk_size);
    let mut session = Session::new(id, peer, ctx.root.clone(), config, ctx.tls.is_some());
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Reply>();
    let mut active: Option<ActiveTransfer> = None;
    let mut buffer = vec![0u8; config.read_chunk_size.max(1)];

    send_reply(&mut transport, id, &Reply::new(220, config.banner.as_str())).await?;

    let idle = sleep(config.idle_timeout());
    tokio::pin!(idle);

    loop {
        tokio::select! {
            read = transport.read(&mut buffer) => {
                let n = match read {
                    Ok(0) => {
                        info!(
                            "#{} Client {} disconnected ({})",
                            id,
                            peer,
                            if transport.is_tls() { "TLS" } else { "plain" }
                        );
                        break;
                    }
                    Ok(n) => n,
                    Err(e) if crate::core_transfer::error::is_transient(&e) => continue,
                    Err(e) => {
                        warn!("#{} Control connection error from {}: {}", id, peer, e);
                        break;
                    }
                };
                idle.as_mut().reset(Instant::now() + config.idle_timeout());
                codec.extend(&buffer[..n]);

                let flow = process_lines(
                    &ctx,
                    &mut session,
                    &mut transport,
                    &mut codec,
                    &mut active,
                    &reply_tx,
                )
                .await?;
                if let Flow::Close = flow {
                    break;
                }

                if let Err(e) = codec.check_overflow() {
                    warn!("#{} {}", id, e);
                    send_reply(&mut transport, id, &Reply::new(500, "Command line too long.")).await?;
                }
            }
            Some(reply) = reply_rx.recv() => {
                send_reply(&mut transport, id, &reply).await?;
            }
            _ = transfer_finished(&mut active), if active.is_some() => {
                active = None;
                idle.as_mut().reset(Instant::now() + config.idle_timeout());
            }
            _ = &mut idle, if active.is_none() => {
                info!("#{} Idle timeout for {}", id, peer);
                let reply = Reply::new(421, "Service closing control connection due to timeout.");
                // Best effort; the peer may already be gone.
                let _ = send_reply(&mut transport, id, &reply).await;
                break;
            }
        }
    }

    drop(active);
    // Replies from a transfer that finished alongside QUIT still go out.
    while let Ok(reply) = reply_rx.try_recv() {
        if send_reply(&mut transport, id, &reply).await.is_err() {
            break;
        }
    }
    let _ = transport.shutdown().await;
    Ok(())
}

/// Dispatches every complete line in the codec, in order.
async fn process_lines(
    ctx: &ServerContext,
    session: &mut Session,
    transport: &mut Transport,
    codec: &mut LineCodec,
    active: &mut Option<ActiveTransfer>,
    reply_tx: &UnboundedSender<Reply>,
) -> io::Result<Flow> {
    let id = session.id;

    while let Some(line) = codec.next_line() {
        if line.verb == "PASS" {
            debug!("#{} <- PASS ****", id);
        } else {
            debug!("#{} <- {}", id, line.raw.trim_end());
        }

        match ctx.registry.dispatch(session, &line) {
            Action::Reply(reply) => send_reply(transport, id, &reply).await?,
            Action::Transfer {
                preliminary,
                endpoint,
                task,
            } => {
                // A new data command replaces whatever was still running.
                if active.take().is_some() {
                    debug!("#{} Discarding previous data connection", id);
                }
                send_reply(transport, id, &preliminary).await?;
                let transfer = transfer_context(ctx, session, endpoint, reply_tx.clone());
                *active = Some(ActiveTransfer::spawn(task, transfer));
            }
            Action::UpgradeTls(reply) => {
                send_reply(transport, id, &reply).await?;
                // Nothing after AUTH is read as plaintext; the handshake
                // consumes whatever is still buffered.
                return match upgrade_control(ctx, session, transport, codec).await {
                    Ok(()) => Ok(Flow::Continue),
                    Err(e) => {
                        warn!("#{} TLS negotiation failed: {}", id, e);
                        Ok(Flow::Close)
                    }
                };
            }
            Action::Close(reply) => {
                send_reply(transport, id, &reply).await?;
                return Ok(Flow::Close);
            }
        }
    }
    Ok(Flow::Continue)
}

async fn upgrade_control(
    ctx: &ServerContext,
    session: &mut Session,
    transport: &mut Transport,
    codec: &mut LineCodec,
) -> Result<(), TlsError> {
    let tls = ctx.tls.as_ref().ok_or(TlsError::TlsNotConfigured)?;
    let stream = transport.take_plain().ok_or(TlsError::NotPlainTransport)?;
    session.transport_mode = TransportMode::TlsNegotiating;

    let buffered = codec.take_remaining();
    let stream = tls
        .accept_tls(stream, buffered, ctx.config.data_connect_timeout())
        .await?;

    *transport = Transport::Tls(Box::new(stream));
    session.transport_mode = TransportMode::TlsEstablished;
    info!("#{} Control connection secured", session.id);
    Ok(())
}

fn transfer_context(
    ctx: &ServerContext,
    session: &Session,
    endpoint: SocketAddrV4,
    replies: UnboundedSender<Reply>,
) -> TransferContext {
    TransferContext {
        session_id: session.id,
        endpoint,
        tls: if session.data_channel_private() {
            ctx.tls.clone()
        } else {
            None
        },
        connect_timeout: ctx.config.data_connect_timeout(),
        idle_timeout: ctx.config.idle_timeout(),
        low_water_mark: ctx.config.low_water_mark,
        receive_chunk: session.upload_chunk_size,
        replies,
    }
}

async fn transfer_finished(active: &mut Option<ActiveTransfer>) {
    match active {
        Some(transfer) => {
            let _ = (&mut transfer.handle).await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn send_reply(transport: &mut Transport, id: u64, reply: &Reply) -> io::Result<()> {
    debug!("#{} -> {}", id, reply);
    transport.write_all(reply.to_line().as_bytes()).await?;
    transport.flush().await
}
