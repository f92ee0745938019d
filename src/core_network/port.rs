use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::argument;
use crate::core_network::transport::Transport;
use crate::core_tls::TlsConnection;
use crate::core_transfer::TransferError;
use crate::session::Session;
use log::{debug, info, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Parses `h1,h2,h3,h4,p1,p2` into an IPv4 endpoint.
///
/// Exactly six decimal fields in `0..=255` are required. The unspecified
/// address and port 0 are rejected.
pub fn parse_port_argument(arg: &str) -> Result<SocketAddrV4, Reply> {
    let parts: Vec<&str> = arg.split(',').map(str::trim).collect();
    if parts.len() != 6 {
        return Err(Reply::syntax_error());
    }

    let fields: Result<Vec<u8>, _> = parts.iter().map(|x| x.parse::<u8>()).collect();
    let fields = fields.map_err(|_| Reply::syntax_error())?;

    let ip = Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]);
    let port = (fields[4] as u16) << 8 | fields[5] as u16;
    if ip.is_unspecified() || port == 0 {
        return Err(Reply::syntax_error());
    }
    Ok(SocketAddrV4::new(ip, port))
}

/// Handles the PORT (Active Mode) FTP command.
///
/// Only records the endpoint; the data connection is dialled when a LIST,
/// RETR or STOR needs it.
pub struct PortHandler;

impl CommandHandler for PortHandler {
    fn parse(&self, session: &mut Session, _verb: &str, line: &str) -> Action {
        let endpoint = match parse_port_argument(argument(line)) {
            Ok(endpoint) => endpoint,
            Err(reply) => {
                warn!("#{} Malformed PORT argument: {:?}", session.id, argument(line));
                return Action::Reply(reply);
            }
        };

        if session.port_require_peer_ip && IpAddr::V4(*endpoint.ip()) != session.peer.ip() {
            warn!(
                "#{} PORT {} does not match control peer {}",
                session.id, endpoint, session.peer
            );
            return Action::Reply(Reply::syntax_error());
        }

        info!("#{} Received PORT command with endpoint {}", session.id, endpoint);
        session.data_endpoint = Some(endpoint);
        Action::Reply(Reply::new(200, "Port command successful."))
    }
}

/// Opens the data connection to the client's PORT endpoint.
///
/// With `tls` set, the new socket is wrapped in the server role even though
/// the server dialled it. Connect and handshake each get `limit`.
pub async fn connect_to_port(
    endpoint: SocketAddrV4,
    tls: Option<&TlsConnection>,
    limit: Duration,
) -> Result<Transport, TransferError> {
    let stream = match timeout(limit, TcpStream::connect(endpoint)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(TransferError::Connect(endpoint, e)),
        Err(_) => return Err(TransferError::ConnectTimeout(endpoint)),
    };
    debug!("Data connection established with {}", endpoint);

    match tls {
        Some(tls) => {
            let stream = tls.accept_tls(stream, Vec::new(), limit).await?;
            debug!("Data connection to {} secured", endpoint);
            Ok(Transport::Tls(Box::new(stream)))
        }
        None => Ok(Transport::Plain(stream)),
    }
}
