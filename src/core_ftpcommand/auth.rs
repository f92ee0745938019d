use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::argument;
use crate::core_tls::TlsError;
use crate::session::{Session, TransportMode};
use log::{info, warn};

/// Handles the AUTH FTP command (RFC 4217).
///
/// On success the session moves to `AuthRequested`; the control loop sends
/// 234 and runs the handshake over the same socket. A server without a TLS
/// context fails closed instead of answering 234.
pub struct AuthHandler;

impl CommandHandler for AuthHandler {
    fn parse(&self, session: &mut Session, _verb: &str, line: &str) -> Action {
        let mechanism = argument(line).to_ascii_uppercase();
        if mechanism.is_empty() {
            return Action::Reply(Reply::syntax_error());
        }
        if mechanism != "TLS" && mechanism != "SSL" && mechanism != "TLS-C" {
            return Action::Reply(Reply::new(504, "Unrecognized authentication type."));
        }
        if session.transport_mode != TransportMode::Plain {
            return Action::Reply(Reply::new(503, "TLS already negotiated."));
        }
        if !session.tls_available {
            warn!("#{} AUTH {} requested but TLS is not configured", session.id, mechanism);
            return Action::Close(TlsError::TlsNotConfigured.to_ftp_response());
        }

        info!("#{} AUTH {} accepted", session.id, mechanism);
        session.transport_mode = TransportMode::AuthRequested;
        Action::UpgradeTls(Reply::new(234, "Proceed with negotiation."))
    }
}
