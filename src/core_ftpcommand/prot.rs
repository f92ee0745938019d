use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::argument;
use crate::session::{DataProtection, Session};
use log::debug;

/// Handles the PROT FTP command.
///
/// `P` protects data connections opened afterwards, `C` clears protection.
/// Protection only takes effect once the control channel runs over TLS.
pub struct ProtHandler;

impl CommandHandler for ProtHandler {
    fn parse(&self, session: &mut Session, _verb: &str, line: &str) -> Action {
        let level = argument(line).to_ascii_uppercase();
        let reply = match level.as_str() {
            "P" => {
                session.data_protection = DataProtection::Private;
                Reply::new(200, "Protection level set to Private")
            }
            "C" => {
                session.data_protection = DataProtection::Clear;
                Reply::new(200, "Protection level set to Clear")
            }
            "S" | "E" => Reply::new(504, "Unsupported protection level"),
            _ => Reply::syntax_error(),
        };
        debug!("#{} PROT {} -> {}", session.id, level, reply.code());
        Action::Reply(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::session_at;

    fn prot(session: &mut Session, line: &str) -> u16 {
        match ProtHandler.parse(session, "PROT", line) {
            Action::Reply(reply) => reply.code(),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn levels_map_to_replies() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_at(dir.path());
        assert_eq!(prot(&mut session, "PROT P\r\n"), 200);
        assert_eq!(session.data_protection, DataProtection::Private);
        assert_eq!(prot(&mut session, "PROT c\r\n"), 200);
        assert_eq!(session.data_protection, DataProtection::Clear);
        assert_eq!(prot(&mut session, "PROT S\r\n"), 504);
        assert_eq!(prot(&mut session, "PROT E\r\n"), 504);
        assert_eq!(prot(&mut session, "PROT X\r\n"), 501);
        assert_eq!(prot(&mut session, "PROT\r\n"), 501);
    }
}
