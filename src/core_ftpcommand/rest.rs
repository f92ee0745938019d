use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::trailing_token;
use crate::session::Session;
use log::debug;

/// Handles the REST FTP command.
///
/// Stores a one-shot byte offset for the next RETR or STOR. The offset is
/// taken back off the session as soon as that command is parsed, whatever
/// its outcome.
pub struct RestHandler;

impl CommandHandler for RestHandler {
    fn parse(&self, session: &mut Session, _verb: &str, line: &str) -> Action {
        let offset = match trailing_token(line).and_then(|t| t.parse::<u64>().ok()) {
            Some(offset) => offset,
            None => return Action::Reply(Reply::syntax_error()),
        };

        debug!("#{} REST offset set to {}", session.id, offset);
        session.file_offset = Some(offset);
        Action::Reply(Reply::new(
            350,
            format!(
                "Restarting at {}. Send STORE or RETRIEVE to initiate transfer.",
                offset
            ),
        ))
    }
}
