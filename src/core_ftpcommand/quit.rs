use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::session::Session;
use log::info;

/// Handles the QUIT FTP command.
///
/// The control loop flushes the reply, cancels any running transfer and
/// closes the connection.
pub struct QuitHandler;

impl CommandHandler for QuitHandler {
    fn parse(&self, session: &mut Session, _verb: &str, _line: &str) -> Action {
        info!("#{} Client {} sent QUIT", session.id, session.peer);
        Action::Close(Reply::new(221, "Goodbye."))
    }
}
