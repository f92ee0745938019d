use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::session::Session;
use log::info;

/// Any password is accepted once USER named someone.
pub struct PassHandler;

impl CommandHandler for PassHandler {
    fn parse(&self, session: &mut Session, _verb: &str, _line: &str) -> Action {
        match &session.username {
            Some(username) => {
                info!("#{} User {} logged in", session.id, username);
                session.is_authenticated = true;
                Action::Reply(Reply::new(230, "User logged in, proceed."))
            }
            None => Action::Reply(Reply::new(503, "Login with USER first.")),
        }
    }
}
