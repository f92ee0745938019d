use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::session::Session;

/// PBSZ: the protection buffer size is always 0 for stream mode.
pub struct PbszHandler;

impl CommandHandler for PbszHandler {
    fn parse(&self, _session: &mut Session, _verb: &str, _line: &str) -> Action {
        Action::Reply(Reply::new(200, "PBSZ=0"))
    }
}
