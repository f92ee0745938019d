use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::argument;
use crate::session::Session;

/// Handles the TYPE FTP command.
///
/// `A`, `I` and `L 8` are accepted. Bytes always travel unmodified, so the
/// type is recorded for the client's benefit only.
pub struct TypeHandler;

impl CommandHandler for TypeHandler {
    fn parse(&self, session: &mut Session, _verb: &str, line: &str) -> Action {
        let arg = argument(line).to_ascii_uppercase();
        let parts: Vec<&str> = arg.split_whitespace().collect();

        let accepted = match parts.as_slice() {
            [] => return Action::Reply(Reply::syntax_error()),
            ["A"] | ["A", "N"] => "A",
            ["I"] => "I",
            ["L", "8"] => "L 8",
            _ => {
                return Action::Reply(Reply::new(
                    504,
                    "Command not implemented for that parameter.",
                ))
            }
        };

        session.type_ = accepted.to_string();
        Action::Reply(Reply::new(200, format!("Type set to {}.", accepted)))
    }
}
