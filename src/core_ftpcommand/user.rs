use crate::constants::USERNAME_REGEX;
use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::argument;
use crate::session::Session;
use log::{info, warn};
use regex::Regex;

/// Handles the USER FTP command.
///
/// The username is only checked against a placeholder pattern; there is no
/// account database behind it.
pub struct UserHandler {
    pattern: Regex,
}

impl UserHandler {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(USERNAME_REGEX)?,
        })
    }
}

impl CommandHandler for UserHandler {
    fn parse(&self, session: &mut Session, _verb: &str, line: &str) -> Action {
        let username = argument(line);
        session.is_authenticated = false;

        if !self.pattern.is_match(username) {
            warn!("#{} Rejected username {:?}", session.id, username);
            session.username = None;
            return Action::Reply(Reply::new(530, "Invalid username."));
        }

        info!("#{} Received USER command with username: {}", session.id, username);
        session.username = Some(username.to_string());
        Action::Reply(Reply::new(331, "User name okay, need password."))
    }
}
