use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::reply::Reply;
use crate::core_network::codec::CommandLine;
use crate::core_transfer::DataTask;
use crate::session::Session;
use anyhow::Result;
use std::collections::HashMap;
use std::net::SocketAddrV4;
use std::sync::Arc;

use crate::core_ftpcommand::{
    auth::AuthHandler, directory::DirectoryHandler, pass::PassHandler, pbsz::PbszHandler,
    prot::ProtHandler, quit::QuitHandler, rest::RestHandler, retr::RetrHandler,
    size::SizeHandler, stor::StorHandler, type_::TypeHandler, user::UserHandler,
};
use crate::core_network::port::PortHandler;

/// What the control loop must do after a command was parsed.
#[derive(Debug)]
pub enum Action {
    Reply(Reply),
    /// Send `preliminary` (150), then run `task` against `endpoint`.
    Transfer {
        preliminary: Reply,
        endpoint: SocketAddrV4,
        task: DataTask,
    },
    /// Send the reply (234), then hand the socket to the TLS handshake.
    UpgradeTls(Reply),
    /// Send the reply, then close the control connection.
    Close(Reply),
}

/// A verb implementation.
///
/// Handlers are stateless and shared by every session on every worker;
/// per-connection state lives in the `Session` passed to each call.
pub trait CommandHandler: Send + Sync {
    fn parse(&self, session: &mut Session, verb: &str, line: &str) -> Action;
}

/// Verb to handler mapping, read-only once built.
pub struct CommandRegistry {
    handlers: HashMap<FtpCommand, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn dispatch(&self, session: &mut Session, line: &CommandLine) -> Action {
        match FtpCommand::from_str(&line.verb).and_then(|cmd| self.handlers.get(&cmd)) {
            Some(handler) => handler.parse(session, &line.verb, &line.raw),
            None => Action::Reply(Reply::not_understood()),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

pub fn initialize_command_handlers() -> Result<CommandRegistry> {
    let mut handlers: HashMap<FtpCommand, Arc<dyn CommandHandler>> = HashMap::new();

    handlers.insert(FtpCommand::USER, Arc::new(UserHandler::new()?));
    handlers.insert(FtpCommand::PASS, Arc::new(PassHandler));
    handlers.insert(FtpCommand::QUIT, Arc::new(QuitHandler));
    handlers.insert(FtpCommand::TYPE, Arc::new(TypeHandler));
    handlers.insert(FtpCommand::PORT, Arc::new(PortHandler));

    // One instance answers all four directory verbs.
    let directory: Arc<dyn CommandHandler> = Arc::new(DirectoryHandler);
    for cmd in [
        FtpCommand::PWD,
        FtpCommand::CWD,
        FtpCommand::CDUP,
        FtpCommand::LIST,
    ] {
        handlers.insert(cmd, Arc::clone(&directory));
    }

    handlers.insert(FtpCommand::RETR, Arc::new(RetrHandler));
    handlers.insert(FtpCommand::STOR, Arc::new(StorHandler));
    handlers.insert(FtpCommand::REST, Arc::new(RestHandler));
    handlers.insert(FtpCommand::SIZE, Arc::new(SizeHandler));

    handlers.insert(FtpCommand::AUTH, Arc::new(AuthHandler));
    handlers.insert(FtpCommand::PBSZ, Arc::new(PbszHandler));
    handlers.insert(FtpCommand::PROT, Arc::new(ProtHandler));

    Ok(CommandRegistry { handlers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_network::codec::LineCodec;
    use crate::session::test_support::session_at;

    fn line(text: &str) -> CommandLine {
        let mut codec = LineCodec::new(4096);
        codec.decode(text.as_bytes()).unwrap().remove(0)
    }

    #[test]
    fn unknown_verb_is_not_understood() {
        let registry = initialize_command_handlers().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_at(dir.path());
        let before = format!("{:?}", session);

        match registry.dispatch(&mut session, &line("XYZZY foo\r\n")) {
            Action::Reply(reply) => {
                assert_eq!(reply.to_line(), "500 Command not understood\r\n")
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(format!("{:?}", session), before);
    }

    #[test]
    fn lowercase_verbs_dispatch() {
        let registry = initialize_command_handlers().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_at(dir.path());
        match registry.dispatch(&mut session, &line("pwd\r\n")) {
            Action::Reply(reply) => assert_eq!(reply.code(), 257),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn directory_verbs_share_one_handler() {
        let registry = initialize_command_handlers().unwrap();
        let pwd = &registry.handlers[&FtpCommand::PWD];
        for cmd in [FtpCommand::CWD, FtpCommand::CDUP, FtpCommand::LIST] {
            assert!(Arc::ptr_eq(pwd, &registry.handlers[&cmd]));
        }
        assert_eq!(registry.len(), 16);
    }
}
