use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::argument;
use crate::session::Session;
use log::warn;

/// Handles the SIZE FTP command: `213 <bytes>` for a regular file.
pub struct SizeHandler;

impl CommandHandler for SizeHandler {
    fn parse(&self, session: &mut Session, _verb: &str, line: &str) -> Action {
        let name = argument(line);
        if name.is_empty() {
            return Action::Reply(Reply::syntax_error());
        }

        let path = match session.resolve_file(name) {
            Ok(path) => path,
            Err(e) => return Action::Reply(e.to_ftp_response()),
        };

        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Action::Reply(Reply::new(213, meta.len().to_string())),
            Ok(_) => Action::Reply(Reply::new(550, "File not found or inaccessible")),
            Err(e) => {
                warn!("#{} SIZE {:?}: {}", session.id, path, e);
                Action::Reply(Reply::new(550, "File not found or inaccessible"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::session_at;

    fn size_of(session: &mut Session, line: &str) -> Reply {
        match SizeHandler.parse(session, "SIZE", line) {
            Action::Reply(reply) => reply,
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn reports_byte_length() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.bin"), vec![0u8; 1234]).unwrap();
        let mut session = session_at(dir.path());
        assert_eq!(size_of(&mut session, "SIZE f.bin\r\n"), Reply::new(213, "1234"));
    }

    #[test]
    fn missing_files_and_directories_are_550() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let mut session = session_at(dir.path());
        assert_eq!(size_of(&mut session, "SIZE nope\r\n").code(), 550);
        assert_eq!(size_of(&mut session, "SIZE sub\r\n").code(), 550);
        assert_eq!(size_of(&mut session, "SIZE\r\n").code(), 501);
    }
}
