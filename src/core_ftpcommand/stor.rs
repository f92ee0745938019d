use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::argument;
use crate::core_transfer::error::open_failure;
use crate::core_transfer::upload::{CreateError, Upload};
use crate::core_transfer::DataTask;
use crate::session::Session;
use log::{error, info, warn};

/// Handles the STOR FTP command.
///
/// A pending REST offset resumes an upload only when the file on disk is
/// exactly that long; anything else is refused rather than risk corrupting
/// the file.
pub struct StorHandler;

impl CommandHandler for StorHandler {
    fn parse(&self, session: &mut Session, _verb: &str, line: &str) -> Action {
        let offset = session.file_offset.take().unwrap_or(0);

        let name = argument(line);
        if name.is_empty() {
            warn!("#{} STOR command received with no arguments", session.id);
            return Action::Reply(Reply::syntax_error());
        }

        let endpoint = match session.require_data_endpoint() {
            Ok(endpoint) => endpoint,
            Err(reply) => return Action::Reply(reply),
        };

        let path = match session.resolve_file(name) {
            Ok(path) => path,
            Err(e) => return Action::Reply(e.to_ftp_response()),
        };

        let upload = match Upload::create(&path, offset) {
            Ok(upload) => upload,
            Err(CreateError::IsDirectory) => {
                return Action::Reply(Reply::new(550, "Is a directory."))
            }
            Err(CreateError::OffsetMismatch { offset, len }) => {
                warn!(
                    "#{} STOR {:?}: resume offset {} does not match size {:?}",
                    session.id, path, offset, len
                );
                return Action::Reply(Reply::new(554, "Requested offset exceeds file size."));
            }
            Err(CreateError::Io(e)) => {
                error!("#{} Cannot open {:?} for writing: {}", session.id, path, e);
                return Action::Reply(open_failure(&e));
            }
        };

        info!(
            "#{} {} receiving file: {:?} at offset {} (type {})",
            session.id,
            session.user_label(),
            path,
            offset,
            session.type_
        );
        Action::Transfer {
            preliminary: Reply::new(150, "File status okay; about to open data connection."),
            endpoint,
            task: DataTask::Upload(upload),
        }
    }
}
