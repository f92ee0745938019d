use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::argument;
use crate::core_transfer::download::{Download, OpenError};
use crate::core_transfer::error::open_failure;
use crate::core_transfer::DataTask;
use crate::session::Session;
use log::{error, info, warn};

/// Handles the RETR (Retrieve) FTP command.
///
/// The file is opened and positioned at the pending REST offset before 150
/// is sent, so every open failure is reported without touching the data
/// connection. The offset is consumed here whether or not the transfer
/// starts.
///
/// # Arguments
///
/// * `session` - The control connection's state; supplies the current
///   directory, the root jail, the PORT endpoint and the REST offset.
/// * `line` - The raw command line; the filename is everything after the verb.
pub struct RetrHandler;

impl CommandHandler for RetrHandler {
    fn parse(&self, session: &mut Session, _verb: &str, line: &str) -> Action {
        let offset = session.file_offset.take().unwrap_or(0);

        let name = argument(line);
        if name.is_empty() {
            warn!("#{} RETR command received with no arguments", session.id);
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

        let download = match Download::open(&path, offset, session.download_chunk_size) {
            Ok(download) => download,
            Err(OpenError::IsDirectory) => {
                return Action::Reply(Reply::new(550, "Is a directory."))
            }
            Err(OpenError::OffsetBeyondEnd { offset, len }) => {
                warn!(
                    "#{} RETR {:?}: offset {} beyond length {}",
                    session.id, path, offset, len
                );
                return Action::Reply(Reply::new(554, "Requested offset exceeds file size."));
            }
            Err(OpenError::Io(e)) => {
                error!(
                    "#{} File not found or could not be opened: {:?}, error: {}",
                    session.id, path, e
                );
                return Action::Reply(open_failure(&e));
            }
        };

        info!(
            "#{} Sending file to {}: {:?} from offset {} ({} bytes, type {})",
            session.id,
            session.user_label(),
            path,
            offset,
            download.remaining(),
            session.type_
        );
        Action::Transfer {
            preliminary: Reply::new(150, "Opening data connection for file transfer."),
            endpoint,
            task: DataTask::Download(download),
        }
    }
}
