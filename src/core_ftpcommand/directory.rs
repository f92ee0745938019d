use crate::core_ftpcommand::handlers::{Action, CommandHandler};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::argument;
use crate::core_transfer::listing::Listing;
use crate::core_transfer::DataTask;
use crate::helpers;
use crate::session::Session;
use log::{error, info, warn};
use std::io;

/// PWD, CWD, CDUP and LIST: everything that reads or moves the session's
/// current directory.
pub struct DirectoryHandler;

impl CommandHandler for DirectoryHandler {
    fn parse(&self, session: &mut Session, verb: &str, line: &str) -> Action {
        match verb {
            "PWD" => handle_pwd(session),
            "CWD" => handle_cwd(session, argument(line)),
            "CDUP" => handle_cdup(session),
            "LIST" => handle_list(session),
            _ => Action::Reply(Reply::not_understood()),
        }
    }
}

fn handle_pwd(session: &Session) -> Action {
    Action::Reply(Reply::new(
        257,
        format!("\"{}\" is the current directory.", session.current_dir),
    ))
}

/// Handles the CWD FTP command.
///
/// The target is resolved against the current directory, stored with a
/// trailing `/`, and checked on disk before the session moves.
fn handle_cwd(session: &mut Session, arg: &str) -> Action {
    let arg = if arg.is_empty() { "." } else { arg };
    if arg == "." {
        return Action::Reply(Reply::new(250, "Directory successfully changed."));
    }

    let (virtual_dir, physical) = match session.resolve_directory(arg) {
        Ok(resolved) => resolved,
        Err(e) => return Action::Reply(e.to_ftp_response()),
    };

    // Stat without the trailing `/` so a file reports as a file.
    let target: std::path::PathBuf = physical.components().collect();
    match std::fs::metadata(&target) {
        Ok(meta) if meta.is_dir() => {
            info!("#{} CWD {} -> {}", session.id, session.current_dir, virtual_dir);
            session.current_dir = virtual_dir;
            Action::Reply(Reply::new(250, "Directory successfully changed."))
        }
        Ok(_) => Action::Reply(Reply::new(501, "Not a directory.")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Action::Reply(Reply::new(550, "Directory does not exist."))
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            Action::Reply(Reply::new(550, "Permission denied."))
        }
        Err(e) => {
            warn!("#{} CWD {:?}: {}", session.id, physical, e);
            Action::Reply(Reply::new(550, "Failed to change directory."))
        }
    }
}

fn handle_cdup(session: &mut Session) -> Action {
    match helpers::parent_directory(&session.current_dir) {
        Some(parent) => {
            session.current_dir = parent;
            Action::Reply(Reply::new(250, "Directory successfully changed."))
        }
        None => Action::Reply(Reply::new(
            550,
            "Failed to change directory: No parent directory.",
        )),
    }
}

fn handle_list(session: &mut Session) -> Action {
    let endpoint = match session.require_data_endpoint() {
        Ok(endpoint) => endpoint,
        Err(reply) => return Action::Reply(reply),
    };
    let (_, physical) = match session.resolve_directory(".") {
        Ok(resolved) => resolved,
        Err(e) => return Action::Reply(e.to_ftp_response()),
    };

    match Listing::build(&physical) {
        Ok(listing) => Action::Transfer {
            preliminary: Reply::new(150, "Here comes the directory listing."),
            endpoint,
            task: DataTask::Listing(listing),
        },
        Err(e) => {
            error!("#{} Failed to list {:?}: {}", session.id, physical, e);
            Action::Reply(Reply::new(550, "Failed to list directory."))
        }
    }
}
