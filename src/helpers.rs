use crate::core_ftpcommand::reply::Reply;
use log::warn;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("path resolves outside the root jail: {0}")]
    OutsideRoot(String),

    #[error("path does not name a file: {0}")]
    NotAFileName(String),
}

impl PathError {
    pub fn to_ftp_response(&self) -> Reply {
        match self {
            PathError::OutsideRoot(_) => Reply::new(550, "Path is outside of the allowed area."),
            PathError::NotAFileName(_) => Reply::syntax_error(),
        }
    }
}

/// Resolves `arg` against the virtual directory `cur_dir`.
///
/// Absolute arguments restart from `/`. `.` and `..` are folded lexically
/// and `..` never climbs above `/`, so the result always stays inside the
/// root jail. The result starts with `/` and has no trailing slash unless it
/// is `/` itself.
pub fn resolve_virtual(cur_dir: &str, arg: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let base = if arg.starts_with('/') { "" } else { cur_dir };

    for segment in base.split('/').chain(arg.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Appends the trailing `/` the session stores directories with.
pub fn as_directory(virtual_path: &str) -> String {
    if virtual_path.ends_with('/') {
        virtual_path.to_string()
    } else {
        format!("{}/", virtual_path)
    }
}

/// Strips the last segment of a directory path: `/a/b/` becomes `/a/`.
pub fn parent_directory(dir: &str) -> Option<String> {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let pos = trimmed.rfind('/')?;
    Some(as_directory(&trimmed[..pos]))
}

/// Maps a virtual path onto the filesystem below `root`.
pub fn to_physical(root: &Path, virtual_path: &str) -> PathBuf {
    root.join(virtual_path.trim_start_matches('/'))
}

/// Rejects physical paths that escape `root` through symlinks.
///
/// Paths that do not exist yet are checked through their parent directory.
/// A symlink whose target cannot be resolved is rejected, since creating a
/// file through it would land wherever the link points.
pub fn ensure_within_root(root: &Path, physical: &Path) -> Result<(), PathError> {
    let checked = match physical.symlink_metadata() {
        Ok(meta) if meta.file_type().is_symlink() => match physical.canonicalize() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Refusing unresolvable symlink {:?}: {}", physical, e);
                return Err(PathError::OutsideRoot(physical.display().to_string()));
            }
        },
        Ok(_) => physical.to_path_buf(),
        Err(_) => match physical.parent() {
            Some(parent) => parent.to_path_buf(),
            None => return Ok(()),
        },
    };

    match checked.canonicalize() {
        Ok(resolved) if !resolved.starts_with(root) => {
            warn!("Path is outside of the allowed area: {:?}", resolved);
            Err(PathError::OutsideRoot(physical.display().to_string()))
        }
        // Missing parents surface later as a not-found reply.
        _ => Ok(()),
    }
}
