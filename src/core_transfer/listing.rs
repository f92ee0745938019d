use crate::constants::LIST_RECENT_SECS;
use crate::core_ftpcommand::reply::Reply;
use crate::core_transfer::channel::OutboundQueue;
use crate::core_transfer::error::TransferError;
use crate::core_transfer::task::{DataEvent, DataHandler, Direction, Step};
use chrono::{DateTime, Local};
use log::debug;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// LIST data task: sends a pre-rendered directory listing.
#[derive(Debug)]
pub struct Listing {
    payload: Option<Vec<u8>>,
}

impl Listing {
    /// Renders `dir` now so enumeration errors are reported before 150.
    pub fn build(dir: &Path) -> io::Result<Self> {
        Ok(Self::from_payload(render_directory(dir)?))
    }

    pub fn from_payload(payload: Vec<u8>) -> Self {
        Self {
            payload: Some(payload),
        }
    }
}

impl DataHandler for Listing {
    fn name(&self) -> &'static str {
        "LIST"
    }

    fn direction(&self) -> Direction {
        Direction::Send
    }

    fn on_writable(&mut self, queue: &mut OutboundQueue) -> Result<Step, TransferError> {
        if let Some(payload) = self.payload.take() {
            queue.push(payload);
        }
        Ok(Step::Eof)
    }

    fn on_event(&mut self, event: DataEvent) -> Option<Reply> {
        match event {
            DataEvent::Connected => None,
            DataEvent::Complete => Some(Reply::new(226, "Transfer complete.")),
            DataEvent::Timeout => Some(TransferError::Timeout.to_ftp_response()),
            DataEvent::Error(e) => Some(e.to_ftp_response()),
        }
    }
}

/// One `ls -l` style line per entry, sorted by name, CRLF-terminated.
///
/// `.` and `..` are not listed. Entries whose metadata cannot be read are
/// skipped.
pub fn render_directory(dir: &Path) -> io::Result<Vec<u8>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        match entry.path().symlink_metadata() {
            Ok(meta) => {
                let shown = if meta.file_type().is_symlink() {
                    match fs::read_link(entry.path()) {
                        Ok(target) => format!("{} -> {}", name, target.display()),
                        Err(_) => name,
                    }
                } else {
                    name
                };
                entries.push((shown, meta));
            }
            Err(e) => debug!("Skipping {:?} in listing: {}", entry.path(), e),
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let now = SystemTime::now();
    let mut out = Vec::new();
    for (name, meta) in &entries {
        out.extend_from_slice(format_entry(name, meta, now).as_bytes());
    }
    Ok(out)
}

fn format_entry(name: &str, meta: &Metadata, now: SystemTime) -> String {
    let (links, owner, group) = ownership(meta);
    format!(
        "{} {:>3} {:<8} {:<8} {:>10} {} {}\r\n",
        permissions(meta),
        links,
        owner,
        group,
        meta.len(),
        format_date(meta.modified().unwrap_or(now), now),
        name
    )
}

fn format_date(modified: SystemTime, now: SystemTime) -> String {
    let stamp: DateTime<Local> = modified.into();
    let age = DateTime::<Local>::from(now).signed_duration_since(stamp);
    if age.num_seconds() >= 0 && age.num_seconds() < LIST_RECENT_SECS {
        stamp.format("%b %e %H:%M").to_string()
    } else {
        stamp.format("%b %e  %Y").to_string()
    }
}

fn type_char(meta: &Metadata) -> char {
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        'l'
    } else if file_type.is_dir() {
        'd'
    } else {
        '-'
    }
}

#[cfg(unix)]
fn permissions(meta: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode();
    let mut out = String::with_capacity(10);
    out.push(type_char(meta));
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn permissions(meta: &Metadata) -> String {
    let rest = match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => "rwxr-xr-x",
        (false, true) => "r--r--r--",
        (false, false) => "rw-r--r--",
    };
    format!("{}{}", type_char(meta), rest)
}

#[cfg(unix)]
fn ownership(meta: &Metadata) -> (u64, String, String) {
    use std::os::unix::fs::MetadataExt;
    (meta.nlink(), meta.uid().to_string(), meta.gid().to_string())
}

#[cfg(not(unix))]
fn ownership(_meta: &Metadata) -> (u64, String, String) {
    (1, "ftp".to_string(), "ftp".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TransferRecord;
    use std::time::Duration;

    #[test]
    fn listing_parses_back_into_records() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b file.txt"), b"12345").unwrap();
        fs::create_dir(dir.path().join("a_dir")).unwrap();

        let listing = String::from_utf8(render_directory(dir.path()).unwrap()).unwrap();
        assert!(listing.ends_with("\r\n"));

        let records = TransferRecord::parse_listing(&listing);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "a_dir");
        assert!(records[0].permissions.starts_with('d'));
        assert_eq!(records[1].name, "b file.txt");
        assert_eq!(records[1].size, "5");
        assert!(records[1].permissions.starts_with('-'));
    }

    #[test]
    fn empty_directory_renders_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(render_directory(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(render_directory(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn old_files_show_the_year() {
        let now = SystemTime::now();
        let old = now - Duration::from_secs(400 * 24 * 60 * 60);
        let recent = now - Duration::from_secs(60);
        assert!(format_date(recent, now).contains(':'));
        let old_text = format_date(old, now);
        assert!(!old_text.contains(':'));
        assert_eq!(old_text.split_whitespace().count(), 3);
    }

    #[test]
    fn stale_entries_render_a_year_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.tar");
        fs::write(&path, b"x").unwrap();
        // 2020-01-01T00:00:00Z
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_577_836_800, 0))
            .unwrap();

        let listing = String::from_utf8(render_directory(dir.path()).unwrap()).unwrap();
        let records = TransferRecord::parse_listing(&listing);
        assert_eq!(records.len(), 1);
        let year = records[0].date.rsplit(' ').next().unwrap();
        assert!(year == "2019" || year == "2020", "unexpected date {}", records[0].date);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_show_their_target() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("target.txt"), b"x").unwrap();
        std::os::unix::fs::symlink("target.txt", dir.path().join("link")).unwrap();

        let listing = String::from_utf8(render_directory(dir.path()).unwrap()).unwrap();
        let records = TransferRecord::parse_listing(&listing);
        assert!(records.iter().any(|r| r.name == "link -> target.txt"));
    }

    #[test]
    fn listing_task_queues_payload_once() {
        let mut task = Listing::from_payload(b"line\r\n".to_vec());
        let mut queue = OutboundQueue::new();
        assert_eq!(task.on_writable(&mut queue).unwrap(), Step::Eof);
        assert_eq!(queue.len(), 6);
        assert_eq!(task.on_event(DataEvent::Complete).unwrap().code(), 226);
    }
}
