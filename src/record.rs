// Client-side view of LIST output, and the retry rule clients apply to
// error replies.

/// One directory entry as a client renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub permissions: String,
    pub link_count: String,
    pub owner: String,
    pub group: String,
    pub size: String,
    /// Month, day and time-or-year, joined with single spaces.
    pub date: String,
    /// May contain spaces; `link -> target` for symlinks.
    pub name: String,
}

impl TransferRecord {
    /// Parses one listing line. Lines with fewer than nine fields are not
    /// entries (e.g. a `total` header) and yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 9 {
            return None;
        }
        Some(Self {
            permissions: fields[0].to_string(),
            link_count: fields[1].to_string(),
            owner: fields[2].to_string(),
            group: fields[3].to_string(),
            size: fields[4].to_string(),
            date: fields[5..8].join(" "),
            name: fields[8..].join(" "),
        })
    }

    pub fn parse_listing(listing: &str) -> Vec<Self> {
        listing.lines().filter_map(Self::parse_line).collect()
    }
}

/// Whether an error reply signals a condition worth reconnecting for.
pub fn is_retryable(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("timeout") || message.contains("timed out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_with_spaces_are_rejoined() {
        let record = TransferRecord::parse_line(
            "-rw-r--r--   1 1000     1000           42 Mar  3 12:01 my holiday notes.txt",
        )
        .unwrap();
        assert_eq!(record.permissions, "-rw-r--r--");
        assert_eq!(record.size, "42");
        assert_eq!(record.date, "Mar 3 12:01");
        assert_eq!(record.name, "my holiday notes.txt");
    }

    #[test]
    fn short_lines_are_dropped() {
        let listing = "total 8\r\n\
                       drwxr-xr-x 2 0 0 4096 Jan 1 2020 pub\r\n\
                       garbage line\r\n";
        let records = TransferRecord::parse_listing(listing);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "pub");
        assert_eq!(records[0].date, "Jan 1 2020");
    }

    #[test]
    fn timeout_errors_are_retryable() {
        assert!(is_retryable("426 Transfer timeout; connection closed."));
        assert!(is_retryable("421 Service closing control connection due to timeout."));
        assert!(is_retryable("connection timed out"));
        assert!(!is_retryable("550 File not found."));
    }
}
