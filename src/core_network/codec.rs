use crate::constants::LINE_BUFFER_FACTOR;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("command buffer exceeded {0} bytes without a line terminator")]
    Overflow(usize),
}

/// One complete command line taken off the control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Leading run of non-whitespace characters, upper-cased.
    pub verb: String,
    /// The whole line with its `\r\n` terminator re-appended.
    pub raw: String,
}

impl CommandLine {
    fn from_bytes(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let verb = text
            .split(|c: char| c == ' ' || c == '\t')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        Self {
            verb,
            raw: format!("{}\r\n", text),
        }
    }
}

/// Splits the control byte stream into CRLF-terminated command lines.
///
/// Bytes accumulate across reads; a read may complete zero, one or many
/// lines. Whatever trails the last terminator stays buffered.
#[derive(Debug)]
pub struct LineCodec {
    buffer: Vec<u8>,
    cap: usize,
}

impl LineCodec {
    pub fn new(read_chunk: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(read_chunk),
            cap: read_chunk * LINE_BUFFER_FACTOR,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Takes the next complete line off the front of the buffer.
    pub fn next_line(&mut self) -> Option<CommandLine> {
        let pos = self.buffer.windows(2).position(|w| w == b"\r\n")?;
        let line = CommandLine::from_bytes(&self.buffer[..pos]);
        self.buffer.drain(..pos + 2);
        Some(line)
    }

    /// Discards the buffer if it grew past the cap without completing a line.
    pub fn check_overflow(&mut self) -> Result<(), CodecError> {
        if self.buffer.len() > self.cap {
            self.buffer.clear();
            return Err(CodecError::Overflow(self.cap));
        }
        Ok(())
    }

    /// Appends `bytes` and returns every line they complete.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Vec<CommandLine>, CodecError> {
        self.extend(bytes);
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line);
        }
        self.check_overflow()?;
        Ok(lines)
    }

    /// Hands over every unconsumed byte, e.g. to a TLS handshake.
    pub fn take_remaining(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipelined_read_yields_complete_lines_and_keeps_partial() {
        let mut codec = LineCodec::new(4096);
        let mut data = Vec::new();
        for _ in 0..3 {
            data.extend_from_slice(b"USER ");
            data.extend(std::iter::repeat(b'a').take(1343));
            data.extend_from_slice(b"\r\n");
        }
        data.extend(std::iter::repeat(b'p').take(50));
        assert_eq!(data.len(), 4100);

        let lines = codec.decode(&data).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.verb == "USER"));
        assert_eq!(codec.pending(), 50);
    }

    #[test]
    fn partial_line_completes_on_next_read() {
        let mut codec = LineCodec::new(4096);
        assert!(codec.decode(b"cw").unwrap().is_empty());
        assert!(codec.decode(b"d /pub\r").unwrap().is_empty());
        let lines = codec.decode(b"\nPWD\r\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].verb, "CWD");
        assert_eq!(lines[0].raw, "cwd /pub\r\n");
        assert_eq!(lines[1].verb, "PWD");
        assert_eq!(codec.pending(), 0);
    }

    #[test]
    fn bare_newline_is_not_a_terminator() {
        let mut codec = LineCodec::new(4096);
        assert!(codec.decode(b"NOOP\nPWD\n").unwrap().is_empty());
        assert_eq!(codec.pending(), 9);
    }

    #[test]
    fn verb_stops_at_tab() {
        let mut codec = LineCodec::new(4096);
        let lines = codec.decode(b"retr\tfile.txt\r\n").unwrap();
        assert_eq!(lines[0].verb, "RETR");
    }

    #[test]
    fn oversized_unterminated_buffer_is_discarded() {
        let mut codec = LineCodec::new(16);
        let junk = vec![b'x'; 65];
        assert_eq!(codec.decode(&junk), Err(CodecError::Overflow(64)));
        assert_eq!(codec.pending(), 0);
        let lines = codec.decode(b"PWD\r\n").unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn take_remaining_returns_unparsed_bytes() {
        let mut codec = LineCodec::new(4096);
        codec.extend(b"AUTH TLS\r\n\x16\x03\x01");
        let line = codec.next_line().unwrap();
        assert_eq!(line.verb, "AUTH");
        assert_eq!(codec.take_remaining(), vec![0x16, 0x03, 0x01]);
        assert_eq!(codec.pending(), 0);
    }
}
