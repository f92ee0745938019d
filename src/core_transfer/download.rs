use crate::core_ftpcommand::reply::Reply;
use crate::core_transfer::channel::OutboundQueue;
use crate::core_transfer::error::TransferError;
use crate::core_transfer::task::{DataEvent, DataHandler, Direction, Step};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// RETR data task.
///
/// Sends exactly the bytes between the resume offset and the file length
/// observed at open time.
#[derive(Debug)]
pub struct Download {
    path: PathBuf,
    file: File,
    chunk_size: usize,
    remaining: u64,
    sent: u64,
}

/// Why a download could not be prepared.
#[derive(Debug)]
pub enum OpenError {
    Io(io::Error),
    IsDirectory,
    OffsetBeyondEnd { offset: u64, len: u64 },
}

impl Download {
    pub fn open(path: &Path, offset: u64, chunk_size: usize) -> Result<Self, OpenError> {
        let mut file = File::open(path).map_err(OpenError::Io)?;
        let meta = file.metadata().map_err(OpenError::Io)?;
        if meta.is_dir() {
            return Err(OpenError::IsDirectory);
        }
        let len = meta.len();
        if offset > len {
            return Err(OpenError::OffsetBeyondEnd { offset, len });
        }
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).map_err(OpenError::Io)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
            chunk_size: chunk_size.max(1),
            remaining: len - offset,
            sent: 0,
        })
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl DataHandler for Download {
    fn name(&self) -> &'static str {
        "RETR"
    }

    fn direction(&self) -> Direction {
        Direction::Send
    }

    fn on_writable(&mut self, queue: &mut OutboundQueue) -> Result<Step, TransferError> {
        if self.remaining == 0 {
            return Ok(Step::Eof);
        }
        let want = self.remaining.min(self.chunk_size as u64) as usize;
        let mut chunk = vec![0u8; want];
        let n = loop {
            match self.file.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransferError::FileRead(e)),
            }
        };
        if n == 0 {
            // Truncated underneath us; send what there was.
            self.remaining = 0;
            return Ok(Step::Eof);
        }
        chunk.truncate(n);
        queue.push(chunk);
        self.remaining -= n as u64;
        self.sent += n as u64;
        Ok(if self.remaining == 0 {
            Step::Eof
        } else {
            Step::Continue
        })
    }

    fn on_event(&mut self, event: DataEvent) -> Option<Reply> {
        match event {
            DataEvent::Connected => {
                log::debug!("Sending {:?}", self.path);
                None
            }
            DataEvent::Complete => {
                log::info!("Sent {} bytes of {:?}", self.sent, self.path);
                Some(Reply::new(226, "Transfer complete."))
            }
            DataEvent::Timeout => Some(TransferError::Timeout.to_ftp_response()),
            DataEvent::Error(e) => Some(e.to_ftp_response()),
        }
    }
}
