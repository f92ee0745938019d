use crate::core_ftpcommand::reply::Reply;
use crate::core_transfer::error::TransferError;
use crate::core_transfer::task::{DataEvent, DataHandler, Direction};
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// STOR data task. Appends received bytes to the target file.
#[derive(Debug)]
pub struct Upload {
    path: PathBuf,
    writer: BufWriter<File>,
    received: u64,
}

/// Why an upload could not be prepared.
#[derive(Debug)]
pub enum CreateError {
    Io(io::Error),
    IsDirectory,
    /// Resume offset does not match the size of the file on disk.
    OffsetMismatch { offset: u64, len: Option<u64> },
}

impl Upload {
    /// Opens `path` for writing at `offset`.
    ///
    /// Offset 0 creates or truncates. A non-zero offset requires an existing
    /// file whose size is exactly `offset`; writing resumes there.
    pub fn create(path: &Path, offset: u64) -> Result<Self, CreateError> {
        if path.is_dir() {
            return Err(CreateError::IsDirectory);
        }

        let file = if offset == 0 {
            File::create(path).map_err(CreateError::Io)?
        } else {
            let len = path.metadata().ok().map(|m| m.len());
            if len != Some(offset) {
                return Err(CreateError::OffsetMismatch { offset, len });
            }
            let mut file = OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(CreateError::Io)?;
            file.seek(SeekFrom::Start(offset)).map_err(CreateError::Io)?;
            file
        };

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            received: 0,
        })
    }

    /// Keeps whatever arrived before a failure.
    fn flush_partial(&mut self) {
        match self.writer.flush() {
            Ok(()) => info!(
                "Partial transfer kept: {} bytes written to {:?}",
                self.received, self.path
            ),
            Err(e) => warn!("Failed to flush partial upload {:?}: {}", self.path, e),
        }
    }
}

impl DataHandler for Upload {
    fn name(&self) -> &'static str {
        "STOR"
    }

    fn direction(&self) -> Direction {
        Direction::Receive
    }

    fn on_readable(&mut self, data: &[u8]) -> Result<(), TransferError> {
        self.writer
            .write_all(data)
            .map_err(TransferError::FileWrite)?;
        self.received += data.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TransferError> {
        self.writer.flush().map_err(TransferError::FileWrite)
    }

    fn on_event(&mut self, event: DataEvent) -> Option<Reply> {
        match event {
            DataEvent::Connected => None,
            DataEvent::Complete => {
                info!("Received {} bytes into {:?}", self.received, self.path);
                Some(Reply::new(226, "Transfer complete."))
            }
            DataEvent::Timeout => {
                self.flush_partial();
                Some(TransferError::Timeout.to_ftp_response())
            }
            DataEvent::Error(e) => {
                if !matches!(e, TransferError::FileWrite(_)) {
                    self.flush_partial();
                }
                Some(e.to_ftp_response())
            }
        }
    }
}
