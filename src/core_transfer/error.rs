// Error handling for data connections
use crate::core_ftpcommand::reply::Reply;
use crate::core_tls::TlsError;
use crate::core_transfer::state::TransferState;
use std::io;
use std::net::SocketAddrV4;
use thiserror::Error;

/// `ENOSPC` on Linux and the BSDs.
const ENOSPC: i32 = 28;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("failed to connect data channel to {0}: {1}")]
    Connect(SocketAddrV4, #[source] io::Error),

    #[error("data connection to {0} timed out")]
    ConnectTimeout(SocketAddrV4),

    #[error("data channel TLS failed: {0}")]
    Tls(#[from] TlsError),

    #[error("file read failed: {0}")]
    FileRead(#[source] io::Error),

    #[error("file write failed: {0}")]
    FileWrite(#[source] io::Error),

    #[error("data send failed: {0}")]
    Send(#[source] io::Error),

    #[error("data receive failed: {0}")]
    Receive(#[source] io::Error),

    #[error("peer closed the data connection before the transfer finished")]
    UnexpectedEof,

    #[error("data connection timed out")]
    Timeout,

    #[error("invalid transfer transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: TransferState,
        to: TransferState,
    },
}

impl TransferError {
    pub fn to_ftp_response(&self) -> Reply {
        match self {
            TransferError::Connect(..)
            | TransferError::ConnectTimeout(_)
            | TransferError::Tls(_) => Reply::new(425, "Can't build data connection."),
            TransferError::FileRead(_) => Reply::new(550, "File read error."),
            TransferError::FileWrite(_) => {
                Reply::new(552, "Storage allocation exceeded or disk full.")
            }
            TransferError::Send(_) | TransferError::InvalidTransition { .. } => {
                Reply::new(426, "Connection closed; transfer aborted.")
            }
            TransferError::Receive(_) => Reply::new(426, "Connection error; transfer aborted."),
            TransferError::UnexpectedEof => Reply::new(426, "Connection closed unexpectedly."),
            TransferError::Timeout => Reply::new(426, "Transfer timeout; connection closed."),
        }
    }

    /// Classifies a failed socket write.
    pub fn from_send(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::WriteZero => TransferError::UnexpectedEof,
            _ => TransferError::Send(err),
        }
    }
}

/// In-progress socket states are not failures.
pub fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Maps a failure to open a file for RETR/STOR onto its reply.
pub fn open_failure(err: &io::Error) -> Reply {
    if err.raw_os_error() == Some(ENOSPC) {
        return Reply::new(552, "Storage allocation exceeded.");
    }
    match err.kind() {
        io::ErrorKind::NotFound => Reply::new(550, "File not found."),
        io::ErrorKind::PermissionDenied => Reply::new(550, "Permission denied."),
        _ => Reply::new(550, "Cannot open file."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_replies_are_retryable_text() {
        let reply = TransferError::Timeout.to_ftp_response();
        assert_eq!(reply.code(), 426);
        assert!(reply.text().contains("timeout"));
    }

    #[test]
    fn data_connection_failures_are_425() {
        let addr = "127.0.0.1:2032".parse().unwrap();
        let err = TransferError::Connect(
            addr,
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert_eq!(err.to_ftp_response(), Reply::new(425, "Can't build data connection."));
        assert_eq!(TransferError::ConnectTimeout(addr).to_ftp_response().code(), 425);
    }

    #[test]
    fn broken_pipe_is_an_unexpected_close() {
        let err = TransferError::from_send(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, TransferError::UnexpectedEof));
        let err = TransferError::from_send(io::Error::from(io::ErrorKind::Other));
        assert!(matches!(err, TransferError::Send(_)));
    }

    #[test]
    fn open_failures_map_to_specific_replies() {
        assert_eq!(
            open_failure(&io::Error::from(io::ErrorKind::NotFound)).text(),
            "File not found."
        );
        assert_eq!(
            open_failure(&io::Error::from(io::ErrorKind::PermissionDenied)).text(),
            "Permission denied."
        );
        assert_eq!(
            open_failure(&io::Error::from_raw_os_error(ENOSPC)).code(),
            552
        );
    }

    #[test]
    fn would_block_is_transient() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
    }
}
