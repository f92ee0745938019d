// src/constants.rs

/// Placeholder username validation for USER.
pub const USERNAME_REGEX: &str = r"^[A-Za-z0-9_.\-]{1,32}$";

/// Socket read chunk used by the control connection.
pub const DEFAULT_READ_CHUNK: usize = 4096;

/// The command buffer may grow to this many read chunks before it is discarded.
pub const LINE_BUFFER_FACTOR: usize = 4;

pub const DEFAULT_DOWNLOAD_CHUNK: usize = 64 * 1024;
pub const DEFAULT_UPLOAD_CHUNK: usize = 64 * 1024;

/// Download read-ahead stops once this many bytes wait in the outbound queue.
pub const DEFAULT_LOW_WATER_MARK: usize = 512 * 1024;

pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_DATA_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_LISTEN_PORT: u16 = 21;
pub const DEFAULT_BANNER: &str = "FTP Server ready";

/// Listing dates older than this are printed with the year instead of the time.
pub const LIST_RECENT_SECS: i64 = 180 * 24 * 60 * 60;
