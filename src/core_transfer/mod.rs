// Data connections: LIST, RETR and STOR streaming over an active-mode socket.

pub mod channel;
pub mod download;
pub mod error;
pub mod listing;
pub mod state;
pub mod task;
pub mod upload;

pub use error::TransferError;
pub use state::TransferState;
pub use task::{run, DataEvent, DataHandler, DataTask, Direction, Step, TransferContext};
