pub mod config;
pub mod constants;
pub mod core_cli;
pub mod core_ftpcommand;
pub mod core_network;
pub mod core_tls;
pub mod core_transfer;
pub mod helpers;
pub mod record;
pub mod server;
pub mod session;

pub use config::Config;
pub use server::{Server, ServerContext};
