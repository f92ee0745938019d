// Control connections: framing, transports, the per-session loop and the
// worker threads that run it.

pub mod codec;
pub mod network;
pub mod port;
pub mod transport;
pub mod worker;
