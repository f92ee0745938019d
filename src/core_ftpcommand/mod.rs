// Here's the list of the FTP commands implemented
pub mod auth;
pub mod directory;
pub mod pass;
pub mod pbsz;
pub mod prot;
pub mod quit;
pub mod rest;
pub mod retr;
pub mod size;
pub mod stor;
pub mod type_;
pub mod user;

// Registry, verb table and the reply type
pub mod ftpcommand;
pub mod handlers;
pub mod reply;

// The utils and common functions are here
pub mod utils;
