//! remote-edit: edit a shared file over a Unix socket
//!
//! Peers connect to the server and exchange fixed-header binary frames:
//! - WRITE appends a line to the target file
//! - CLEAR truncates it
//! - PING checks liveness
//!
//! Any number of connections may be open at once; all file writes go through
//! one serialized sink.

pub mod client;
pub mod config;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod sink;
