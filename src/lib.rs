//! liso - single-threaded static HTTP/1.1 server
//!
//! Core library for the event loop, connection handling and HTTP framing.

pub mod config;
pub mod http;
pub mod server;
