//! Event loop, connection table and process plumbing.

pub mod listener;
pub mod reactor;
pub mod registry;
pub mod signal;

pub use reactor::{Server, ShutdownHandle};
