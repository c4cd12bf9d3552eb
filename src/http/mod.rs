//! HTTP protocol implementation.
//!
//! This module implements the per-connection side of a static HTTP/1.1
//! server: framing, validation, response generation and transmission.
//! Nothing here blocks; every handler runs until the socket would block and
//! then reports what it is waiting for.
//!
//! # Architecture
//!
//! - **`buffer`**: Bounded inbound buffer with carry-over of partial requests
//! - **`parser`**: Request framing and validation
//! - **`request`**: HTTP request representation
//! - **`handler`**: Maps a request onto a file, an echo or an error reply
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Head serialization and the bounded output buffer
//! - **`mime`**: MIME type detection based on file extensions
//! - **`connection`**: The per-socket state machine driven by the reactor
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Idle     │ ← Registered for readable events
//!        └──────┬──────┘
//!               │ Complete request(s) buffered
//!               ▼
//!        ┌──────────────────┐
//!        │  SingleShot or   │ ← Registered for writable events
//!        │  Streaming       │   (Streaming refills from the file)
//!        └──────┬───────────┘
//!               │ Output drained
//!               ├─ Carried requests → serve them
//!               ├─ Last reply keep-alive → Idle
//!               └─ Otherwise, or after a POST echo → released
//! ```
//!
//! # Example
//!
//! ```ignore
//! use liso::http::connection::{Connection, Step};
//! use liso::http::handler::ServeContext;
//!
//! let ctx = ServeContext::new("./static_site", 4096, 10);
//! let mut conn = Connection::new(stream, peer, &ctx);
//! match conn.on_readable(&ctx)? {
//!     Step::Write => { /* reregister for writable */ }
//!     Step::Read => { /* keep waiting */ }
//!     Step::Close => { /* deregister and drop */ }
//! }
//! ```

pub mod buffer;
pub mod connection;
pub mod handler;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
