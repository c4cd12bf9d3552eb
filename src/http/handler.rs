//! Response generation for one validated request.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::config::{Config, MIN_BUFFER_SIZE};
use crate::http::mime::mime_type;
use crate::http::request::{Method, Request};
use crate::http::response::{http_date, Response, ResponseBuilder, StatusCode, SERVER_NAME};
use crate::http::writer::{serialize_head, serialize_response};

/// Read-only state every request handler needs.
#[derive(Debug, Clone)]
pub struct ServeContext {
    /// Document root; `/` maps to `<root>/index.html`.
    pub root: PathBuf,
    /// Capacity of each connection's inbound and outbound buffer.
    pub buffer_size: usize,
    /// Most requests served from one read before output is flushed.
    pub max_pipeline: usize,
}

impl ServeContext {
    /// Limits below the smallest workable values are raised to them.
    pub fn new(root: impl Into<PathBuf>, buffer_size: usize, max_pipeline: usize) -> Self {
        Self {
            root: root.into(),
            buffer_size: buffer_size.max(MIN_BUFFER_SIZE),
            max_pipeline: max_pipeline.max(1),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.static_files.root.clone(),
            cfg.server.buffer_size,
            cfg.server.max_pipeline,
        )
    }

    /// Maps a request path onto the document root.
    ///
    /// The path must already be free of `..`.
    pub fn resolve(&self, path: &str) -> PathBuf {
        if path == "/" {
            self.root.join("index.html")
        } else {
            self.root.join(path.trim_start_matches('/'))
        }
    }
}

/// Where the bytes after a response head come from.
#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// An open file of `size` bytes, read from its current position.
    File { file: File, size: u64 },
}

/// A generated response, not yet staged for sending.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub head: Vec<u8>,
    pub body: Body,
    /// Whether the connection stays open after this reply.
    pub keep_alive: bool,
    /// Pipelined requests behind this one are dropped and the connection closes.
    pub ends_batch: bool,
}

impl Reply {
    pub fn from_response(resp: &Response, keep_alive: bool) -> Self {
        Self {
            status: resp.status,
            head: serialize_response(resp),
            body: Body::Empty,
            keep_alive,
            ends_batch: false,
        }
    }

    pub fn error(status: StatusCode, keep_alive: bool) -> Self {
        Self::from_response(&Response::error(status, keep_alive), keep_alive)
    }

    /// Bytes this reply needs in the output buffer to be sent in one piece.
    pub fn full_len(&self) -> u64 {
        let body = match &self.body {
            Body::Empty => 0,
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File { size, .. } => *size,
        };
        self.head.len() as u64 + body
    }
}

/// Generates the reply for a validated request.
///
/// `frame` is the raw request exactly as received; POST echoes it back.
pub fn respond(request: &Request, frame: &[u8], ctx: &ServeContext) -> Reply {
    let keep_alive = request.keep_alive();
    match request.method {
        Method::GET | Method::HEAD => serve_file(request, ctx, keep_alive),
        Method::POST => echo(frame, ctx),
    }
}

fn serve_file(request: &Request, ctx: &ServeContext, keep_alive: bool) -> Reply {
    let full_path = ctx.resolve(request.path_only());

    match fs::metadata(&full_path) {
        Ok(meta) if meta.is_file() => {}
        _ => {
            tracing::debug!(path = %full_path.display(), "File not found");
            return Reply::error(StatusCode::NotFound, keep_alive);
        }
    }

    let file = match File::open(&full_path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %full_path.display(), error = %e, "Failed to open file");
            return Reply::error(StatusCode::InternalServerError, keep_alive);
        }
    };
    let meta = match file.metadata() {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!(path = %full_path.display(), error = %e, "Failed to stat open file");
            return Reply::error(StatusCode::InternalServerError, keep_alive);
        }
    };

    let size = meta.len();
    let resp = file_head(&full_path, size, meta.modified().unwrap_or(UNIX_EPOCH), keep_alive);
    let head = serialize_head(&resp);
    if head.len() >= ctx.buffer_size {
        tracing::warn!(path = %full_path.display(), "Response headers exceed buffer");
        return Reply::error(StatusCode::InternalServerError, keep_alive);
    }

    let body = if request.method == Method::HEAD || size == 0 {
        Body::Empty
    } else {
        Body::File { file, size }
    };

    Reply {
        status: StatusCode::Ok,
        head,
        body,
        keep_alive,
        ends_batch: false,
    }
}

fn file_head(path: &Path, size: u64, modified: std::time::SystemTime, keep_alive: bool) -> Response {
    ResponseBuilder::new(StatusCode::Ok)
        .header("Server", SERVER_NAME)
        .header("Content-Type", mime_type(path))
        .header("Content-Length", size.to_string())
        .header("Last-Modified", http_date(modified))
        .keep_alive(keep_alive)
        .build()
}

/// Echoes the raw request back. The connection always closes afterwards.
fn echo(frame: &[u8], ctx: &ServeContext) -> Reply {
    let resp = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Length", frame.len().to_string())
        .keep_alive(false)
        .build();
    let head = serialize_head(&resp);

    if head.len() + frame.len() > ctx.buffer_size {
        tracing::warn!(len = frame.len(), "POST echo does not fit in one buffer");
        return Reply {
            ends_batch: true,
            ..Reply::error(StatusCode::InternalServerError, false)
        };
    }

    Reply {
        status: StatusCode::Ok,
        head,
        body: Body::Bytes(frame.to_vec()),
        keep_alive: false,
        ends_batch: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_maps_to_index() {
        let ctx = ServeContext::new("/srv/www", 4096, 10);
        assert_eq!(ctx.resolve("/"), PathBuf::from("/srv/www/index.html"));
        assert_eq!(ctx.resolve("/css/a.css"), PathBuf::from("/srv/www/css/a.css"));
    }

    #[test]
    fn echo_too_large_is_internal_error() {
        let ctx = ServeContext::new("/srv/www", 256, 10);
        let frame = vec![b'x'; 240];
        let reply = echo(&frame, &ctx);
        assert_eq!(reply.status, StatusCode::InternalServerError);
        assert!(!reply.keep_alive);
        assert!(reply.ends_batch);
    }

    #[test]
    fn echo_ends_batch() {
        let ctx = ServeContext::new("/srv/www", 4096, 10);
        let reply = echo(b"POST / HTTP/1.1\r\n\r\n", &ctx);
        assert_eq!(reply.status, StatusCode::Ok);
        assert!(reply.ends_batch);
    }

    #[test]
    fn tiny_limits_are_raised() {
        let ctx = ServeContext::new("/srv/www", 16, 0);
        assert_eq!(ctx.buffer_size, MIN_BUFFER_SIZE);
        assert_eq!(ctx.max_pipeline, 1);

        let reply = Reply::error(StatusCode::InternalServerError, true);
        assert!(reply.full_len() <= ctx.buffer_size as u64);
    }
}
