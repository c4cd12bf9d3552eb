use std::io::{self, Read, Write};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes the status line and headers, including the blank line.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Serializes a whole response: head followed by the in-memory body.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = serialize_head(resp);
    buf.extend_from_slice(&resp.body);
    buf
}

/// Bounded, append-only staging area for outgoing bytes.
///
/// Bytes are appended at the back and drained from the front by advancing
/// `written`; nothing is shifted in place. The staged length never exceeds
/// `capacity`.
#[derive(Debug)]
pub struct OutputBuffer {
    buffer: Vec<u8>,
    written: usize,
    capacity: usize,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            written: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes staged since the last clear, sent or not.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Space left before the buffer reaches capacity.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// Bytes still waiting to be written.
    pub fn pending(&self) -> &[u8] {
        &self.buffer[self.written..]
    }

    pub fn is_drained(&self) -> bool {
        self.written == self.buffer.len()
    }

    /// Appends `bytes` if they fit entirely; otherwise leaves the buffer untouched.
    pub fn try_append(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.remaining() {
            return false;
        }
        self.buffer.extend_from_slice(bytes);
        true
    }

    /// Appends up to `want` bytes read from `reader`, stopping early at end of input.
    ///
    /// Returns the number of bytes appended.
    pub fn fill_from<R: Read>(&mut self, reader: &mut R, want: usize) -> io::Result<usize> {
        let want = want.min(self.remaining());
        let start = self.buffer.len();
        self.buffer.resize(start + want, 0);

        let mut filled = 0;
        while filled < want {
            match reader.read(&mut self.buffer[start + filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e);
                }
            }
        }

        self.buffer.truncate(start + filled);
        Ok(filled)
    }

    /// Marks `n` pending bytes as sent.
    pub fn advance(&mut self, n: usize) {
        self.written = (self.written + n).min(self.buffer.len());
    }

    /// Performs one write of the pending bytes and advances past what was taken.
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        let n = writer.write(self.pending())?;
        self.advance(n);
        Ok(n)
    }

    /// Drops staged bytes past `len`; used to unstage a reply that failed midway.
    pub fn truncate(&mut self, len: usize) {
        self.buffer.truncate(len);
        self.written = self.written.min(self.buffer.len());
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.written = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::{ResponseBuilder, StatusCode};

    #[test]
    fn head_ends_with_blank_line() {
        let resp = ResponseBuilder::new(StatusCode::NotFound)
            .keep_alive(false)
            .build();
        let head = serialize_head(&resp);
        assert_eq!(
            head,
            b"HTTP/1.1 404 Not Found\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn append_never_exceeds_capacity() {
        let mut out = OutputBuffer::new(8);
        assert!(out.try_append(b"12345"));
        assert!(!out.try_append(b"6789"));
        assert_eq!(out.pending(), b"12345");
        assert!(out.try_append(b"678"));
        assert_eq!(out.remaining(), 0);
    }

    #[test]
    fn partial_writes_advance_offset() {
        let mut out = OutputBuffer::new(16);
        out.try_append(b"hello world");
        out.advance(6);
        assert_eq!(out.pending(), b"world");
        assert!(!out.is_drained());
        out.advance(5);
        assert!(out.is_drained());
    }

    #[test]
    fn fill_from_respects_capacity() {
        let mut out = OutputBuffer::new(10);
        out.try_append(b"head");
        let mut src: &[u8] = b"abcdefghijkl";
        let n = out.fill_from(&mut src, 100).unwrap();
        assert_eq!(n, 6);
        assert_eq!(out.pending(), b"headabcdef");
    }
}
