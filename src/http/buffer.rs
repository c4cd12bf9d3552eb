use std::io::{self, Read};

use bytes::{Buf, BytesMut};

/// Fixed-capacity buffer for bytes received on one connection.
///
/// Served frames are released from the front with [`consume`]. Whatever is
/// left after the last complete frame stays at the front and the next read
/// appends behind it, so a request split across reads is reassembled in place.
///
/// [`consume`]: RequestBuffer::consume
#[derive(Debug)]
pub struct RequestBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl RequestBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Performs one read into the free tail.
    ///
    /// `Ok(0)` means end of stream; callers check [`is_full`](Self::is_full)
    /// before reading so a full buffer is never mistaken for it.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        let start = self.buf.len();
        let free = self.capacity.saturating_sub(start);
        if free == 0 {
            return Ok(0);
        }

        self.buf.resize(start + free, 0);
        match reader.read(&mut self.buf[start..]) {
            Ok(n) => {
                self.buf.truncate(start + n);
                Ok(n)
            }
            Err(e) => {
                self.buf.truncate(start);
                Err(e)
            }
        }
    }

    /// Releases `n` bytes from the front.
    pub fn consume(&mut self, n: usize) {
        self.buf.advance(n.min(self.buf.len()));
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
