use std::fs::File;
use std::io::{self, Read, Write};
use std::net::SocketAddr;

use mio::Interest;
use mio::net::TcpStream;

use crate::http::buffer::RequestBuffer;
use crate::http::handler::{self, Body, Reply, ServeContext};
use crate::http::parser::{count_frames, next_frame, parse_http_request, wants_keep_alive, Frame};
use crate::http::response::StatusCode;
use crate::http::writer::OutputBuffer;

/// What the reactor should do with the socket after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Wait for the next readable event.
    Read,
    /// Output is pending; wait for the next writable event.
    Write,
    /// Release the connection.
    Close,
}

impl Step {
    pub fn interest(&self) -> Option<Interest> {
        match self {
            Step::Read => Some(Interest::READABLE),
            Step::Write => Some(Interest::WRITABLE),
            Step::Close => None,
        }
    }
}

/// A file body being sent in buffer-sized chunks.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    /// File bytes already loaded into the output buffer.
    offset: u64,
    size: u64,
}

#[derive(Debug)]
pub enum Transmission {
    /// Nothing to send; parked on readable.
    Idle,
    /// The whole output is in the buffer.
    SingleShot,
    /// The buffer holds one chunk of a larger file.
    Streaming(FileStream),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Buffered,
    Streaming,
    Deferred,
}

/// Per-socket state machine.
///
/// ```text
///   Idle --(complete frame)--> SingleShot | Streaming
///   SingleShot --(drained)--> Close | Idle
///   Streaming --(drained, more file)--> Streaming
///   Streaming --(drained, file done)--> Close | Idle
/// ```
///
/// Both buffers are bounded by `ServeContext::buffer_size`.
pub struct Connection<S = TcpStream> {
    stream: S,
    peer: SocketAddr,
    inbound: RequestBuffer,
    output: OutputBuffer,
    transmission: Transmission,
    /// `Connection` flag of the most recently staged reply.
    keep_alive: bool,
    /// Set by a reply after which nothing else is answered.
    closing: bool,
    peer_closed: bool,
    interest: Interest,
}

impl<S: Read + Write> Connection<S> {
    pub fn new(stream: S, peer: SocketAddr, ctx: &ServeContext) -> Self {
        Self {
            stream,
            peer,
            inbound: RequestBuffer::new(ctx.buffer_size),
            output: OutputBuffer::new(ctx.buffer_size),
            transmission: Transmission::Idle,
            keep_alive: false,
            closing: false,
            peer_closed: false,
            interest: Interest::READABLE,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn transmission(&self) -> &Transmission {
        &self.transmission
    }

    /// Bytes received but not yet served.
    pub fn buffered(&self) -> &[u8] {
        self.inbound.as_slice()
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }

    pub fn set_interest(&mut self, interest: Interest) {
        self.interest = interest;
    }

    /// Handles a readable event.
    ///
    /// Reads until the socket would block or the buffer is full, then serves
    /// every complete frame up to the pipeline cap.
    pub fn on_readable(&mut self, ctx: &ServeContext) -> io::Result<Step> {
        if !matches!(self.transmission, Transmission::Idle) {
            return Ok(Step::Write);
        }

        while !self.inbound.is_full() {
            match self.inbound.read_from(&mut self.stream) {
                Ok(0) => {
                    self.peer_closed = true;
                    break;
                }
                Ok(n) => {
                    tracing::trace!(peer = %self.peer, bytes = n, "Received");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(self.serve_buffered(ctx))
    }

    /// Handles a writable event.
    ///
    /// Writes until the socket would block. Drained streaming chunks are
    /// refilled from the file; a finished response either closes the
    /// connection or resets it for the next request.
    pub fn on_writable(&mut self, ctx: &ServeContext) -> io::Result<Step> {
        if matches!(self.transmission, Transmission::Idle) {
            return Ok(Step::Read);
        }

        'send: loop {
            while !self.output.is_drained() {
                match self.output.write_to(&mut self.stream) {
                    Ok(0) => {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "connection closed while writing",
                        ));
                    }
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Step::Write),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        tracing::warn!(peer = %self.peer, error = %e, "Write failed");
                        match self.finish(ctx) {
                            Step::Write => continue 'send,
                            step => return Ok(step),
                        }
                    }
                }
            }

            if let Transmission::Streaming(file) = &mut self.transmission {
                if self.output.is_drained() && file.offset < file.size {
                    self.output.clear();
                    let want = (file.size - file.offset).min(self.output.capacity() as u64);
                    match self.output.fill_from(&mut file.file, want as usize) {
                        Ok(0) => {
                            tracing::warn!(
                                peer = %self.peer,
                                offset = file.offset,
                                size = file.size,
                                "File ended before its advertised length"
                            );
                            return Ok(Step::Close);
                        }
                        Ok(n) => {
                            file.offset += n as u64;
                            continue;
                        }
                        Err(e) => {
                            tracing::warn!(peer = %self.peer, error = %e, "File read failed mid-stream");
                            return Ok(Step::Close);
                        }
                    }
                }
            }

            match self.finish(ctx) {
                Step::Write => continue,
                step => return Ok(step),
            }
        }
    }

    /// Ends the current output: serve carried frames, or decide between
    /// closing and waiting for the next request.
    ///
    /// The close decision follows the last reply sent, so requests pipelined
    /// behind one without keep-alive are still answered.
    fn finish(&mut self, ctx: &ServeContext) -> Step {
        self.output.clear();
        self.transmission = Transmission::Idle;

        if self.closing {
            return Step::Close;
        }
        match self.serve_buffered(ctx) {
            Step::Read if !self.keep_alive => Step::Close,
            step => step,
        }
    }

    /// Serves complete frames at the front of the inbound buffer.
    fn serve_buffered(&mut self, ctx: &ServeContext) -> Step {
        let limit = self.inbound.capacity();
        let batch = count_frames(self.inbound.as_slice(), limit, ctx.max_pipeline);
        if batch > 1 {
            tracing::debug!(peer = %self.peer, requests = batch, "Pipelined requests");
        }

        let mut served = 0;
        while served < ctx.max_pipeline {
            let len = match next_frame(self.inbound.as_slice(), limit) {
                Frame::Complete(len) => len,
                Frame::Partial => {
                    if self.inbound.is_full() {
                        tracing::warn!(peer = %self.peer, "Request header exceeds buffer");
                        self.reject_oversized();
                    }
                    break;
                }
                Frame::TooLarge => {
                    if self.output.is_empty() {
                        tracing::warn!(peer = %self.peer, "Request body exceeds buffer");
                        self.reject_oversized();
                    }
                    break;
                }
            };

            let reply = {
                let frame = &self.inbound.as_slice()[..len];
                match parse_http_request(frame) {
                    Ok((request, _)) => {
                        tracing::debug!(
                            peer = %self.peer,
                            method = request.method.as_str(),
                            path = %request.path,
                            "Request"
                        );
                        handler::respond(&request, frame, ctx)
                    }
                    Err(e) => {
                        tracing::debug!(peer = %self.peer, error = ?e, "Rejected request");
                        Reply::error(e.status(), wants_keep_alive(frame))
                    }
                }
            };

            let status = reply.status;
            let ends_batch = reply.ends_batch;
            match self.stage(reply) {
                Stage::Deferred => break,
                stage => {
                    self.inbound.consume(len);
                    served += 1;
                    tracing::debug!(peer = %self.peer, status = status.as_u16(), "Response staged");
                    if ends_batch {
                        self.closing = true;
                        break;
                    }
                    if stage == Stage::Streaming {
                        break;
                    }
                }
            }
        }

        if served > 0 && !self.inbound.is_empty() {
            tracing::debug!(peer = %self.peer, bytes = self.inbound.len(), "Carrying bytes to next read");
        }

        if !self.output.is_empty() {
            Step::Write
        } else if self.peer_closed {
            Step::Close
        } else {
            Step::Read
        }
    }

    fn reject_oversized(&mut self) {
        self.inbound.clear();
        self.closing = true;
        self.stage(Reply::error(StatusCode::BadRequest, false));
    }

    /// Moves a reply into the output buffer.
    ///
    /// A reply that does not fit behind already staged output is deferred,
    /// never truncated. A file larger than an empty buffer starts streaming.
    fn stage(&mut self, reply: Reply) -> Stage {
        let fits = reply.full_len() <= self.output.remaining() as u64;
        let Reply {
            head,
            body,
            keep_alive,
            ..
        } = reply;

        match body {
            Body::Empty | Body::Bytes(_) if !fits => {
                if !self.output.is_empty() {
                    return Stage::Deferred;
                }
                return self.stage(Reply::error(StatusCode::InternalServerError, keep_alive));
            }
            Body::Empty => {
                self.output.try_append(&head);
            }
            Body::Bytes(bytes) => {
                self.output.try_append(&head);
                self.output.try_append(&bytes);
            }
            Body::File { mut file, size } => {
                if !fits && !self.output.is_empty() {
                    return Stage::Deferred;
                }

                let mark = self.output.len();
                self.output.try_append(&head);
                let want = if fits { size } else { self.output.remaining() as u64 };
                let loaded = self.output.fill_from(&mut file, want as usize);

                match loaded {
                    Ok(n) if n as u64 == want => {
                        self.keep_alive = keep_alive;
                        if fits {
                            self.transmission = Transmission::SingleShot;
                            return Stage::Buffered;
                        }
                        self.transmission = Transmission::Streaming(FileStream {
                            file,
                            offset: n as u64,
                            size,
                        });
                        return Stage::Streaming;
                    }
                    Ok(n) => {
                        tracing::warn!(peer = %self.peer, read = n, expected = want, "Short read on file");
                    }
                    Err(e) => {
                        tracing::warn!(peer = %self.peer, error = %e, "File read failed");
                    }
                }

                self.output.truncate(mark);
                return self.stage(Reply::error(StatusCode::InternalServerError, keep_alive));
            }
        }

        self.keep_alive = keep_alive;
        self.transmission = Transmission::SingleShot;
        Stage::Buffered
    }
}
