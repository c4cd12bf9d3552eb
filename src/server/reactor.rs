use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use mio::event::Event;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::http::connection::{Connection, Step};
use crate::http::handler::ServeContext;
use crate::server::listener;
use crate::server::registry::{Registry, LISTENER, WAKER};

const EVENTS_CAPACITY: usize = 1024;

/// Stops a running [`Server`] from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            warn!(error = %e, "Failed to wake the event loop");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// What a readiness event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Accept,
    Wake,
    Readable(Token),
    Writable(Token),
    /// The connection was released earlier in this batch.
    Stale(Token),
}

impl Dispatch {
    /// A socket is registered for one direction at a time, so that
    /// direction is the event's; error and hang-up events follow it.
    fn of(event: &Event, connections: &Registry<Connection<TcpStream>>) -> Self {
        match event.token() {
            LISTENER => Dispatch::Accept,
            WAKER => Dispatch::Wake,
            token => match connections.get(token) {
                None => Dispatch::Stale(token),
                Some(conn) if conn.interest() == Interest::WRITABLE => Dispatch::Writable(token),
                Some(_) => Dispatch::Readable(token),
            },
        }
    }
}

/// Single-threaded reactor owning the listener and every connection.
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    local_addr: SocketAddr,
    connections: Registry<Connection<TcpStream>>,
    ctx: ServeContext,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Binds the listener and prepares the event loop.
    ///
    /// Failing to bind, to create the poll, or to register the listener is
    /// fatal; nothing else the server does afterwards is.
    pub fn bind(cfg: &Config) -> anyhow::Result<Self> {
        cfg.validate()?;

        let addr = listener::resolve(&cfg.server.listen_addr)?;
        let backlog = u32::try_from(cfg.server.max_connections).unwrap_or(u32::MAX);
        let mut listener =
            listener::bind(addr, backlog).with_context(|| format!("failed to bind {}", addr))?;
        let local_addr = listener.local_addr().context("reading listener address")?;

        let poll = Poll::new().context("creating poll instance")?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .context("registering listener")?;
        let waker = Waker::new(poll.registry(), WAKER).context("creating waker")?;

        info!("Listening on {}", local_addr);
        info!(root = %cfg.static_files.root.display(), "Serving static files");

        Ok(Self {
            poll,
            listener,
            local_addr,
            connections: Registry::new(cfg.server.max_connections),
            ctx: ServeContext::from_config(cfg),
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
                waker: Arc::new(waker),
            },
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Runs the event loop until the shutdown handle fires.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);

        while !self.shutdown.is_shutdown() {
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e).context("waiting for events");
            }

            for event in events.iter() {
                match Dispatch::of(event, &self.connections) {
                    Dispatch::Accept => self.accept(),
                    Dispatch::Wake => debug!("Event loop woken"),
                    Dispatch::Readable(token) => self.ready(token, false),
                    Dispatch::Writable(token) => self.ready(token, true),
                    Dispatch::Stale(token) => {
                        debug!(token = token.0, "Event for a released connection")
                    }
                }
            }
        }

        info!(open = self.connections.len(), "Shutting down");
        for token in self.connections.tokens() {
            self.close(token);
        }
        Ok(())
    }

    /// Accepts until the listener would block.
    fn accept(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if affects_one_connection(&e) => {
                    warn!(error = %e, "Accept failed, skipping connection");
                }
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    break;
                }
            }
        }
    }

    fn admit(&mut self, stream: TcpStream, peer: SocketAddr) {
        let conn = Connection::new(stream, peer, &self.ctx);
        let token = match self.connections.insert(conn) {
            Ok(token) => token,
            Err(_) => {
                warn!(peer = %peer, limit = self.connections.capacity(), "Connection table full, rejecting");
                return;
            }
        };

        let Some(conn) = self.connections.get_mut(token) else {
            return;
        };
        let registered = self
            .poll
            .registry()
            .register(conn.stream_mut(), token, Interest::READABLE);
        if let Err(e) = registered {
            error!(peer = %peer, error = %e, "Failed to register connection");
            self.connections.remove(token);
            return;
        }

        info!("Accepted connection from {}", peer);
    }

    /// Runs one handler and applies the step it returns.
    fn ready(&mut self, token: Token, writable: bool) {
        let Some(conn) = self.connections.get_mut(token) else {
            return;
        };

        let result = if writable {
            conn.on_writable(&self.ctx)
        } else {
            conn.on_readable(&self.ctx)
        };
        let step = match result {
            Ok(step) => step,
            Err(e) => {
                warn!(peer = %conn.peer(), error = %e, "Connection error");
                Step::Close
            }
        };

        let Some(interest) = step.interest() else {
            self.close(token);
            return;
        };
        if conn.interest() == interest {
            return;
        }

        let registered = self
            .poll
            .registry()
            .reregister(conn.stream_mut(), token, interest);
        match registered {
            Ok(()) => conn.set_interest(interest),
            Err(e) => {
                error!(peer = %conn.peer(), error = %e, "Failed to update interest");
                self.close(token);
            }
        }
    }

    fn close(&mut self, token: Token) {
        let Some(mut conn) = self.connections.remove(token) else {
            return;
        };
        if let Err(e) = self.poll.registry().deregister(conn.stream_mut()) {
            debug!(peer = %conn.peer(), error = %e, "Deregister failed");
        }
        info!("Client {} disconnected", conn.peer());
    }
}

/// Accept errors that concern only the connection being accepted; the rest
/// of the backlog can still be served.
fn affects_one_connection(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::PermissionDenied
    )
}
