use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::Context;
use mio::net::TcpListener;
use socket2::{Domain, Protocol, Socket, Type};

/// Resolves `addr` to the first socket address it names.
pub fn resolve(addr: &str) -> anyhow::Result<SocketAddr> {
    addr.to_socket_addrs()
        .with_context(|| format!("invalid listen address {}", addr))?
        .next()
        .with_context(|| format!("listen address {} resolved to nothing", addr))
}

/// Creates a non-blocking listening socket with `SO_REUSEADDR` set.
pub fn bind(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;
    socket.set_nonblocking(true)?;

    Ok(TcpListener::from_std(socket.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn accept_one(listener: &TcpListener) -> mio::net::TcpStream {
        for _ in 0..200 {
            match listener.accept() {
                Ok((stream, _)) => return stream,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => panic!("accept failed: {}", e),
            }
        }
        panic!("no connection accepted");
    }

    #[test]
    fn bound_listener_is_nonblocking() {
        let listener = bind("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let err = listener.accept().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        let _client = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        accept_one(&listener);
    }

    #[test]
    fn rebind_after_server_side_close() {
        let listener = bind("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();

        // Closing the accepted side first leaves it in TIME_WAIT.
        drop(accept_one(&listener));
        std::thread::sleep(Duration::from_millis(50));
        drop(client);
        drop(listener);

        assert!(bind(addr, 16).is_ok());
    }

    #[test]
    fn unresolvable_address_is_error() {
        assert!(resolve("not an address").is_err());
        assert_eq!(resolve("127.0.0.1:80").unwrap().port(), 80);
    }
}
