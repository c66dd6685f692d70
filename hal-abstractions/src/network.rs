//! Network collaborator: DNS and stream sockets
//!
//! The shape mirrors a BSD socket sequence (resolve, open, connect, send,
//! set receive timeout, receive, close) so the engine can keep per-step
//! failure handling. Sending and receiving go through `embedded-io-async`:
//!
//! - `Write::write` is "send" and returns the number of bytes accepted
//! - `Read::read` is "receive": `Ok(0)` is end of stream, and a receive
//!   timeout is reported as an error whose kind is `ErrorKind::TimedOut`

use core::future::Future;
use core::net::{Ipv4Addr, SocketAddrV4};

use embedded_io_async::{Read, Write};

/// A network stack that is already up (link + address configured)
pub trait NetworkStack {
    /// Resolution or socket allocation error
    type Error: core::fmt::Debug;

    /// Connection-oriented socket borrowed from the stack
    type Socket<'a>: StreamSocket
    where
        Self: 'a;

    /// Resolve `hostname` to its first IPv4 address
    fn resolve(&mut self, hostname: &str) -> impl Future<Output = Result<Ipv4Addr, Self::Error>>;

    /// Allocate a new, unconnected stream socket
    fn open_stream_socket(&mut self) -> Result<Self::Socket<'_>, Self::Error>;
}

/// Connection-oriented byte stream
pub trait StreamSocket: Read + Write {
    /// Connect to `remote`
    fn connect(&mut self, remote: SocketAddrV4) -> impl Future<Output = Result<(), Self::Error>>;

    /// Bound every subsequent `read` call; `None` waits forever
    fn set_receive_timeout(&mut self, timeout_ms: Option<u64>) -> Result<(), Self::Error>;

    /// Release the connection. Safe to call on a socket that never connected.
    fn close(&mut self);
}
