#![deny(unsafe_code)]
#![deny(warnings)]
//! TCP stream socket for the time-sync engine
//!
//! Wraps `embassy_net::tcp::TcpSocket` and adds the one thing it lacks: a
//! per-read receive timeout, raced against the read with `select`.

use core::net::SocketAddrV4;

use defmt::{debug, warn};
use embassy_futures::select::{select, Either};
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::{Duration, Timer};
use embedded_io_async::{ErrorType, Read, Write};
use hal_abstractions::StreamSocket;

use super::error::NetError;

/// TCP socket with an optional receive timeout
pub struct EmbassyTcpSocket<'a> {
    socket: TcpSocket<'a>,
    receive_timeout: Option<Duration>,
}

impl<'a> EmbassyTcpSocket<'a> {
    /// Create a socket over caller-provided buffers
    pub fn new(stack: Stack<'a>, rx_buffer: &'a mut [u8], tx_buffer: &'a mut [u8]) -> Self {
        Self {
            socket: TcpSocket::new(stack, rx_buffer, tx_buffer),
            receive_timeout: None,
        }
    }
}

impl ErrorType for EmbassyTcpSocket<'_> {
    type Error = NetError;
}

impl Read for EmbassyTcpSocket<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some(timeout) = self.receive_timeout else {
            return self
                .socket
                .read(buf)
                .await
                .map_err(|_| NetError::ConnectionReset);
        };

        match select(Timer::after(timeout), self.socket.read(buf)).await {
            Either::First(_) => Err(NetError::Timeout),
            Either::Second(result) => result.map_err(|_| NetError::ConnectionReset),
        }
    }
}

impl Write for EmbassyTcpSocket<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket
            .write(buf)
            .await
            .map_err(|_| NetError::ConnectionReset)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket
            .flush()
            .await
            .map_err(|_| NetError::ConnectionReset)
    }
}

impl StreamSocket for EmbassyTcpSocket<'_> {
    async fn connect(&mut self, remote: SocketAddrV4) -> Result<(), Self::Error> {
        let endpoint = IpEndpoint::new(IpAddress::Ipv4(*remote.ip()), remote.port());
        self.socket.connect(endpoint).await.map_err(|e| {
            warn!("TCP connect error: {:?}", e);
            NetError::ConnectError
        })
    }

    fn set_receive_timeout(&mut self, timeout_ms: Option<u64>) -> Result<(), Self::Error> {
        self.receive_timeout = timeout_ms.map(Duration::from_millis);
        Ok(())
    }

    fn close(&mut self) {
        debug!("Closing TCP socket");
        self.socket.close();
        self.socket.abort();
    }
}
