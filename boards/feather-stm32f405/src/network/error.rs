#![deny(unsafe_code)]
#![deny(warnings)]
//! Network adapter error types

use defmt::Format;

/// Errors surfaced by the embassy-net adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum NetError {
    /// DNS query failed
    DnsError,
    /// DNS answered, but with no IPv4 address
    NoIpv4Address,
    /// TCP connect failed
    ConnectError,
    /// Peer reset the connection
    ConnectionReset,
    /// No data within the configured receive timeout
    Timeout,
}

impl core::fmt::Display for NetError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::NoIpv4Address => write!(f, "No IPv4 address in DNS answer"),
            Self::ConnectError => write!(f, "Connect failed"),
            Self::ConnectionReset => write!(f, "Connection reset"),
            Self::Timeout => write!(f, "Receive timeout"),
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for NetError {}

impl embedded_io_async::Error for NetError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::ConnectionReset => embedded_io_async::ErrorKind::ConnectionReset,
            Self::ConnectError => embedded_io_async::ErrorKind::ConnectionRefused,
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}
