#![deny(unsafe_code)]
#![deny(warnings)]
//! `NetworkStack` over an embassy-net `Stack`

use core::net::Ipv4Addr;

use defmt::{debug, warn};
use embassy_net::dns::DnsQueryType;
use embassy_net::{IpAddress, Stack};
use hal_abstractions::NetworkStack;

use super::error::NetError;
use super::socket::EmbassyTcpSocket;

/// TCP receive buffer; a whole response fits
pub const RX_BUFFER_LEN: usize = 4096;

/// TCP transmit buffer; the request is well under this
pub const TX_BUFFER_LEN: usize = 1024;

/// DNS and TCP on a configured embassy-net stack
///
/// Owns one pair of socket buffers, so at most one socket exists at a
/// time. The borrow checker enforces that through `open_stream_socket`.
pub struct EmbassyNetwork<'d> {
    stack: Stack<'d>,
    rx_buffer: &'d mut [u8; RX_BUFFER_LEN],
    tx_buffer: &'d mut [u8; TX_BUFFER_LEN],
}

impl<'d> EmbassyNetwork<'d> {
    pub fn new(
        stack: Stack<'d>,
        rx_buffer: &'d mut [u8; RX_BUFFER_LEN],
        tx_buffer: &'d mut [u8; TX_BUFFER_LEN],
    ) -> Self {
        Self {
            stack,
            rx_buffer,
            tx_buffer,
        }
    }
}

impl<'d> NetworkStack for EmbassyNetwork<'d> {
    type Error = NetError;
    type Socket<'a>
        = EmbassyTcpSocket<'a>
    where
        Self: 'a;

    #[allow(unreachable_patterns)] // IPv6 is compiled out
    async fn resolve(&mut self, hostname: &str) -> Result<Ipv4Addr, Self::Error> {
        let addresses = self
            .stack
            .dns_query(hostname, DnsQueryType::A)
            .await
            .map_err(|e| {
                warn!("DNS query for {} failed: {:?}", hostname, e);
                NetError::DnsError
            })?;
        debug!("DNS returned {} address(es)", addresses.len());

        addresses
            .iter()
            .find_map(|address| match address {
                IpAddress::Ipv4(v4) => Some(*v4),
                _ => None,
            })
            .ok_or(NetError::NoIpv4Address)
    }

    fn open_stream_socket(&mut self) -> Result<Self::Socket<'_>, Self::Error> {
        Ok(EmbassyTcpSocket::new(
            self.stack,
            &mut self.rx_buffer[..],
            &mut self.tx_buffer[..],
        ))
    }
}
