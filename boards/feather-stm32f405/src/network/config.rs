#![deny(unsafe_code)]
#![deny(warnings)]
//! Network stack configuration

/// Static network parameters; addressing comes from DHCP
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// MAC address for Ethernet (locally administered)
    pub mac_addr: [u8; 6],
    /// Random seed for network stack
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac_addr: [0x02, 0x00, 0x00, 0x12, 0x34, 0x56],
            seed: 0x1234_5678_u64,
        }
    }
}
