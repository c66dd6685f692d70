#![deny(unsafe_code)]
#![deny(warnings)]
//! Network readiness
//!
//! The device loop only starts once DHCP has configured the stack.

use defmt::info;
use embassy_net::Stack;

/// Wait for network configuration (DHCP) and log the lease
pub async fn wait_for_config(stack: &Stack<'_>) {
    info!("Waiting for DHCP...");
    stack.wait_config_up().await;
    info!("Network is UP!");

    if let Some(config) = stack.config_v4() {
        let [a, b, c, d] = config.address.address().octets();
        info!("IP: {}.{}.{}.{}/{}", a, b, c, d, config.address.prefix_len());

        if let Some(gateway) = config.gateway {
            let [a, b, c, d] = gateway.octets();
            info!("Gateway: {}.{}.{}.{}", a, b, c, d);
        }
        for server in config.dns_servers.iter() {
            let [a, b, c, d] = server.octets();
            info!("DNS server: {}.{}.{}.{}", a, b, c, d);
        }
    }
}
