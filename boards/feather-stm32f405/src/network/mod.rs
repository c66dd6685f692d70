#![deny(unsafe_code)]
#![deny(warnings)]
//! embassy-net glue for the time-sync engine

pub mod config;
pub mod error;
pub mod manager;
pub mod socket;
pub mod stack;

pub use config::NetworkConfig;
pub use stack::EmbassyNetwork;
