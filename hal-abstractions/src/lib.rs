//! Hardware abstraction traits for the wake-clock firmware
//!
//! This crate defines the collaborators the engine in `wake-clock-core`
//! talks to: a text display, the accelerometer register file and a blocking
//! style TCP network stack. BSPs implement these traits; the engine never
//! sees a HAL type.
//!
//! Button input is not abstracted here: the engine takes any
//! `embedded_hal::digital::InputPin`.

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod accel;
pub mod display;
pub mod network;

pub use accel::AccelRegisters;
pub use display::{Color, Display};
pub use network::{NetworkStack, StreamSocket};
