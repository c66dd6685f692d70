//! Platform-agnostic core logic for the wake-clock firmware
//!
//! The device sleeps, wakes on a button press or a wrist-raise gesture,
//! fetches the current date and time from an HTTP time service and shows it
//! before going back to sleep. This crate holds every stateful decision in
//! that cycle and has NO hardware dependencies; boards plug in through the
//! traits in `hal-abstractions`.
//!
//! - [`trigger`]: button and accelerometer trigger sources
//! - [`gesture`]: rising-edge latch for the wrist-raise pose
//! - [`client`]: time fetch cycle (DNS, connect, send, timed read, retries)
//! - [`parser`]: date/time extraction from the raw response bytes
//! - [`report`]: outcome to display rendering
//! - [`device`]: the top-level Sleeping/Fetching/Displaying loop

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

#[macro_use]
mod fmt;

pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod gesture;
pub mod outcome;
pub mod parser;
pub mod report;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use client::{FetchAttempt, TimeSyncClient};
pub use config::{BodyFraming, DeviceConfig, FetchConfig, RetryPolicy, RetrySchedule};
pub use device::{Device, DeviceState};
pub use error::{ParseError, StepFailure, TriggerError};
pub use gesture::{GestureDebouncer, LatchState};
pub use outcome::{ParsedTime, SyncOutcome};
pub use parser::ResponseParser;
pub use report::Reporter;
pub use trigger::{ButtonTrigger, GestureTrigger, TriggerEvent, TriggerSource};
