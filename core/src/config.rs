#![deny(unsafe_code)]
//! Compile-time thresholds and the configuration structs built from them
//!
//! Every number the engine depends on lives here as a constant. The structs
//! below only group those constants with `Default` implementations so that
//! boards and tests can override a field without touching the engine.

use core::ops::RangeInclusive;

use crate::error::StepFailure;
use crate::trigger::Axis;

/// Raw axis window for the wrist-raise pose
///
/// At the ±2 g full-scale setting (16384 LSB/g) this is roughly 0.9 g to
/// 1.1 g: gravity projects mostly onto the designated axis. Calibration
/// constant, not derived at runtime.
pub const GESTURE_WINDOW: RangeInclusive<i16> = 14745..=18022;

/// The only identity register value accepted as a working sensor
pub const EXPECTED_IDENTITY: u8 = 0x68;

/// MPU-6050 register map (the subset the trigger source touches)
pub mod mpu6050 {
    /// Identity register
    pub const WHO_AM_I: u8 = 0x75;
    /// Power management 1: sleep bit lives here
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const ACCEL_YOUT_H: u8 = 0x3D;
    pub const ACCEL_ZOUT_H: u8 = 0x3F;
    /// `PWR_MGMT_1` value: SLEEP=1
    pub const SLEEP: u8 = 0x40;
    /// `PWR_MGMT_1` value: SLEEP=0, internal oscillator
    pub const WAKE: u8 = 0x00;
}

/// Button poll period; the period itself is the only debounce
pub const BUTTON_POLL_MS: u32 = 50;

/// Accelerometer poll period
pub const GESTURE_POLL_MS: u32 = 1000;

/// Time service host
pub const TIME_SERVER: &str = "worldtimeapi.org";

/// Time service TCP port
pub const TIME_SERVER_PORT: u16 = 80;

/// Request sent verbatim on every fetch
pub const TIME_REQUEST: &str = concat!(
    "GET http://worldtimeapi.org/api/ip HTTP/1.1\r\n",
    "Host: worldtimeapi.org\r\n",
    "User-Agent: esp-idf/1.0 esp32\r\n",
    "\r\n"
);

/// Bytes requested per receive call
pub const RX_CHUNK_LEN: usize = 2048;

/// Receive timeout configured on the socket before reading
pub const RECEIVE_TIMEOUT_MS: u64 = 5000;

/// Byte offset of the JSON body in the first receive buffer
///
/// Only true because the service's header block happens to have a stable
/// size. See [`BodyFraming::FixedOffset`].
pub const LEGACY_BODY_OFFSET: usize = 603;

/// "Fetching" message hold before the fetch starts
pub const ANNOUNCE_MS: u32 = 1000;

/// Result message hold before the display goes dark
pub const DWELL_MS: u32 = 3000;

/// Hardware-fault message on-time
pub const FAULT_ON_MS: u32 = 5000;

/// Hardware-fault message off-time
pub const FAULT_OFF_MS: u32 = 60_000;

/// How the JSON body is located in the response stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BodyFraming {
    /// Slice every receive buffer at a fixed offset and parse from there
    ///
    /// Breaks as soon as the service adds, drops or resizes a header.
    FixedOffset(usize),
    /// Skip the header block up to the first blank line, de-chunk the body
    /// if needed, then parse
    HeaderDelimited,
}

impl Default for BodyFraming {
    fn default() -> Self {
        Self::HeaderDelimited
    }
}

/// Retry budget and backoff for one setup step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Failures allowed before the fetch cycle gives up; `None` never gives up
    pub max_attempts: Option<u32>,
    /// Wait after each failure
    pub backoff_ms: u32,
}

impl RetryPolicy {
    pub const fn bounded(max_attempts: u32, backoff_ms: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff_ms,
        }
    }

    pub const fn unbounded(backoff_ms: u32) -> Self {
        Self {
            max_attempts: None,
            backoff_ms,
        }
    }

    /// Whether `failures` failed attempts use up the budget
    pub fn is_exhausted(&self, failures: u32) -> bool {
        matches!(self.max_attempts, Some(max) if failures >= max)
    }
}

/// Per-step retry policies for the fetch cycle
///
/// DNS failures retry resolution only; every other step restarts the cycle
/// from resolution. Counters are per cycle and per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetrySchedule {
    pub dns: RetryPolicy,
    pub socket: RetryPolicy,
    pub connect: RetryPolicy,
    pub send: RetryPolicy,
    pub timeout_config: RetryPolicy,
}

impl RetrySchedule {
    /// Retry forever with the default backoffs
    ///
    /// A network that never comes back keeps the device in the fetch cycle
    /// until it is reset.
    pub const fn unbounded() -> Self {
        Self {
            dns: RetryPolicy::unbounded(1000),
            socket: RetryPolicy::unbounded(1000),
            connect: RetryPolicy::unbounded(4000),
            send: RetryPolicy::unbounded(4000),
            timeout_config: RetryPolicy::unbounded(4000),
        }
    }

    /// Policy governing a failure of `step`
    pub fn policy(&self, step: StepFailure) -> RetryPolicy {
        match step {
            StepFailure::Dns => self.dns,
            StepFailure::Socket => self.socket,
            StepFailure::Connect => self.connect,
            StepFailure::Send => self.send,
            StepFailure::TimeoutConfig => self.timeout_config,
        }
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            dns: RetryPolicy::bounded(10, 1000),
            socket: RetryPolicy::bounded(5, 1000),
            connect: RetryPolicy::bounded(5, 4000),
            send: RetryPolicy::bounded(5, 4000),
            timeout_config: RetryPolicy::bounded(5, 4000),
        }
    }
}

/// Time service client configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FetchConfig {
    /// Hostname to resolve
    pub host: &'static str,
    /// TCP port
    pub port: u16,
    /// Request bytes, sent verbatim
    pub request: &'static str,
    /// Receive timeout set on the socket before reading
    pub receive_timeout_ms: u64,
    /// Body location strategy
    pub framing: BodyFraming,
    /// Setup-step retry policies
    pub retry: RetrySchedule,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            host: TIME_SERVER,
            port: TIME_SERVER_PORT,
            request: TIME_REQUEST,
            receive_timeout_ms: RECEIVE_TIMEOUT_MS,
            framing: BodyFraming::default(),
            retry: RetrySchedule::default(),
        }
    }
}

/// Button trigger configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonConfig {
    pub poll_ms: u32,
    /// Pressed reads low (pull-up wiring)
    pub active_low: bool,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            poll_ms: BUTTON_POLL_MS,
            active_low: true,
        }
    }
}

/// Accelerometer trigger configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GestureConfig {
    pub poll_ms: u32,
    /// Axis gravity should fall on when the wrist is raised
    pub axis: Axis,
    pub window: RangeInclusive<i16>,
    pub expected_identity: u8,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            poll_ms: GESTURE_POLL_MS,
            axis: Axis::Z,
            window: GESTURE_WINDOW,
            expected_identity: EXPECTED_IDENTITY,
        }
    }
}

/// Top-level device configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub announce_ms: u32,
    pub dwell_ms: u32,
    pub fault_on_ms: u32,
    pub fault_off_ms: u32,
    pub fetch: FetchConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            announce_ms: ANNOUNCE_MS,
            dwell_ms: DWELL_MS,
            fault_on_ms: FAULT_ON_MS,
            fault_off_ms: FAULT_OFF_MS,
            fetch: FetchConfig::default(),
        }
    }
}
