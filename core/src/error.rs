#![deny(unsafe_code)]
//! Engine error types
//!
//! None of these ever leave the engine: setup failures are retried or become
//! a [`SyncOutcome`](crate::outcome::SyncOutcome), parse failures are
//! logged and skipped, and sensor faults steer the device state machine.

/// A failed network setup step inside one fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepFailure {
    /// Hostname did not resolve to an IPv4 address
    Dns,
    /// No socket could be allocated
    Socket,
    /// TCP connect was refused or timed out
    Connect,
    /// Request was not fully sent
    Send,
    /// Receive timeout could not be configured
    TimeoutConfig,
}

impl core::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Dns => write!(f, "DNS lookup failed"),
            Self::Socket => write!(f, "Failed to allocate socket"),
            Self::Connect => write!(f, "Socket connect failed"),
            Self::Send => write!(f, "Socket send failed"),
            Self::TimeoutConfig => write!(f, "Failed to set socket receiving timeout"),
        }
    }
}

impl core::error::Error for StepFailure {}

/// Trigger source read errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerError {
    /// Identity register does not hold the expected value
    ///
    /// Unverified hardware: the device stops evaluating gestures for good.
    IdentityMismatch { found: u8 },
    /// Bus transaction failed on this sample only
    Bus,
}

impl core::fmt::Display for TriggerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IdentityMismatch { found } => {
                write!(f, "Sensor identity mismatch (found 0x{:02X})", found)
            }
            Self::Bus => write!(f, "Sensor bus error"),
        }
    }
}

impl core::error::Error for TriggerError {}

/// Why a response chunk yielded no date/time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Chunk is shorter than the fixed body offset
    OffsetOutOfBounds,
    /// Still inside the header block
    HeaderIncomplete,
    /// No `{` in the body seen so far
    NoObject,
    /// JSON object not closed yet
    ObjectIncomplete,
    /// Not JSON, no `datetime` field, or `datetime` is not a string
    Json,
    /// `datetime` has no `T` between date and time
    MissingDateSeparator,
    /// Date or time does not fit the fixed-capacity fields
    FieldTooLong,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OffsetOutOfBounds => write!(f, "Chunk shorter than body offset"),
            Self::HeaderIncomplete => write!(f, "Header block incomplete"),
            Self::NoObject => write!(f, "No JSON object in body"),
            Self::ObjectIncomplete => write!(f, "JSON object incomplete"),
            Self::Json => write!(f, "No string datetime field"),
            Self::MissingDateSeparator => write!(f, "datetime has no date/time separator"),
            Self::FieldTooLong => write!(f, "Date or time field too long"),
        }
    }
}

impl core::error::Error for ParseError {}
