#![deny(unsafe_code)]
//! Result of one fetch cycle

use heapless::String;

use crate::error::StepFailure;

/// Capacity of each [`ParsedTime`] field
pub const FIELD_CAPACITY: usize = 24;

/// Date and time text recovered from a response
///
/// Immutable once built; the reporter renders it and drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParsedTime {
    date: String<FIELD_CAPACITY>,
    time: String<FIELD_CAPACITY>,
}

impl ParsedTime {
    /// Build from borrowed text; `None` if either part overflows
    pub fn new(date: &str, time: &str) -> Option<Self> {
        Some(Self {
            date: String::try_from(date).ok()?,
            time: String::try_from(time).ok()?,
        })
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }
}

/// What a fetch cycle (or a sensor check) produced
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncOutcome {
    Success(ParsedTime),
    DnsFailure,
    SocketFailure,
    ConnectFailure,
    SendFailure,
    TimeoutConfigFailure,
    /// Exchange finished without a single usable response chunk
    NoParsableField,
    /// Accelerometer failed its identity check
    SensorFault,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<StepFailure> for SyncOutcome {
    fn from(step: StepFailure) -> Self {
        match step {
            StepFailure::Dns => Self::DnsFailure,
            StepFailure::Socket => Self::SocketFailure,
            StepFailure::Connect => Self::ConnectFailure,
            StepFailure::Send => Self::SendFailure,
            StepFailure::TimeoutConfig => Self::TimeoutConfigFailure,
        }
    }
}
