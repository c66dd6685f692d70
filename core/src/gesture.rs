#![deny(unsafe_code)]
//! Wrist-raise latch
//!
//! Turns a stream of "in raise window / out of window" samples into a single
//! event per sustained raise:
//!
//! ```text
//! in window   ___/‾‾‾‾‾‾‾‾\____/‾‾\___
//! event          ^             ^
//! state       A  L  L  L  A    L  A
//! ```
//!
//! There is no timed hysteresis: one out-of-window sample re-arms the latch.

/// Latch state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LatchState {
    /// Waiting for the pose; the next in-window sample fires
    #[default]
    Armed,
    /// Pose held and already reported
    Latched,
}

/// Rising-edge detector for the raise pose
#[derive(Debug, Clone, Default)]
pub struct GestureDebouncer {
    state: LatchState,
}

impl GestureDebouncer {
    pub const fn new() -> Self {
        Self {
            state: LatchState::Armed,
        }
    }

    pub fn state(&self) -> LatchState {
        self.state
    }

    /// Feed one sample's window check; returns `true` exactly on the
    /// Armed -> Latched edge
    pub fn update(&mut self, in_window: bool) -> bool {
        match (self.state, in_window) {
            (LatchState::Armed, true) => {
                self.state = LatchState::Latched;
                true
            }
            (LatchState::Latched, true) => false,
            (_, false) => {
                self.state = LatchState::Armed;
                false
            }
        }
    }
}
