#![deny(unsafe_code)]
//! Trigger sources
//!
//! Both variants answer the same question once per poll tick: has a wake
//! condition newly become true? The tick period belongs to the source (the
//! caller sleeps between polls), so nothing here keeps a timer.
//!
//! The variants differ in edge semantics:
//! - the button is level-triggered: every tick that reads "pressed" fires
//! - the gesture is edge-triggered through [`GestureDebouncer`]

use embedded_hal::digital::InputPin;
use hal_abstractions::AccelRegisters;

use crate::config::{mpu6050, ButtonConfig, GestureConfig};
use crate::error::TriggerError;
use crate::gesture::GestureDebouncer;

/// Accelerometer axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// High byte register of this axis' reading
    pub const fn register(self) -> u8 {
        match self {
            Self::X => mpu6050::ACCEL_XOUT_H,
            Self::Y => mpu6050::ACCEL_YOUT_H,
            Self::Z => mpu6050::ACCEL_ZOUT_H,
        }
    }
}

/// One raw accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSample {
    pub axis: Axis,
    pub value: i16,
}

/// Logical button level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonLevel {
    Active,
    Inactive,
}

/// Wake signal, consumed once by the device state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerEvent {
    None,
    ButtonPress,
    GestureRaise,
}

/// Polling contract shared by every trigger variant
pub trait TriggerSource {
    /// Time the caller sleeps between two polls
    fn poll_period_ms(&self) -> u32;

    /// Read the input once and report a wake event, if any
    fn poll(&mut self) -> Result<TriggerEvent, TriggerError>;

    /// Bring the sensor out of low-power mode before a poll
    fn wake(&mut self) -> Result<(), TriggerError> {
        Ok(())
    }

    /// Put the sensor back into low-power mode after a poll
    fn sleep(&mut self) -> Result<(), TriggerError> {
        Ok(())
    }
}

/// Push button on a digital input
pub struct ButtonTrigger<P> {
    pin: P,
    config: ButtonConfig,
}

impl<P: InputPin> ButtonTrigger<P> {
    pub fn new(pin: P, config: ButtonConfig) -> Self {
        Self { pin, config }
    }

    /// Read the current logical level
    pub fn sample(&mut self) -> Result<ButtonLevel, TriggerError> {
        let low = self.pin.is_low().map_err(|_| TriggerError::Bus)?;
        Ok(if low == self.config.active_low {
            ButtonLevel::Active
        } else {
            ButtonLevel::Inactive
        })
    }
}

impl<P: InputPin> TriggerSource for ButtonTrigger<P> {
    fn poll_period_ms(&self) -> u32 {
        self.config.poll_ms
    }

    fn poll(&mut self) -> Result<TriggerEvent, TriggerError> {
        Ok(match self.sample()? {
            ButtonLevel::Active => TriggerEvent::ButtonPress,
            ButtonLevel::Inactive => TriggerEvent::None,
        })
    }
}

/// Wrist-raise detection on one accelerometer axis
pub struct GestureTrigger<A> {
    sensor: A,
    config: GestureConfig,
    debouncer: GestureDebouncer,
}

impl<A: AccelRegisters> GestureTrigger<A> {
    pub fn new(sensor: A, config: GestureConfig) -> Self {
        Self {
            sensor,
            config,
            debouncer: GestureDebouncer::new(),
        }
    }

    pub fn debouncer(&self) -> &GestureDebouncer {
        &self.debouncer
    }

    /// Verify the sensor identity, then read the configured axis
    pub fn sample(&mut self) -> Result<SensorSample, TriggerError> {
        let identity = self
            .sensor
            .read_identity_register()
            .map_err(|_| TriggerError::Bus)?;
        if identity != self.config.expected_identity {
            return Err(TriggerError::IdentityMismatch { found: identity });
        }

        let axis = self.config.axis;
        let value = self
            .sensor
            .read_axis_register(axis.register())
            .map_err(|_| TriggerError::Bus)?;
        Ok(SensorSample { axis, value })
    }
}

impl<A: AccelRegisters> TriggerSource for GestureTrigger<A> {
    fn poll_period_ms(&self) -> u32 {
        self.config.poll_ms
    }

    fn poll(&mut self) -> Result<TriggerEvent, TriggerError> {
        let sample = self.sample()?;
        let in_window = self.config.window.contains(&sample.value);
        debug!("{:?} axis: {} (in window: {})", sample.axis, sample.value, in_window);
        Ok(if self.debouncer.update(in_window) {
            TriggerEvent::GestureRaise
        } else {
            TriggerEvent::None
        })
    }

    fn wake(&mut self) -> Result<(), TriggerError> {
        self.sensor
            .write_register(mpu6050::PWR_MGMT_1, mpu6050::WAKE)
            .map_err(|_| TriggerError::Bus)
    }

    fn sleep(&mut self) -> Result<(), TriggerError> {
        self.sensor
            .write_register(mpu6050::PWR_MGMT_1, mpu6050::SLEEP)
            .map_err(|_| TriggerError::Bus)
    }
}
