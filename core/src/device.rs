#![deny(unsafe_code)]
//! Top-level device loop
//!
//! One cooperative task drives everything: trigger polling, the fetch
//! cycle and the display. A fetch in progress blocks polling entirely, and
//! the device holds the only handle to the display.
//!
//! ```text
//! Sleeping --event--> AwaitingFetch --> Fetching --> Displaying --> Sleeping
//!    |
//!    +--identity mismatch--> Faulted (5 s on / 60 s off, until reset)
//! ```

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{Display, NetworkStack};

use crate::client::TimeSyncClient;
use crate::config::DeviceConfig;
use crate::error::TriggerError;
use crate::fmt::Debug2Format;
use crate::outcome::SyncOutcome;
use crate::report::{render_lines, Reporter, FETCHING, SENSOR_FAULT};
use crate::trigger::{TriggerEvent, TriggerSource};

/// Observable device state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    Sleeping,
    AwaitingFetch,
    Fetching,
    Displaying,
    Faulted,
}

/// Internal state; `Displaying` carries the outcome to render
#[derive(Debug)]
enum Phase {
    Sleeping,
    AwaitingFetch,
    Fetching,
    Displaying(SyncOutcome),
    Faulted,
}

impl Phase {
    fn state(&self) -> DeviceState {
        match self {
            Self::Sleeping => DeviceState::Sleeping,
            Self::AwaitingFetch => DeviceState::AwaitingFetch,
            Self::Fetching => DeviceState::Fetching,
            Self::Displaying(_) => DeviceState::Displaying,
            Self::Faulted => DeviceState::Faulted,
        }
    }
}

/// The device: a trigger source, a display, a network stack and a delay
pub struct Device<T, D, N, W> {
    trigger: T,
    display: D,
    network: N,
    delay: W,
    client: TimeSyncClient,
    reporter: Reporter,
    config: DeviceConfig,
    phase: Phase,
}

impl<T, D, N, W> Device<T, D, N, W>
where
    T: TriggerSource,
    D: Display,
    N: NetworkStack,
    W: DelayNs,
{
    /// Build a sleeping device. The network stack must already be up.
    pub fn new(trigger: T, display: D, network: N, delay: W, config: DeviceConfig) -> Self {
        Self {
            trigger,
            display,
            network,
            delay,
            client: TimeSyncClient::new(config.fetch.clone()),
            reporter: Reporter::new(config.dwell_ms),
            config,
            phase: Phase::Sleeping,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.phase.state()
    }

    /// Run forever, starting with the display off
    pub async fn run(&mut self) -> ! {
        info!("Device loop started");
        report_display(self.display.set_power(false));
        loop {
            self.step().await;
        }
    }

    /// Do the work of the current state once, then move to the next
    pub async fn step(&mut self) {
        let before = self.state();
        self.phase = match core::mem::replace(&mut self.phase, Phase::Sleeping) {
            Phase::Sleeping => self.sleep_tick().await,
            Phase::AwaitingFetch => {
                report_display(self.display.set_power(true));
                report_display(render_lines(&mut self.display, &[FETCHING]));
                self.delay.delay_ms(self.config.announce_ms).await;
                Phase::Fetching
            }
            Phase::Fetching => {
                let outcome = self.client.fetch(&mut self.network, &mut self.delay).await;
                info!("Fetch finished: {:?}", outcome);
                Phase::Displaying(outcome)
            }
            Phase::Displaying(outcome) => {
                let hold_ms = match self.reporter.render(&mut self.display, &outcome) {
                    Ok(hold_ms) => hold_ms,
                    Err(e) => {
                        warn!("Display error: {:?}", Debug2Format(&e));
                        self.config.dwell_ms
                    }
                };
                self.delay.delay_ms(hold_ms).await;
                report_display(self.display.set_power(false));
                Phase::Sleeping
            }
            Phase::Faulted => {
                report_display(self.display.set_power(true));
                report_display(render_lines(&mut self.display, &SENSOR_FAULT));
                self.delay.delay_ms(self.config.fault_on_ms).await;
                report_display(self.display.set_power(false));
                self.delay.delay_ms(self.config.fault_off_ms).await;
                Phase::Faulted
            }
        };

        let after = self.state();
        if after != before {
            info!("State {:?} -> {:?}", before, after);
        }
    }

    /// One poll of the trigger source while the display is dark
    async fn sleep_tick(&mut self) -> Phase {
        match self.poll_trigger() {
            Ok(TriggerEvent::None) => {}
            Ok(event) => {
                info!("Wake event: {:?}", event);
                return Phase::AwaitingFetch;
            }
            Err(TriggerError::IdentityMismatch { found }) => {
                error!(
                    "Accelerometer identity mismatch (found {=u8:#x}), entering fault state",
                    found
                );
                return Phase::Faulted;
            }
            Err(e) => warn!("Trigger poll failed: {}", e),
        }
        self.delay.delay_ms(self.trigger.poll_period_ms()).await;
        Phase::Sleeping
    }

    /// Wake the sensor, poll it, and put it back to sleep
    fn poll_trigger(&mut self) -> Result<TriggerEvent, TriggerError> {
        self.trigger.wake()?;
        let result = self.trigger.poll();
        if let Err(e) = self.trigger.sleep() {
            warn!("Failed to put trigger sensor to sleep: {}", e);
        }
        result
    }
}

/// Display failures never stop the device; log and carry on
fn report_display<E: core::fmt::Debug>(result: Result<(), E>) {
    if let Err(e) = result {
        warn!("Display error: {:?}", Debug2Format(&e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{mpu6050, ButtonConfig, GestureConfig};
    use crate::testing::{
        chunked_response, DisplayOp, Event, FakeNetwork, Journal, ReadStep, RecordingDelay,
        RecordingDisplay, ScriptedAccel, ScriptedPin, SocketScript, SAMPLE_BODY,
    };
    use crate::trigger::{ButtonTrigger, GestureTrigger};
    use embassy_futures::block_on;

    fn network(journal: &Journal) -> FakeNetwork {
        FakeNetwork::new(journal).socket(
            SocketScript::default()
                .reads([ReadStep::Data(chunked_response(SAMPLE_BODY)), ReadStep::Eof]),
        )
    }

    fn text(line: &str, row: i32) -> DisplayOp {
        DisplayOp::Text(0, row * 10, line.into())
    }

    #[test]
    fn test_gesture_wake_end_to_end() {
        let journal = Journal::default();
        let trigger = GestureTrigger::new(
            ScriptedAccel::new(&journal, &[16384]),
            GestureConfig::default(),
        );
        let mut device = Device::new(
            trigger,
            RecordingDisplay::new(&journal),
            network(&journal),
            RecordingDelay::new(&journal),
            DeviceConfig::default(),
        );

        assert_eq!(device.state(), DeviceState::Sleeping);
        block_on(device.step());
        assert_eq!(device.state(), DeviceState::AwaitingFetch);
        block_on(device.step());
        assert_eq!(device.state(), DeviceState::Fetching);
        block_on(device.step());
        assert_eq!(device.state(), DeviceState::Displaying);
        block_on(device.step());
        assert_eq!(device.state(), DeviceState::Sleeping);

        assert_eq!(
            journal.display_ops(),
            [
                DisplayOp::Power(true),
                DisplayOp::Clear,
                text("Fetching the time!", 0),
                DisplayOp::Present,
                DisplayOp::Clear,
                text("12:34:56", 0),
                text("2024-05-01", 1),
                DisplayOp::Present,
                DisplayOp::Power(false),
            ]
        );
        assert_eq!(journal.delays(), [1000, 3000]);

        // The dwell runs before the panel goes dark
        let events = journal.events();
        let dwell = events.iter().position(|e| *e == Event::Delay(3000)).unwrap();
        let off = events
            .iter()
            .position(|e| *e == Event::Display(DisplayOp::Power(false)))
            .unwrap();
        assert!(dwell < off);

        // Sensor was woken for the poll and put back to sleep
        assert_eq!(
            journal.register_writes(),
            [
                (mpu6050::PWR_MGMT_1, mpu6050::WAKE),
                (mpu6050::PWR_MGMT_1, mpu6050::SLEEP),
            ]
        );
    }

    #[test]
    fn test_button_polls_until_pressed() {
        let journal = Journal::default();
        let trigger = ButtonTrigger::new(
            ScriptedPin::new(&[true, true, false]),
            ButtonConfig::default(),
        );
        let mut device = Device::new(
            trigger,
            RecordingDisplay::new(&journal),
            network(&journal),
            RecordingDelay::new(&journal),
            DeviceConfig::default(),
        );

        block_on(device.step());
        block_on(device.step());
        assert_eq!(device.state(), DeviceState::Sleeping);
        assert_eq!(journal.delays(), [50, 50]);
        assert!(journal.display_ops().is_empty());

        block_on(device.step());
        assert_eq!(device.state(), DeviceState::AwaitingFetch);
        for _ in 0..3 {
            block_on(device.step());
        }
        assert_eq!(device.state(), DeviceState::Sleeping);
        assert_eq!(journal.display_ops().last(), Some(&DisplayOp::Power(false)));
    }

    #[test]
    fn test_failed_fetch_still_goes_through_display() {
        let journal = Journal::default();
        let trigger = ButtonTrigger::new(ScriptedPin::new(&[false]), ButtonConfig::default());
        let mut config = DeviceConfig::default();
        config.fetch.retry.dns = crate::RetryPolicy::bounded(1, 1000);
        let mut device = Device::new(
            trigger,
            RecordingDisplay::new(&journal),
            FakeNetwork::new(&journal).resolve_failures(usize::MAX),
            RecordingDelay::new(&journal),
            config,
        );

        for _ in 0..4 {
            block_on(device.step());
        }
        assert_eq!(device.state(), DeviceState::Sleeping);
        assert!(journal.display_ops().contains(&text("DNS lookup failed", 0)));
    }

    #[test]
    fn test_identity_mismatch_is_terminal() {
        let journal = Journal::default();
        let trigger = GestureTrigger::new(
            ScriptedAccel::new(&journal, &[16384]).with_identity(0x00),
            GestureConfig::default(),
        );
        let mut device = Device::new(
            trigger,
            RecordingDisplay::new(&journal),
            FakeNetwork::new(&journal),
            RecordingDelay::new(&journal),
            DeviceConfig::default(),
        );

        block_on(device.step());
        assert_eq!(device.state(), DeviceState::Faulted);

        for _ in 0..2 {
            block_on(device.step());
            assert_eq!(device.state(), DeviceState::Faulted);
        }
        let cycle = [
            DisplayOp::Power(true),
            DisplayOp::Clear,
            text("Sensor fault!", 0),
            text("Restart device", 1),
            DisplayOp::Present,
            DisplayOp::Power(false),
        ];
        let expected: Vec<_> = cycle.iter().chain(cycle.iter()).cloned().collect();
        assert_eq!(journal.display_ops(), expected);
        assert_eq!(journal.delays(), [5000, 60000, 5000, 60000]);
        assert!(journal.axis_reads().is_empty());
        assert!(!journal.events().contains(&Event::Resolve));
    }

    #[test]
    fn test_bus_error_keeps_sleeping() {
        let journal = Journal::default();
        let trigger = GestureTrigger::new(
            ScriptedAccel::new(&journal, &[16384]).with_bus_error_on_read(0),
            GestureConfig::default(),
        );
        let mut device = Device::new(
            trigger,
            RecordingDisplay::new(&journal),
            network(&journal),
            RecordingDelay::new(&journal),
            DeviceConfig::default(),
        );

        block_on(device.step());
        assert_eq!(device.state(), DeviceState::Sleeping);
        assert_eq!(journal.delays(), [1000]);
        block_on(device.step());
        assert_eq!(device.state(), DeviceState::AwaitingFetch);
    }

    #[test]
    fn test_display_errors_do_not_stop_the_cycle() {
        let journal = Journal::default();
        let trigger = ButtonTrigger::new(ScriptedPin::new(&[false]), ButtonConfig::default());
        let mut device = Device::new(
            trigger,
            RecordingDisplay::new(&journal).failing(),
            network(&journal),
            RecordingDelay::new(&journal),
            DeviceConfig::default(),
        );

        for _ in 0..4 {
            block_on(device.step());
        }
        assert_eq!(device.state(), DeviceState::Sleeping);
        assert_eq!(journal.delays(), [1000, 3000]);
    }
}
