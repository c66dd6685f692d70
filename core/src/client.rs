#![deny(unsafe_code)]
//! Time service client
//!
//! One fetch cycle is a strictly sequential pass: resolve, open a socket,
//! connect, send the request, set the receive timeout, read until end of
//! stream or timeout, close. Setup failures are retried with the backoff of
//! their [`RetryPolicy`](crate::config::RetryPolicy); a DNS failure retries
//! resolution only, every later failure restarts the pass from resolution.
//! The read phase is never retried, whatever it produced.

use core::net::{Ipv4Addr, SocketAddrV4};

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Error as _, ErrorKind};
use hal_abstractions::{NetworkStack, StreamSocket};

use crate::config::{FetchConfig, RX_CHUNK_LEN};
use crate::error::StepFailure;
use crate::fmt::Debug2Format;
use crate::outcome::{ParsedTime, SyncOutcome};
use crate::parser::ResponseParser;

/// Record of one completed exchange (connect through close)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub remote: SocketAddrV4,
    pub bytes_received: usize,
    /// The read loop ended on the receive timeout rather than end of stream
    pub timed_out: bool,
    /// Latest successful parse, if any read produced one
    pub parsed: Option<ParsedTime>,
}

impl FetchAttempt {
    fn new(remote: SocketAddrV4) -> Self {
        Self {
            remote,
            bytes_received: 0,
            timed_out: false,
            parsed: None,
        }
    }

    pub fn into_outcome(self) -> SyncOutcome {
        match self.parsed {
            Some(parsed) => SyncOutcome::Success(parsed),
            None => SyncOutcome::NoParsableField,
        }
    }
}

/// Failures seen so far in the current cycle, per step
#[derive(Debug, Default)]
struct FailureCounts {
    dns: u32,
    socket: u32,
    connect: u32,
    send: u32,
    timeout_config: u32,
}

impl FailureCounts {
    fn record(&mut self, step: StepFailure) -> u32 {
        let count = match step {
            StepFailure::Dns => &mut self.dns,
            StepFailure::Socket => &mut self.socket,
            StepFailure::Connect => &mut self.connect,
            StepFailure::Send => &mut self.send,
            StepFailure::TimeoutConfig => &mut self.timeout_config,
        };
        *count += 1;
        *count
    }
}

/// Fetches the current date and time from the configured service
pub struct TimeSyncClient {
    config: FetchConfig,
}

impl TimeSyncClient {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Run one fetch cycle to completion
    pub async fn fetch<N, D>(&self, net: &mut N, delay: &mut D) -> SyncOutcome
    where
        N: NetworkStack,
        D: DelayNs,
    {
        info!("Fetching time from {}:{}", self.config.host, self.config.port);
        let mut failures = FailureCounts::default();

        loop {
            let address = match self.resolve(net, delay, &mut failures).await {
                Ok(address) => address,
                Err(step) => return step.into(),
            };
            let remote = SocketAddrV4::new(address, self.config.port);

            match self.exchange(net, remote).await {
                Ok(attempt) => {
                    info!(
                        "Done reading: {} bytes, timed out: {}, parsed: {}",
                        attempt.bytes_received,
                        attempt.timed_out,
                        attempt.parsed.is_some()
                    );
                    return attempt.into_outcome();
                }
                Err(step) => {
                    if self.back_off(step, &mut failures, delay).await {
                        return step.into();
                    }
                }
            }
        }
    }

    /// Resolve the service host, retrying only this step on failure
    async fn resolve<N, D>(
        &self,
        net: &mut N,
        delay: &mut D,
        failures: &mut FailureCounts,
    ) -> Result<Ipv4Addr, StepFailure>
    where
        N: NetworkStack,
        D: DelayNs,
    {
        loop {
            match net.resolve(self.config.host).await {
                Ok(address) => {
                    let [a, b, c, d] = address.octets();
                    info!("DNS lookup succeeded. IP={}.{}.{}.{}", a, b, c, d);
                    return Ok(address);
                }
                Err(e) => {
                    warn!("DNS lookup of {} failed: {:?}", self.config.host, Debug2Format(&e));
                    if self.back_off(StepFailure::Dns, failures, delay).await {
                        return Err(StepFailure::Dns);
                    }
                }
            }
        }
    }

    /// Count a failure of `step`; wait out its backoff unless the budget is
    /// spent. Returns `true` when the cycle must give up.
    async fn back_off<D: DelayNs>(
        &self,
        step: StepFailure,
        failures: &mut FailureCounts,
        delay: &mut D,
    ) -> bool {
        let policy = self.config.retry.policy(step);
        let count = failures.record(step);
        if policy.is_exhausted(count) {
            error!("{} after {} attempts, giving up", step, count);
            return true;
        }
        warn!("{} (attempt {}), retrying in {} ms", step, count, policy.backoff_ms);
        delay.delay_ms(policy.backoff_ms).await;
        false
    }

    /// Open a socket, talk to `remote`, and always close the socket again
    async fn exchange<N: NetworkStack>(
        &self,
        net: &mut N,
        remote: SocketAddrV4,
    ) -> Result<FetchAttempt, StepFailure> {
        let mut socket = net.open_stream_socket().map_err(|e| {
            warn!("Failed to allocate socket: {:?}", Debug2Format(&e));
            StepFailure::Socket
        })?;
        debug!("Allocated socket");

        let result = self.converse(&mut socket, remote).await;
        socket.close();
        result
    }

    async fn converse<S: StreamSocket>(
        &self,
        socket: &mut S,
        remote: SocketAddrV4,
    ) -> Result<FetchAttempt, StepFailure> {
        socket.connect(remote).await.map_err(|e| {
            warn!("Socket connect failed: {:?}", Debug2Format(&e));
            StepFailure::Connect
        })?;
        info!("Connected");

        let request = self.config.request.as_bytes();
        match socket.write(request).await {
            Ok(sent) if sent == request.len() => {}
            Ok(sent) => {
                warn!("Socket send incomplete: {} of {} bytes", sent, request.len());
                return Err(StepFailure::Send);
            }
            Err(e) => {
                warn!("Socket send failed: {:?}", Debug2Format(&e));
                return Err(StepFailure::Send);
            }
        }
        socket.flush().await.map_err(|e| {
            warn!("Socket flush failed: {:?}", Debug2Format(&e));
            StepFailure::Send
        })?;
        info!("Socket send success");

        socket
            .set_receive_timeout(Some(self.config.receive_timeout_ms))
            .map_err(|e| {
                warn!("Failed to set socket receiving timeout: {:?}", Debug2Format(&e));
                StepFailure::TimeoutConfig
            })?;
        debug!("Set socket receiving timeout to {} ms", self.config.receive_timeout_ms);

        let mut parser = ResponseParser::new(self.config.framing);
        let mut attempt = FetchAttempt::new(remote);
        let mut buffer = [0u8; RX_CHUNK_LEN];
        loop {
            match socket.read(&mut buffer).await {
                Ok(0) => {
                    debug!("End of stream");
                    break;
                }
                Ok(len) => {
                    attempt.bytes_received += len;
                    debug!("Received {} bytes", len);
                    match parser.feed(&buffer[..len]) {
                        Ok(parsed) => {
                            info!("Parsed date {} time {}", parsed.date(), parsed.time());
                            attempt.parsed = Some(parsed);
                        }
                        Err(e) => debug!("No date/time in this read: {}", e),
                    }
                }
                Err(e) => {
                    attempt.timed_out = e.kind() == ErrorKind::TimedOut;
                    if !attempt.timed_out {
                        warn!("Socket read failed: {:?}", Debug2Format(&e));
                    }
                    break;
                }
            }
        }
        Ok(attempt)
    }
}
