//! Host fakes for the engine's collaborators
//!
//! Every fake records what it was asked to do into one shared [`Journal`],
//! so a test can assert on the interleaving of network, delay, display and
//! sensor calls.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;

use embedded_hal::digital::{ErrorType as PinErrorType, InputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use hal_abstractions::{AccelRegisters, Color, Display, NetworkStack, StreamSocket};

use crate::config::mpu6050;

/// A realistic service body; the date/time field sits in the middle
pub const SAMPLE_BODY: &str = concat!(
    r#"{"abbreviation":"IST","client_ip":"203.0.113.7","#,
    r#""datetime":"2024-05-01T12:34:56.123456+05:30","day_of_week":3,"#,
    r#""day_of_year":122,"dst":false,"dst_from":null,"dst_offset":0,"#,
    r#""dst_until":null,"raw_offset":19800,"timezone":"Asia/Kolkata","#,
    r#""unixtime":1714547096,"utc_datetime":"2024-05-01T07:04:56.123456+00:00","#,
    r#""utc_offset":"+05:30","week_number":18}"#
);

const RESPONSE_HEADERS: &str = concat!(
    "HTTP/1.1 200 OK\r\n",
    "Server: nginx/1.18.0\r\n",
    "Date: Wed, 01 May 2024 07:04:56 GMT\r\n",
    "Content-Type: application/json; charset=utf-8\r\n",
    "Transfer-Encoding: chunked\r\n",
    "Connection: keep-alive\r\n",
    "Cache-Control: max-age=0, private, must-revalidate\r\n",
    "\r\n"
);

/// Full chunked HTTP response carrying `json` in two chunks
pub fn chunked_response(json: &str) -> Vec<u8> {
    let (first, second) = json.split_at(json.len() / 2);
    format!(
        "{}{:x}\r\n{}\r\n{:x}\r\n{}\r\n0\r\n\r\n",
        RESPONSE_HEADERS,
        first.len(),
        first,
        second.len(),
        second
    )
    .into_bytes()
}

/// Receive buffer with `json` starting exactly at `offset`
pub fn body_at_offset(offset: usize, json: &str) -> Vec<u8> {
    let mut buffer = RESPONSE_HEADERS.as_bytes().to_vec();
    buffer.truncate(offset);
    buffer.resize(offset, b' ');
    buffer.extend_from_slice(json.as_bytes());
    buffer
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Clear,
    Text(i32, i32, String),
    Present,
    Power(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Resolve,
    OpenSocket,
    Connect(SocketAddrV4),
    Send(usize),
    SetTimeout(Option<u64>),
    Read(usize),
    Close,
    Delay(u32),
    Display(DisplayOp),
    IdentityRead,
    AxisRead(u8),
    RegisterWrite(u8, u8),
}

/// Shared, ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Event>>>);

impl Journal {
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn display_ops(&self) -> Vec<DisplayOp> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Display(op) => Some(op),
                _ => None,
            })
            .collect()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Delay(ms) => Some(ms),
                _ => None,
            })
            .collect()
    }

    pub fn axis_reads(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::AxisRead(register) => Some(register),
                _ => None,
            })
            .collect()
    }

    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::RegisterWrite(addr, value) => Some((addr, value)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct DisplayFault;

pub struct RecordingDisplay {
    journal: Journal,
    failing: bool,
}

impl RecordingDisplay {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            failing: false,
        }
    }

    /// Every call still records, then fails
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn record(&mut self, op: DisplayOp) -> Result<(), DisplayFault> {
        self.journal.push(Event::Display(op));
        if self.failing {
            Err(DisplayFault)
        } else {
            Ok(())
        }
    }
}

impl Display for RecordingDisplay {
    type Error = DisplayFault;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.record(DisplayOp::Clear)
    }

    fn draw_text(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        foreground: Color,
        background: Color,
    ) -> Result<(), Self::Error> {
        assert_eq!((foreground, background), (Color::On, Color::Off));
        self.record(DisplayOp::Text(x, y, text.into()))
    }

    fn present(&mut self) -> Result<(), Self::Error> {
        self.record(DisplayOp::Present)
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        self.record(DisplayOp::Power(on))
    }
}

pub struct RecordingDelay {
    journal: Journal,
}

impl RecordingDelay {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.journal.push(Event::Delay(ns / 1_000_000));
    }

    async fn delay_us(&mut self, us: u32) {
        self.journal.push(Event::Delay(us / 1_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.journal.push(Event::Delay(ms));
    }
}

/// Button input; `true` reads high. Reads high once the script runs out.
pub struct ScriptedPin {
    levels: VecDeque<bool>,
}

impl ScriptedPin {
    pub fn new(levels: &[bool]) -> Self {
        Self {
            levels: levels.iter().copied().collect(),
        }
    }
}

impl PinErrorType for ScriptedPin {
    type Error = Infallible;
}

impl InputPin for ScriptedPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.levels.pop_front().unwrap_or(true))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

#[derive(Debug)]
pub struct BusFault;

/// Accelerometer returning scripted axis values (0 once exhausted)
pub struct ScriptedAccel {
    journal: Journal,
    identity: u8,
    samples: VecDeque<i16>,
    reads: usize,
    failing_read: Option<usize>,
}

impl ScriptedAccel {
    pub fn new(journal: &Journal, samples: &[i16]) -> Self {
        Self {
            journal: journal.clone(),
            identity: crate::config::EXPECTED_IDENTITY,
            samples: samples.iter().copied().collect(),
            reads: 0,
            failing_read: None,
        }
    }

    pub fn with_identity(mut self, identity: u8) -> Self {
        self.identity = identity;
        self
    }

    /// Fail the `index`-th register read (identity and axis reads count)
    pub fn with_bus_error_on_read(mut self, index: usize) -> Self {
        self.failing_read = Some(index);
        self
    }

    fn next_read(&mut self) -> Result<(), BusFault> {
        let index = self.reads;
        self.reads += 1;
        if self.failing_read == Some(index) {
            Err(BusFault)
        } else {
            Ok(())
        }
    }
}

impl AccelRegisters for ScriptedAccel {
    type Error = BusFault;

    fn read_identity_register(&mut self) -> Result<u8, Self::Error> {
        self.next_read()?;
        self.journal.push(Event::IdentityRead);
        Ok(self.identity)
    }

    fn read_axis_register(&mut self, offset: u8) -> Result<i16, Self::Error> {
        self.next_read()?;
        assert!(matches!(
            offset,
            mpu6050::ACCEL_XOUT_H | mpu6050::ACCEL_YOUT_H | mpu6050::ACCEL_ZOUT_H
        ));
        self.journal.push(Event::AxisRead(offset));
        Ok(self.samples.pop_front().unwrap_or(0))
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Self::Error> {
        self.journal.push(Event::RegisterWrite(addr, value));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBehaviour {
    Full,
    /// Accept only this many bytes
    Partial(usize),
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    Data(Vec<u8>),
    Eof,
    Timeout,
    Error,
}

/// Behaviour of one socket handed out by [`FakeNetwork`]
#[derive(Debug, Clone)]
pub struct SocketScript {
    connect_ok: bool,
    send: SendBehaviour,
    flush_ok: bool,
    timeout_ok: bool,
    reads: VecDeque<ReadStep>,
}

impl Default for SocketScript {
    fn default() -> Self {
        Self {
            connect_ok: true,
            send: SendBehaviour::Full,
            flush_ok: true,
            timeout_ok: true,
            reads: VecDeque::new(),
        }
    }
}

impl SocketScript {
    pub fn reads(mut self, reads: impl IntoIterator<Item = ReadStep>) -> Self {
        self.reads = reads.into_iter().collect();
        self
    }

    pub fn connect_fails(mut self) -> Self {
        self.connect_ok = false;
        self
    }

    pub fn send(mut self, send: SendBehaviour) -> Self {
        self.send = send;
        self
    }

    pub fn flush_fails(mut self) -> Self {
        self.flush_ok = false;
        self
    }

    pub fn timeout_config_fails(mut self) -> Self {
        self.timeout_ok = false;
        self
    }
}

#[derive(Debug)]
pub struct FakeNetError;

/// Network stack handing out scripted sockets in order
pub struct FakeNetwork {
    journal: Journal,
    address: Ipv4Addr,
    resolve_failures: usize,
    socket_failures: usize,
    sockets: VecDeque<SocketScript>,
}

impl FakeNetwork {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            address: Ipv4Addr::new(213, 188, 196, 246),
            resolve_failures: 0,
            socket_failures: 0,
            sockets: VecDeque::new(),
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Fail the first `count` resolutions
    pub fn resolve_failures(mut self, count: usize) -> Self {
        self.resolve_failures = count;
        self
    }

    /// Fail the first `count` socket allocations
    pub fn socket_failures(mut self, count: usize) -> Self {
        self.socket_failures = count;
        self
    }

    pub fn socket(mut self, script: SocketScript) -> Self {
        self.sockets.push_back(script);
        self
    }
}

impl NetworkStack for FakeNetwork {
    type Error = FakeNetError;
    type Socket<'a>
        = FakeSocket
    where
        Self: 'a;

    async fn resolve(&mut self, hostname: &str) -> Result<Ipv4Addr, Self::Error> {
        assert_eq!(hostname, crate::config::TIME_SERVER);
        self.journal.push(Event::Resolve);
        if self.resolve_failures > 0 {
            self.resolve_failures -= 1;
            return Err(FakeNetError);
        }
        Ok(self.address)
    }

    fn open_stream_socket(&mut self) -> Result<Self::Socket<'_>, Self::Error> {
        self.journal.push(Event::OpenSocket);
        if self.socket_failures > 0 {
            self.socket_failures -= 1;
            return Err(FakeNetError);
        }
        Ok(FakeSocket {
            journal: self.journal.clone(),
            script: self.sockets.pop_front().unwrap_or_default(),
        })
    }
}

#[derive(Debug)]
pub struct FakeIoError(ErrorKind);

impl core::fmt::Display for FakeIoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "socket error: {:?}", self.0)
    }
}

impl core::error::Error for FakeIoError {}

impl embedded_io_async::Error for FakeIoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

pub struct FakeSocket {
    journal: Journal,
    script: SocketScript,
}

impl ErrorType for FakeSocket {
    type Error = FakeIoError;
}

impl Read for FakeSocket {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.script.reads.pop_front() {
            Some(ReadStep::Data(mut data)) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                if len < data.len() {
                    let rest = data.split_off(len);
                    self.script.reads.push_front(ReadStep::Data(rest));
                }
                self.journal.push(Event::Read(len));
                Ok(len)
            }
            Some(ReadStep::Eof) | None => {
                self.journal.push(Event::Read(0));
                Ok(0)
            }
            Some(ReadStep::Timeout) => Err(FakeIoError(ErrorKind::TimedOut)),
            Some(ReadStep::Error) => Err(FakeIoError(ErrorKind::ConnectionReset)),
        }
    }
}

impl Write for FakeSocket {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let sent = match self.script.send {
            SendBehaviour::Full => buf.len(),
            SendBehaviour::Partial(len) => len.min(buf.len()),
            SendBehaviour::Fail => return Err(FakeIoError(ErrorKind::BrokenPipe)),
        };
        self.journal.push(Event::Send(sent));
        Ok(sent)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        if self.script.flush_ok {
            Ok(())
        } else {
            Err(FakeIoError(ErrorKind::BrokenPipe))
        }
    }
}

impl StreamSocket for FakeSocket {
    async fn connect(&mut self, remote: SocketAddrV4) -> Result<(), Self::Error> {
        self.journal.push(Event::Connect(remote));
        if self.script.connect_ok {
            Ok(())
        } else {
            Err(FakeIoError(ErrorKind::ConnectionRefused))
        }
    }

    fn set_receive_timeout(&mut self, timeout_ms: Option<u64>) -> Result<(), Self::Error> {
        if !self.script.timeout_ok {
            return Err(FakeIoError(ErrorKind::Unsupported));
        }
        self.journal.push(Event::SetTimeout(timeout_ms));
        Ok(())
    }

    fn close(&mut self) {
        self.journal.push(Event::Close);
    }
}
