#![deny(unsafe_code)]
//! Date/time extraction from the raw time-service response
//!
//! The response is an unframed byte stream: HTTP status line, headers and a
//! (usually chunked) JSON body, delivered in arbitrary read-sized pieces.
//! Two strategies locate the JSON, see [`BodyFraming`]:
//!
//! - `HeaderDelimited` consumes the header block up to the first blank line
//!   (which may straddle two reads), de-chunks `Transfer-Encoding: chunked`
//!   bodies, and accumulates the body across reads.
//! - `FixedOffset(n)` slices every read buffer at byte `n` on its own. The
//!   offset is only right while the service's header block keeps exactly
//!   the same size; any header change silently breaks it.
//!
//! In both cases the JSON object is cut out by brace matching before it
//! reaches the JSON parser, so trailing chunk framing is never an error.
//! The `datetime` string (`YYYY-MM-DDTHH:MM:SS.ffffff+zz:zz`) is split on
//! the first `T` and then on the first `.`.

use heapless::Vec;
use serde::Deserialize;

use crate::config::BodyFraming;
use crate::error::ParseError;
use crate::outcome::ParsedTime;

/// Bytes of the current header line kept for `Transfer-Encoding` detection
pub const HEADER_LINE_CAPACITY: usize = 128;

/// Body bytes kept across reads
pub const BODY_CAPACITY: usize = 1024;

const HEADER_END: &[u8; 4] = b"\r\n\r\n";
const TRANSFER_ENCODING: &[u8] = b"transfer-encoding";
const CHUNKED: &[u8] = b"chunked";

#[derive(Deserialize)]
struct TimeBody<'a> {
    #[serde(borrow)]
    datetime: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// `matched` bytes of `\r\n\r\n` seen at the end of the previous read
    Headers { matched: usize },
    Body,
}

/// Incremental response parser, one per fetch cycle
pub struct ResponseParser {
    framing: BodyFraming,
    phase: Phase,
    line: Vec<u8, HEADER_LINE_CAPACITY>,
    header_len: usize,
    body: Vec<u8, BODY_CAPACITY>,
    chunked: bool,
}

impl ResponseParser {
    pub fn new(framing: BodyFraming) -> Self {
        Self {
            framing,
            phase: Phase::Headers { matched: 0 },
            line: Vec::new(),
            header_len: 0,
            body: Vec::new(),
            chunked: false,
        }
    }

    pub fn framing(&self) -> BodyFraming {
        self.framing
    }

    /// Forget everything seen so far
    pub fn reset(&mut self) {
        *self = Self::new(self.framing);
    }

    /// Feed one receive buffer
    ///
    /// Returns the date/time if the data seen so far holds a complete,
    /// well-formed `datetime` field. Errors only mean "nothing usable yet".
    pub fn feed(&mut self, chunk: &[u8]) -> Result<ParsedTime, ParseError> {
        match self.framing {
            BodyFraming::FixedOffset(offset) => {
                let body = chunk.get(offset..).ok_or(ParseError::OffsetOutOfBounds)?;
                extract_datetime(json_object(body)?)
            }
            BodyFraming::HeaderDelimited => self.feed_delimited(chunk),
        }
    }

    fn feed_delimited(&mut self, chunk: &[u8]) -> Result<ParsedTime, ParseError> {
        let body_start = match self.phase {
            Phase::Body => 0,
            Phase::Headers { matched } => match self.scan_headers(chunk, matched) {
                Some(start) => start,
                None => return Err(ParseError::HeaderIncomplete),
            },
        };

        let incoming = &chunk[body_start..];
        let room = BODY_CAPACITY - self.body.len();
        // Capacity was checked, so this cannot fail
        let _ = self
            .body
            .extend_from_slice(&incoming[..incoming.len().min(room)]);

        if self.chunked {
            let mut decoded = Vec::<u8, BODY_CAPACITY>::new();
            dechunk(&self.body, &mut decoded);
            extract_datetime(json_object(&decoded)?)
        } else {
            extract_datetime(json_object(&self.body)?)
        }
    }

    /// Look for the end of the header block; returns the body offset in
    /// `chunk` once found
    ///
    /// Header lines are inspected one at a time as they complete, so the
    /// size of the header block is unbounded.
    fn scan_headers(&mut self, chunk: &[u8], mut matched: usize) -> Option<usize> {
        for (i, &byte) in chunk.iter().enumerate() {
            self.header_len += 1;
            match byte {
                b'\n' => {
                    if is_chunked_header(&self.line) {
                        self.chunked = true;
                    }
                    self.line.clear();
                }
                b'\r' => {}
                // Long lines keep their prefix, which holds the field name
                _ => {
                    let _ = self.line.push(byte);
                }
            }

            matched = if byte == HEADER_END[matched] {
                matched + 1
            } else if byte == b'\r' {
                1
            } else {
                0
            };

            if matched == HEADER_END.len() {
                self.phase = Phase::Body;
                debug!(
                    "Header block ends after {} bytes (chunked: {})",
                    self.header_len,
                    self.chunked
                );
                return Some(i + 1);
            }
        }
        self.phase = Phase::Headers { matched };
        None
    }
}

/// Parse a JSON object and split its `datetime` string field
pub fn extract_datetime(json: &[u8]) -> Result<ParsedTime, ParseError> {
    let (body, _) =
        serde_json_core::from_slice::<TimeBody<'_>>(json).map_err(|_| ParseError::Json)?;
    split_datetime(body.datetime)
}

/// Split `date` `T` `time` [`.` fraction and zone]
///
/// Without a `.` the whole remainder after `T` is the time.
pub fn split_datetime(datetime: &str) -> Result<ParsedTime, ParseError> {
    let (date, rest) = datetime
        .split_once('T')
        .ok_or(ParseError::MissingDateSeparator)?;
    let time = rest.split_once('.').map_or(rest, |(time, _)| time);
    ParsedTime::new(date, time).ok_or(ParseError::FieldTooLong)
}

/// Exact extent of the first JSON object in `bytes`
fn json_object(bytes: &[u8]) -> Result<&[u8], ParseError> {
    let start = bytes
        .iter()
        .position(|&b| b == b'{')
        .ok_or(ParseError::NoObject)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&bytes[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    Err(ParseError::ObjectIncomplete)
}

/// Decode the chunks of a chunked body seen so far into `out`
///
/// A chunk whose data has only partly arrived is copied as far as it goes;
/// a size line without its CRLF yet ends decoding.
fn dechunk(body: &[u8], out: &mut Vec<u8, BODY_CAPACITY>) {
    let mut rest = body;
    loop {
        let Some(line_end) = rest.windows(2).position(|w| w == b"\r\n") else {
            return;
        };
        let Some(size) = chunk_size(&rest[..line_end]) else {
            return;
        };
        if size == 0 {
            return;
        }

        rest = &rest[line_end + 2..];
        let available = size.min(rest.len());
        if out.extend_from_slice(&rest[..available]).is_err() || available < size {
            return;
        }

        rest = &rest[size..];
        match rest.strip_prefix(b"\r\n") {
            Some(next) => rest = next,
            None => return,
        }
    }
}

/// Hex chunk size, ignoring chunk extensions
fn chunk_size(line: &[u8]) -> Option<usize> {
    let hex = line.split(|&b| b == b';').next()?;
    let hex = core::str::from_utf8(hex).ok()?.trim();
    usize::from_str_radix(hex, 16).ok()
}

/// `Transfer-Encoding` field whose value lists `chunked`
fn is_chunked_header(line: &[u8]) -> bool {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return false;
    };
    let (name, value) = (&line[..colon], &line[colon + 1..]);
    name.trim_ascii().eq_ignore_ascii_case(TRANSFER_ENCODING)
        && value
            .split(|&b| b == b',')
            .any(|coding| coding.trim_ascii().eq_ignore_ascii_case(CHUNKED))
}
