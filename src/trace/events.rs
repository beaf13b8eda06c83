//! Memory-subsystem event log
//!
//! One event per line: `ts,dur,addr`, e.g. `9202,75,0x80001858`.

use super::row::{raw_lines, RawLine};
use super::TraceError;
use serde::Serialize;
use std::io::BufRead;
use tracing::{debug, trace, warn};

/// A recorded memory stall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheEvent {
    /// Cycle the miss was raised
    pub ts: u64,
    /// Cycles the miss was outstanding
    pub dur: u64,
    /// Missing address, when the log recorded one
    pub addr: Option<u64>,
}

/// Event accounting for one event log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventParseSummary {
    pub lines_read: usize,
    pub events_dropped: usize,
    pub events_without_address: usize,
}

fn parse_hex(text: &str) -> Option<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).ok()
}

/// Parse one event line; `None` means the line is malformed and dropped
///
/// An empty address field yields an event without an address. Any other
/// field that does not parse drops the whole line.
pub fn parse_event_line(line: &str) -> Option<CacheEvent> {
    let mut parts = line.trim().split(',').map(str::trim);
    let ts = parts.next()?.parse::<u64>().ok()?;
    let dur = parts.next()?.parse::<u64>().ok()?;
    let addr = match parts.next()? {
        "" => None,
        text => Some(parse_hex(text)?),
    };
    Some(CacheEvent { ts, dur, addr })
}

/// Events sorted ascending by timestamp
///
/// Built once and shared read-only by every correlation query.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<CacheEvent>,
}

impl EventLog {
    /// Sort `events` by timestamp; equal timestamps keep their input order
    pub fn from_events(mut events: Vec<CacheEvent>) -> Self {
        events.sort_by_key(|event| event.ts);
        Self { events }
    }

    pub fn events(&self) -> &[CacheEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index of the first event with `ts >= ts`, or `len()` if there is none
    pub fn lower_bound(&self, ts: u64) -> usize {
        self.events.partition_point(|event| event.ts < ts)
    }
}

/// Parse and sort an event log
pub fn parse_event_trace<R: BufRead>(
    reader: R,
) -> Result<(EventLog, EventParseSummary), TraceError> {
    let mut events = Vec::new();
    let mut summary = EventParseSummary::default();

    for line in raw_lines(reader) {
        let RawLine { number, text } = line?;
        let Some(text) = text else {
            trace!(line = number, "dropping cache event that is not UTF-8");
            summary.lines_read += 1;
            summary.events_dropped += 1;
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        summary.lines_read += 1;
        match parse_event_line(&text) {
            Some(event) => {
                if event.addr.is_none() {
                    summary.events_without_address += 1;
                }
                events.push(event);
            }
            None => summary.events_dropped += 1,
        }
    }

    if summary.events_dropped > 0 {
        warn!(
            dropped = summary.events_dropped,
            read = summary.lines_read,
            "malformed cache events dropped"
        );
    }
    let log = EventLog::from_events(events);
    debug!(events = log.len(), "event trace parsed");

    Ok((log, summary))
}
