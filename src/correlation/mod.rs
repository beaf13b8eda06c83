//! Correlating memory events with execution windows
//!
//! The event log is sorted once; each window query is a lower-bound binary
//! search followed by a forward scan, O(log M + k). Queries never mutate
//! shared state, so windows are independent and an event may be counted by
//! every window that overlaps it.

mod classify;
mod correlator;

pub use classify::{AddressRegion, Bucket, Classifier, LatencyClass, RegionClass};
pub use correlator::{Accumulator, Correlator, WindowMatch};
