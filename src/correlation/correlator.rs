//! Window queries over the sorted event log
//!
//! `query` binary-searches the first event at or after the window start and
//! scans forward until the window end, tallying each hit into its bucket.

use super::classify::{Bucket, Classifier};
use crate::trace::EventLog;
use serde::Serialize;

/// Running count and summed duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Accumulator {
    pub count: u64,
    pub duration: u64,
}

impl Accumulator {
    /// Record one event; the duration sum saturates at `u64::MAX`
    pub fn add(&mut self, dur: u64) {
        self.count += 1;
        self.duration = self.duration.saturating_add(dur);
    }
}

/// Events matched by one window query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowMatch {
    pub total: Accumulator,
    buckets: [Accumulator; Bucket::COUNT],
}

impl WindowMatch {
    pub fn bucket(&self, bucket: Bucket) -> Accumulator {
        self.buckets[bucket.index()]
    }

    /// Bucket accumulators in `Bucket::ALL` order
    pub fn buckets(&self) -> &[Accumulator; Bucket::COUNT] {
        &self.buckets
    }
}

/// Answers "which events fall in `[start, end)`" against a shared sorted log
///
/// # Example
/// ```
/// use stallscope::config::AnalysisConfig;
/// use stallscope::correlation::{Classifier, Correlator};
/// use stallscope::trace::{CacheEvent, EventLog};
///
/// let log = EventLog::from_events(vec![
///     CacheEvent { ts: 10, dur: 5, addr: Some(0x80000900) },
///     CacheEvent { ts: 100, dur: 3, addr: Some(0x0) },
/// ]);
/// let classifier = Classifier::from_config(&AnalysisConfig::default())?;
/// let correlator = Correlator::new(&log, &classifier);
/// assert_eq!(correlator.query(0, 60).total.count, 1);
/// # Ok::<(), stallscope::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Correlator<'e> {
    log: &'e EventLog,
    classifier: &'e Classifier,
}

impl<'e> Correlator<'e> {
    pub fn new(log: &'e EventLog, classifier: &'e Classifier) -> Self {
        Self { log, classifier }
    }

    pub fn classifier(&self) -> &Classifier {
        self.classifier
    }

    /// Count, sum and classify every event with `start <= ts < end`
    ///
    /// An empty or inverted window matches nothing.
    pub fn query(&self, start: u64, end: u64) -> WindowMatch {
        let mut matched = WindowMatch::default();
        if end <= start {
            return matched;
        }

        let events = self.log.events();
        let mut index = self.log.lower_bound(start);
        while let Some(event) = events.get(index) {
            if event.ts >= end {
                break;
            }
            matched.total.add(event.dur);
            matched.buckets[self.classifier.classify(event).index()].add(event.dur);
            index += 1;
        }

        matched
    }
}
