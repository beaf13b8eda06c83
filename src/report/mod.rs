//! Sublayer statistics and their CSV/JSON writers
//!
//! One row per sublayer of every block: the sublayer's cycle window, the
//! events it matched, the occupancy ratio, and the six classified
//! count/duration pairs.

mod csv;

pub use csv::write_csv;

use crate::blocks::{iteration_windows, BasicBlock};
use crate::correlation::{Bucket, Correlator, LatencyClass, RegionClass, WindowMatch};
use crate::hierarchy::{Grouper, Sublayer};
use serde::Serialize;
use std::io::Write;


/// Rows and events discarded on the way to the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropSummary {
    /// Instruction rows missing their address or decoded text
    pub rows_skipped: usize,
    /// Short instruction rows padded with zeros
    pub rows_padded: usize,
    /// Event lines that did not parse
    pub events_dropped: usize,
    /// Iterations without instructions
    pub empty_iterations: usize,
}

impl DropSummary {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Count and summed duration of one bucket, as serialized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketStat {
    pub count: u64,
    pub duration: u64,
}

/// Statistics for one sublayer of one block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SublayerStat {
    pub block_id: usize,
    pub group_index: usize,
    pub sublayer_index: usize,
    pub global_index: usize,
    pub iter_first: usize,
    pub iter_last: usize,
    pub start: u64,
    pub end: u64,
    pub window_len: u64,
    pub match_count: u64,
    pub match_duration: u64,
    /// Summed event duration per cycle of window
    pub occupancy_ratio: f64,
    pub region_a_low: BucketStat,
    pub region_a_high: BucketStat,
    pub region_b_low: BucketStat,
    pub region_b_high: BucketStat,
    pub unclassified_low: BucketStat,
    pub unclassified_high: BucketStat,
}

impl SublayerStat {
    pub fn new(block_id: usize, sublayer: &Sublayer<'_>, matched: WindowMatch) -> Self {
        let window_len = sublayer.window_len();
        let occupancy_ratio = if window_len == 0 {
            0.0
        } else {
            matched.total.duration as f64 / window_len as f64
        };
        let bucket = |region, latency| {
            let acc = matched.bucket(Bucket::new(region, latency));
            BucketStat {
                count: acc.count,
                duration: acc.duration,
            }
        };

        Self {
            block_id,
            group_index: sublayer.address.group_index,
            sublayer_index: sublayer.address.sublayer_index,
            global_index: sublayer.address.global_index,
            iter_first: sublayer.first_iter(),
            iter_last: sublayer.last_iter(),
            start: sublayer.start(),
            end: sublayer.end(),
            window_len,
            match_count: matched.total.count,
            match_duration: matched.total.duration,
            occupancy_ratio,
            region_a_low: bucket(RegionClass::RegionA, LatencyClass::Low),
            region_a_high: bucket(RegionClass::RegionA, LatencyClass::High),
            region_b_low: bucket(RegionClass::RegionB, LatencyClass::Low),
            region_b_high: bucket(RegionClass::RegionB, LatencyClass::High),
            unclassified_low: bucket(RegionClass::Unclassified, LatencyClass::Low),
            unclassified_high: bucket(RegionClass::Unclassified, LatencyClass::High),
        }
    }

    /// Bucket stats in `Bucket::ALL` order
    pub fn buckets(&self) -> [BucketStat; Bucket::COUNT] {
        [
            self.region_a_low,
            self.region_a_high,
            self.region_b_low,
            self.region_b_high,
            self.unclassified_low,
            self.unclassified_high,
        ]
    }
}

/// Sublayer rows of one block and the number of empty iterations it dropped
pub fn analyze_block(
    block: &BasicBlock<'_>,
    grouper: &Grouper,
    correlator: &Correlator<'_>,
) -> (Vec<SublayerStat>, usize) {
    let windows = iteration_windows(block);
    let rows = grouper
        .partition(&windows.windows)
        .iter()
        .flat_map(|group| group.sublayers.iter())
        .map(|sublayer| {
            let matched = correlator.query(sublayer.start(), sublayer.end());
            SublayerStat::new(block.id(), sublayer, matched)
        })
        .collect();
    (rows, windows.dropped_empty)
}

/// Every sublayer row of a run, in block then sublayer order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub rows: Vec<SublayerStat>,
    pub drops: DropSummary,
}

impl Report {
    pub fn write_csv<W: Write>(&self, out: W) -> std::io::Result<()> {
        write_csv(&self.rows, out)
    }

    pub fn write_json<W: Write>(&self, out: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(out, self)
    }
}
