//! Two independent classification axes for a matched event
//!
//! Address axis: which of two named, inclusive address regions holds the
//! event (or neither, including events without an address). Latency axis:
//! whether the event outlasted the configured threshold.

use crate::config::{AnalysisConfig, ConfigError};
use crate::trace::CacheEvent;
use serde::{Deserialize, Serialize};

/// Named inclusive address interval `[start, end]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRegion {
    pub name: String,
    pub start: u64,
    pub end: u64,
}

impl AddressRegion {
    pub fn new(name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn contains(&self, addr: u64) -> bool {
        (self.start..=self.end).contains(&addr)
    }

    pub fn overlaps(&self, other: &AddressRegion) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Address-axis outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RegionClass {
    RegionA,
    RegionB,
    Unclassified,
}

/// Latency-axis outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LatencyClass {
    Low,
    High,
}

/// One of the six mutually exclusive (region, latency) cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Bucket {
    pub region: RegionClass,
    pub latency: LatencyClass,
}

impl Bucket {
    pub const COUNT: usize = 6;

    /// Every bucket, in report column order
    pub const ALL: [Bucket; Self::COUNT] = [
        Bucket::new(RegionClass::RegionA, LatencyClass::Low),
        Bucket::new(RegionClass::RegionA, LatencyClass::High),
        Bucket::new(RegionClass::RegionB, LatencyClass::Low),
        Bucket::new(RegionClass::RegionB, LatencyClass::High),
        Bucket::new(RegionClass::Unclassified, LatencyClass::Low),
        Bucket::new(RegionClass::Unclassified, LatencyClass::High),
    ];

    pub const fn new(region: RegionClass, latency: LatencyClass) -> Self {
        Self { region, latency }
    }

    /// Dense index into `Bucket::ALL`
    pub const fn index(self) -> usize {
        let region = match self.region {
            RegionClass::RegionA => 0,
            RegionClass::RegionB => 1,
            RegionClass::Unclassified => 2,
        };
        let latency = match self.latency {
            LatencyClass::Low => 0,
            LatencyClass::High => 1,
        };
        region * 2 + latency
    }

    /// Column stem used in reports, e.g. `region_a_high`
    pub fn label(self) -> &'static str {
        match (self.region, self.latency) {
            (RegionClass::RegionA, LatencyClass::Low) => "region_a_low",
            (RegionClass::RegionA, LatencyClass::High) => "region_a_high",
            (RegionClass::RegionB, LatencyClass::Low) => "region_b_low",
            (RegionClass::RegionB, LatencyClass::High) => "region_b_high",
            (RegionClass::Unclassified, LatencyClass::Low) => "unclassified_low",
            (RegionClass::Unclassified, LatencyClass::High) => "unclassified_high",
        }
    }
}

/// Predicate table assigning every event to exactly one bucket
#[derive(Debug, Clone)]
pub struct Classifier {
    region_a: AddressRegion,
    region_b: AddressRegion,
    latency_threshold: u64,
}

impl Classifier {
    pub fn new(region_a: AddressRegion, region_b: AddressRegion, latency_threshold: u64) -> Self {
        Self {
            region_a,
            region_b,
            latency_threshold,
        }
    }

    /// Build from a configuration carrying exactly two regions
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        match config.regions.as_slice() {
            [region_a, region_b] => Ok(Self::new(
                region_a.clone(),
                region_b.clone(),
                config.latency_threshold_cycles(),
            )),
            regions => Err(ConfigError::RegionCount(regions.len())),
        }
    }

    pub fn region_a(&self) -> &AddressRegion {
        &self.region_a
    }

    pub fn region_b(&self) -> &AddressRegion {
        &self.region_b
    }

    pub fn region_of(&self, addr: Option<u64>) -> RegionClass {
        match addr {
            Some(addr) if self.region_a.contains(addr) => RegionClass::RegionA,
            Some(addr) if self.region_b.contains(addr) => RegionClass::RegionB,
            _ => RegionClass::Unclassified,
        }
    }

    /// Strictly above the threshold is high-latency
    pub fn latency_of(&self, dur: u64) -> LatencyClass {
        if dur > self.latency_threshold {
            LatencyClass::High
        } else {
            LatencyClass::Low
        }
    }

    pub fn classify(&self, event: &CacheEvent) -> Bucket {
        Bucket::new(self.region_of(event.addr), self.latency_of(event.dur))
    }
}
