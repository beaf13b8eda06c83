//! Analysis configuration
//!
//! Every tunable of a run lives here and is passed explicitly into the
//! grouper, correlator and summaries. Values come from defaults, an optional
//! TOML file, and command-line overrides, in that order.

use crate::correlation::AddressRegion;
use crate::instruction_kind::KindRule;
use crate::trace::TraceSchema;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A configuration that would break grouping or classification
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("group_size must be positive")]
    ZeroGroupSize,

    #[error("sublayer_size must be positive")]
    ZeroSublayerSize,

    #[error("sublayer_size {sublayer_size} does not divide group_size {group_size}")]
    SublayerNotDivisor {
        group_size: usize,
        sublayer_size: usize,
    },

    #[error("fetch_width must be positive")]
    ZeroFetchWidth,

    #[error("latency_threshold must be non-negative, got {0}")]
    NegativeLatencyThreshold(i64),

    #[error("target_ipc must be positive, got {0}")]
    NonPositiveTargetIpc(f64),

    #[error("exactly two address regions are required, got {0}")]
    RegionCount(usize),

    #[error("region {name}: start {start:#x} is above end {end:#x}")]
    InvertedRegion { name: String, start: u64, end: u64 },

    #[error("regions {first} and {second} overlap")]
    OverlappingRegions { first: String, second: String },

    #[error("instruction kind {name}: invalid pattern: {message}")]
    InvalidKindPattern { name: String, message: String },
}

/// Two-level fixed-size partition of a block's iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Iterations per group
    pub group_size: usize,
    /// Iterations per sublayer; must divide `group_size`
    pub sublayer_size: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            group_size: 5120,
            sublayer_size: 512,
        }
    }
}

impl HierarchyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_size == 0 {
            return Err(ConfigError::ZeroGroupSize);
        }
        if self.sublayer_size == 0 {
            return Err(ConfigError::ZeroSublayerSize);
        }
        if self.group_size % self.sublayer_size != 0 {
            return Err(ConfigError::SublayerNotDivisor {
                group_size: self.group_size,
                sublayer_size: self.sublayer_size,
            });
        }
        Ok(())
    }

    pub fn sublayers_per_group(&self) -> usize {
        self.group_size / self.sublayer_size
    }
}

/// Full configuration of one analysis run
///
/// # Example
/// ```
/// use stallscope::config::AnalysisConfig;
///
/// let config = AnalysisConfig::from_toml_str(r#"
///     latency_threshold = 20
///
///     [hierarchy]
///     group_size = 1024
///     sublayer_size = 128
/// "#)?;
/// assert_eq!(config.hierarchy.sublayers_per_group(), 8);
/// assert_eq!(config.fetch_width, 4);
/// assert!(config.validate().is_ok());
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Address distance between sequential instructions
    pub fetch_width: u64,

    /// Events lasting longer than this many cycles are high-latency
    pub latency_threshold: i64,

    /// IPC a block is assumed to reach after optimization, for savings estimates
    pub target_ipc: f64,

    /// Column layout of the instruction trace
    pub schema: TraceSchema,

    pub hierarchy: HierarchyConfig,

    /// The two disjoint address regions events are classified into
    #[serde(rename = "region")]
    pub regions: Vec<AddressRegion>,

    /// Replacement mnemonic classification table; empty keeps the built-in one
    #[serde(rename = "instruction_kind", skip_serializing_if = "Vec::is_empty")]
    pub instruction_kinds: Vec<KindRule>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fetch_width: 4,
            latency_threshold: 10,
            target_ipc: 2.0,
            schema: TraceSchema::default(),
            hierarchy: HierarchyConfig::default(),
            regions: vec![
                AddressRegion::new("regionA", 0x8000_0854, 0x8000_1853),
                AddressRegion::new("regionB", 0x8000_dfcc, 0x8000_ffcb),
            ],
            instruction_kinds: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse analysis configuration")
    }

    /// Load a TOML configuration file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    /// Check every invariant grouping and classification rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hierarchy.validate()?;

        if self.fetch_width == 0 {
            return Err(ConfigError::ZeroFetchWidth);
        }
        if self.latency_threshold < 0 {
            return Err(ConfigError::NegativeLatencyThreshold(self.latency_threshold));
        }
        if self.target_ipc.is_nan() || self.target_ipc <= 0.0 {
            return Err(ConfigError::NonPositiveTargetIpc(self.target_ipc));
        }

        if self.regions.len() != 2 {
            return Err(ConfigError::RegionCount(self.regions.len()));
        }
        for region in &self.regions {
            if region.start > region.end {
                return Err(ConfigError::InvertedRegion {
                    name: region.name.clone(),
                    start: region.start,
                    end: region.end,
                });
            }
        }
        let (first, second) = (&self.regions[0], &self.regions[1]);
        if first.overlaps(second) {
            return Err(ConfigError::OverlappingRegions {
                first: first.name.clone(),
                second: second.name.clone(),
            });
        }

        for rule in &self.instruction_kinds {
            rule.compile()?;
        }

        Ok(())
    }

    /// Latency threshold as cycles; only meaningful after `validate`
    pub fn latency_threshold_cycles(&self) -> u64 {
        self.latency_threshold.max(0) as u64
    }
}
