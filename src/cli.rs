//! CLI argument parsing for stallscope

use crate::config::AnalysisConfig;
use crate::trace::TraceSchema;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the sublayer report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One header line and one line per sublayer (default)
    Csv,
    /// Pretty-printed JSON including drop counts
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "stallscope")]
#[command(version)]
#[command(
    about = "Attribute cache stalls to basic-block iterations of a cycle-accurate pipeline trace",
    long_about = None
)]
pub struct Cli {
    /// Retired-instruction trace (CSV, one instruction per row)
    #[arg(long = "trace", value_name = "FILE")]
    pub trace: PathBuf,

    /// Memory event log (`ts,dur,addr` per line)
    #[arg(long = "events", value_name = "FILE")]
    pub events: PathBuf,

    /// TOML configuration; command-line flags override its values
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long = "format", value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Iterations per group
    #[arg(long = "group-size", value_name = "N")]
    pub group_size: Option<usize>,

    /// Iterations per sublayer (must divide the group size)
    #[arg(long = "sublayer-size", value_name = "N")]
    pub sublayer_size: Option<usize>,

    /// Events lasting longer than this many cycles are high-latency
    #[arg(long = "latency-threshold", value_name = "CYCLES", allow_hyphen_values = true)]
    pub latency_threshold: Option<i64>,

    /// Address distance between sequential instructions
    #[arg(long = "fetch-width", value_name = "BYTES")]
    pub fetch_width: Option<u64>,

    /// IPC assumed for savings estimates in the block summary
    #[arg(long = "target-ipc", value_name = "IPC")]
    pub target_ipc: Option<f64>,

    /// Column layout of the instruction trace
    #[arg(long = "schema", value_enum)]
    pub schema: Option<TraceSchema>,

    /// Also write the ranked per-block summary CSV to FILE
    #[arg(long = "blocks-summary", value_name = "FILE")]
    pub blocks_summary: Option<PathBuf>,

    /// Also write the per-pc cycle cost table to FILE
    #[arg(long = "pc-stats", value_name = "FILE")]
    pub pc_stats: Option<PathBuf>,

    /// Also write the pipeline stage attribution CSV to FILE
    #[arg(long = "stages", value_name = "FILE")]
    pub stages: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Defaults, then the config file, then flags
    pub fn load_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_toml_file(path)?,
            None => AnalysisConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(group_size) = self.group_size {
            config.hierarchy.group_size = group_size;
        }
        if let Some(sublayer_size) = self.sublayer_size {
            config.hierarchy.sublayer_size = sublayer_size;
        }
        if let Some(threshold) = self.latency_threshold {
            config.latency_threshold = threshold;
        }
        if let Some(fetch_width) = self.fetch_width {
            config.fetch_width = fetch_width;
        }
        if let Some(target_ipc) = self.target_ipc {
            config.target_ipc = target_ipc;
        }
        if let Some(schema) = self.schema {
            config.schema = schema;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_required_inputs() {
        let cli = Cli::parse_from(["stallscope", "--trace", "t.csv", "--events", "e.log"]);
        assert_eq!(cli.trace, PathBuf::from("t.csv"));
        assert_eq!(cli.events, PathBuf::from("e.log"));
        assert_eq!(cli.format, OutputFormat::Csv);
        assert!(cli.output.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_missing_events_is_error() {
        assert!(Cli::try_parse_from(["stallscope", "--trace", "t.csv"]).is_err());
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::parse_from([
            "stallscope", "--trace", "t", "--events", "e", "--format", "json",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_rejects_text_format() {
        assert!(Cli::try_parse_from([
            "stallscope", "--trace", "t", "--events", "e", "--format", "text",
        ])
        .is_err());
    }

    #[test]
    fn test_cli_side_report_paths() {
        let cli = Cli::parse_from([
            "stallscope", "--trace", "t", "--events", "e", "--pc-stats", "pc.csv",
        ]);
        assert_eq!(cli.pc_stats, Some(PathBuf::from("pc.csv")));
        assert!(cli.stages.is_none());
        assert!(cli.blocks_summary.is_none());
    }

    #[test]
    fn test_cli_schema_flag() {
        let cli = Cli::parse_from([
            "stallscope", "--trace", "t", "--events", "e", "--schema", "sequenced",
        ]);
        assert_eq!(cli.schema, Some(TraceSchema::Sequenced));
    }

    #[test]
    fn test_overrides_apply_to_defaults() {
        let cli = Cli::parse_from([
            "stallscope",
            "--trace",
            "t",
            "--events",
            "e",
            "--group-size",
            "1024",
            "--sublayer-size",
            "128",
            "--latency-threshold",
            "25",
            "--fetch-width",
            "2",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.hierarchy.group_size, 1024);
        assert_eq!(config.hierarchy.sublayer_size, 128);
        assert_eq!(config.latency_threshold, 25);
        assert_eq!(config.fetch_width, 2);
        assert_eq!(config.target_ipc, 2.0);
    }

    #[test]
    fn test_negative_threshold_parses_and_fails_validation() {
        let cli = Cli::parse_from([
            "stallscope",
            "--trace",
            "t",
            "--events",
            "e",
            "--latency-threshold",
            "-3",
        ]);
        assert_eq!(cli.latency_threshold, Some(-3));
        assert!(cli.load_config().unwrap().validate().is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "latency_threshold = 40\n[hierarchy]\ngroup_size = 100\nsublayer_size = 10"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from([
            "stallscope",
            "--trace",
            "t",
            "--events",
            "e",
            "--config",
            path.as_str(),
            "--sublayer-size",
            "20",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.latency_threshold, 40);
        assert_eq!(config.hierarchy.group_size, 100);
        assert_eq!(config.hierarchy.sublayer_size, 20);
    }
}
