//! End-to-end analysis of one instruction trace against one event log
//!
//! Parse both logs, reconstruct blocks, window and group every block's
//! iterations, correlate each sublayer with the event log, then build the
//! block ranking, the per-pc cost table and the stage attribution from the
//! same records.

use crate::block_summary::{summarize_blocks, BlockSummary, ProgramTotals};
use crate::blocks::reconstruct_blocks;
use crate::config::AnalysisConfig;
use crate::correlation::{Classifier, Correlator};
use crate::hierarchy::Grouper;
use crate::instruction_kind::InstructionClassifier;
use crate::pc_stats::{pc_cost_table, PcCostTable};
use crate::pipeline_stages::{attribute_stages, StageAttribution};
use crate::report::{analyze_block, DropSummary, Report};
use crate::trace::{parse_event_trace, parse_instruction_trace};
use anyhow::{Context, Result};
use std::io::BufRead;
use tracing::{info, warn};

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub report: Report,
    /// Blocks ranked by total cycles
    pub blocks: Vec<BlockSummary>,
    pub program: ProgramTotals,
    pub pc_costs: PcCostTable,
    pub stages: StageAttribution,
}

impl AnalysisOutput {
    pub fn drops(&self) -> &DropSummary {
        &self.report.drops
    }
}

/// Configured analysis, reusable across inputs
#[derive(Debug, Clone)]
pub struct Analysis {
    config: AnalysisConfig,
    grouper: Grouper,
    classifier: Classifier,
    kinds: InstructionClassifier,
}

impl Analysis {
    /// Validate `config` and build the grouper and classifiers it describes
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        config.validate().context("Invalid analysis configuration")?;
        Ok(Self {
            config: config.clone(),
            grouper: Grouper::new(&config.hierarchy)?,
            classifier: Classifier::from_config(config)?,
            kinds: InstructionClassifier::from_config_rules(&config.instruction_kinds)?,
        })
    }

    /// Validate `config`, then analyze one pair of logs
    pub fn run<I: BufRead, E: BufRead>(
        instructions: I,
        events: E,
        config: &AnalysisConfig,
    ) -> Result<AnalysisOutput> {
        Self::new(config)?.analyze(instructions, events)
    }

    /// Analyze one pair of logs; identical input gives identical output
    pub fn analyze<I: BufRead, E: BufRead>(
        &self,
        instructions: I,
        events: E,
    ) -> Result<AnalysisOutput> {
        let (records, rows) = parse_instruction_trace(instructions, self.config.schema)
            .context("Failed to parse instruction trace")?;
        let (log, event_summary) =
            parse_event_trace(events).context("Failed to parse event trace")?;
        info!(
            instructions = records.len(),
            events = log.len(),
            "traces loaded"
        );

        let blocks = reconstruct_blocks(&records, self.config.fetch_width);
        info!(blocks = blocks.len(), "blocks reconstructed");

        let correlator = Correlator::new(&log, &self.classifier);
        let mut report = Report::default();
        for block in blocks.blocks() {
            let (rows, dropped_empty) = analyze_block(block, &self.grouper, &correlator);
            report.rows.extend(rows);
            report.drops.empty_iterations += dropped_empty;
        }
        report.drops.rows_skipped = rows.rows_skipped;
        report.drops.rows_padded = rows.rows_padded;
        report.drops.events_dropped = event_summary.events_dropped;
        info!(rows = report.rows.len(), "sublayer rows emitted");

        if !report.drops.is_clean() {
            warn!(
                rows_skipped = report.drops.rows_skipped,
                rows_padded = report.drops.rows_padded,
                events_dropped = report.drops.events_dropped,
                empty_iterations = report.drops.empty_iterations,
                "input was not clean"
            );
        }

        let program = ProgramTotals::from_records(&records);
        let summaries = summarize_blocks(&blocks, &program, self.config.target_ipc);
        let pc_costs = pc_cost_table(&records, &self.kinds, self.config.target_ipc);
        let stages = attribute_stages(&records, &self.kinds);

        Ok(AnalysisOutput {
            report,
            blocks: summaries,
            program,
            pc_costs,
            stages,
        })
    }
}
