//! Per-block cycle accounting and ranking
//!
//! Answers "which blocks dominate execution time" before drilling into
//! sublayers: total cycles summed over iteration windows, average IPC, share
//! of program cycles, and the cycles that would be saved at a target IPC.

use crate::blocks::{iteration_windows, BasicBlock, BlockMap, WindowSet};
use crate::trace::{escape_field, InstructionRecord};
use serde::Serialize;
use std::io::{self, Write};

/// Whole-program totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProgramTotals {
    pub instructions: usize,
    /// `max(start + latency) - min(start)` over all instructions
    pub total_cycles: u64,
    pub ipc: f64,
}

impl ProgramTotals {
    pub fn from_records(records: &[InstructionRecord]) -> Self {
        let first = records.iter().map(InstructionRecord::start).min();
        let last = records.iter().map(InstructionRecord::end).max();
        let total_cycles = match (first, last) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => 0,
        };
        Self {
            instructions: records.len(),
            total_cycles,
            ipc: ratio(records.len() as f64, total_cycles),
        }
    }
}

/// One block's row in the ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub block_id: usize,
    pub start_pc: String,
    pub iterations: usize,
    pub instructions: usize,
    /// Sum of per-iteration window cycles
    pub total_cycles: u64,
    pub avg_ipc: f64,
    /// `total_cycles / program total_cycles`
    pub share: f64,
    /// `total_cycles - instructions / target_ipc`; negative when already faster
    pub estimated_savings: f64,
}

impl BlockSummary {
    pub fn new(
        block: &BasicBlock<'_>,
        windows: &WindowSet,
        program: &ProgramTotals,
        target_ipc: f64,
    ) -> Self {
        let total_cycles = windows.total_cycles();
        let instructions = windows.total_instructions();
        let ideal = if target_ipc > 0.0 {
            instructions as f64 / target_ipc
        } else {
            0.0
        };
        Self {
            block_id: block.id(),
            start_pc: block.start().to_string(),
            iterations: windows.windows.len(),
            instructions,
            total_cycles,
            avg_ipc: ratio(instructions as f64, total_cycles),
            share: ratio(total_cycles as f64, program.total_cycles),
            estimated_savings: total_cycles as f64 - ideal,
        }
    }
}

fn ratio(numerator: f64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

/// Order by total cycles, heaviest first; ties by block id
pub fn rank_blocks(summaries: &mut [BlockSummary]) {
    summaries.sort_by(|a, b| {
        b.total_cycles
            .cmp(&a.total_cycles)
            .then(a.block_id.cmp(&b.block_id))
    });
}

/// Summarize every block, heaviest first
pub fn summarize_blocks(
    blocks: &BlockMap<'_>,
    program: &ProgramTotals,
    target_ipc: f64,
) -> Vec<BlockSummary> {
    let mut summaries: Vec<_> = blocks
        .blocks()
        .iter()
        .map(|block| BlockSummary::new(block, &iteration_windows(block), program, target_ipc))
        .collect();
    rank_blocks(&mut summaries);
    summaries
}

/// Write ranked summaries with a running cumulative-cycles column
pub fn write_block_summary_csv<W: Write>(
    summaries: &[BlockSummary],
    program: &ProgramTotals,
    mut out: W,
) -> io::Result<()> {
    writeln!(
        out,
        "# blocks={},total_cycles={},instructions={},ipc={:.2}",
        summaries.len(),
        program.total_cycles,
        program.instructions,
        program.ipc
    )?;
    writeln!(
        out,
        "block_id,start_pc,iterations,instructions,total_cycles,share,avg_ipc,estimated_savings,cumulative_cycles"
    )?;
    let mut cumulative = 0u64;
    for s in summaries {
        cumulative = cumulative.saturating_add(s.total_cycles);
        writeln!(
            out,
            "{},{},{},{},{},{:.4},{:.2},{:.1},{}",
            s.block_id,
            escape_field(&s.start_pc),
            s.iterations,
            s.instructions,
            s.total_cycles,
            s.share,
            s.avg_ipc,
            s.estimated_savings,
            cumulative
        )?;
    }
    Ok(())
}
