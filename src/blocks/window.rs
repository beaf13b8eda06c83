//! Iteration cycle windows

use super::BasicBlock;
use crate::trace::InstructionRecord;
use serde::Serialize;

/// Half-open cycle window `[start, end)` covered by one iteration
///
/// Instructions sharing the same `start` retired together and jointly consume
/// one latency interval, so the window is the hull of `[start, start+latency)`
/// over the iteration rather than a sum of latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IterationWindow {
    /// 1-based position among the block's retained iterations
    pub iter_id: usize,
    pub start: u64,
    pub end: u64,
    pub instructions: usize,
}

impl IterationWindow {
    /// Reduce one iteration to its window; `None` for an empty iteration
    pub fn from_iteration(iter_id: usize, iteration: &[InstructionRecord]) -> Option<Self> {
        let start = iteration.iter().map(InstructionRecord::start).min()?;
        let end = iteration.iter().map(InstructionRecord::end).max()?;
        Some(Self {
            iter_id,
            start,
            end,
            instructions: iteration.len(),
        })
    }

    pub fn cycles(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Instructions per cycle; 0 when the window is empty
    pub fn ipc(&self) -> f64 {
        match self.cycles() {
            0 => 0.0,
            cycles => self.instructions as f64 / cycles as f64,
        }
    }
}

/// Windows of one block plus the iterations that had to be dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSet {
    pub windows: Vec<IterationWindow>,
    pub dropped_empty: usize,
}

impl WindowSet {
    /// Sum of per-iteration cycles, saturating at `u64::MAX`
    pub fn total_cycles(&self) -> u64 {
        self.windows
            .iter()
            .map(IterationWindow::cycles)
            .fold(0u64, u64::saturating_add)
    }

    pub fn total_instructions(&self) -> usize {
        self.windows.iter().map(|w| w.instructions).sum()
    }
}

/// Build the windows of every non-empty iteration of `block`
///
/// Empty iterations are dropped before numbering, so `iter_id` is dense.
pub fn iteration_windows(block: &BasicBlock<'_>) -> WindowSet {
    let mut set = WindowSet::default();
    for iteration in block.iterations() {
        match IterationWindow::from_iteration(set.windows.len() + 1, iteration) {
            Some(window) => set.windows.push(window),
            None => set.dropped_empty += 1,
        }
    }
    set
}
