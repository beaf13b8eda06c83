//! Attribution of retire intervals to pipeline stages
//!
//! Each instruction's `[lastCmt, commit)` interval is cut at its dispatch,
//! readOp, execute and writeBack stamps. The stage in which `lastCmt` falls is
//! charged from `lastCmt` onwards; every later stage is charged in full. An
//! instruction committing in the same cycle as its predecessor retired with
//! it and is not charged again. The first instruction has no predecessor
//! commit to measure from and is only used as the starting point.

use crate::instruction_kind::InstructionClassifier;
use crate::trace::{escape_field, InstructionRecord, ProgramCounter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

/// Interval between two consecutive pipeline stamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stage {
    LastCommitToDispatch,
    DispatchToReadOp,
    ReadOpToExecute,
    ExecuteToWriteBack,
    WriteBackToRetire,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::LastCommitToDispatch,
        Stage::DispatchToReadOp,
        Stage::ReadOpToExecute,
        Stage::ExecuteToWriteBack,
        Stage::WriteBackToRetire,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::LastCommitToDispatch => "lastCmt->dispatch",
            Stage::DispatchToReadOp => "dispatch->readop",
            Stage::ReadOpToExecute => "readop->execute",
            Stage::ExecuteToWriteBack => "execute->writeback",
            Stage::WriteBackToRetire => "writeback->retire",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cycles charged to each stage for one instruction
///
/// Only stages with a positive duration are returned. An instruction whose
/// `lastCmt` is not before its commit is charged nothing.
pub fn stage_durations(record: &InstructionRecord) -> Vec<(Stage, u64)> {
    let s = &record.stages;
    let boundaries = [
        record.last_commit,
        s.dispatch,
        s.read_op,
        s.execute,
        s.write_back,
        s.commit,
    ];
    let lc = record.last_commit;
    if lc >= s.commit {
        return Vec::new();
    }

    // Index of the stage containing lastCmt: the last boundary not after it
    let first = (1..5).rev().find(|&i| boundaries[i] <= lc).unwrap_or(0);

    (first..5)
        .filter_map(|i| {
            let from = if i == first { lc } else { boundaries[i] };
            let to = boundaries[i + 1];
            let cycles = to.checked_sub(from).filter(|&c| c > 0)?;
            Some((Stage::ALL[i], cycles))
        })
        .collect()
}

/// Per-(stage, pc) accumulation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PcStageStat {
    pub asm: String,
    pub count: u64,
    pub total_cycles: u64,
}

impl PcStageStat {
    pub fn avg_cycles(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_cycles as f64 / self.count as f64
        }
    }
}

/// Stage totals over a whole trace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageAttribution {
    pub per_stage: BTreeMap<Stage, u64>,
    pub per_pc: BTreeMap<(Stage, ProgramCounter), PcStageStat>,
    pub per_kind: BTreeMap<(Stage, String), u64>,
    /// Instructions not charged because they retired with their predecessor
    pub same_cycle_skipped: usize,
}

impl StageAttribution {
    pub fn total_cycles(&self) -> u64 {
        self.per_stage.values().fold(0u64, |acc, &c| acc.saturating_add(c))
    }

    /// Write `Stage,PC,ASM,Count,Total_Cycles,Avg_Cycles` rows, busiest first within a stage
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "Stage,PC,ASM,Count,Total_Cycles,Avg_Cycles")?;

        let mut rows: Vec<_> = self.per_pc.iter().collect();
        rows.sort_by(|((sa, _), a), ((sb, _), b)| {
            sa.cmp(sb).then(b.total_cycles.cmp(&a.total_cycles))
        });
        for ((stage, pc), stat) in rows {
            writeln!(
                out,
                "{},{},\"{}\",{},{},{:.3}",
                stage,
                escape_field(&pc.to_string()),
                stat.asm.replace('"', "\"\""),
                stat.count,
                stat.total_cycles,
                stat.avg_cycles()
            )?;
        }

        writeln!(out)?;
        writeln!(out, "# Stage Totals")?;
        for (stage, total) in &self.per_stage {
            writeln!(out, "{}_TOTAL,{}", stage, total)?;
        }
        writeln!(out, "ALL_STAGES_TOTAL,{}", self.total_cycles())?;

        writeln!(out)?;
        writeln!(out, "# Stage Totals by Instruction Type")?;
        for ((stage, kind), total) in &self.per_kind {
            writeln!(out, "{}_{}_TOTAL,{}", stage, kind, total)?;
        }
        Ok(())
    }
}

/// Charge every instruction after the first to its stages
pub fn attribute_stages(
    records: &[InstructionRecord],
    kinds: &InstructionClassifier,
) -> StageAttribution {
    let mut attribution = StageAttribution::default();
    let mut ordered: Vec<&InstructionRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.seq);

    let Some((first, rest)) = ordered.split_first() else {
        return attribution;
    };
    let mut prev_commit = first.stages.commit;
    for &record in rest {
        if record.stages.commit == prev_commit {
            attribution.same_cycle_skipped += 1;
            continue;
        }
        prev_commit = record.stages.commit;

        let kind = kinds.classify(&record.asm);
        for (stage, cycles) in stage_durations(record) {
            let total = attribution.per_stage.entry(stage).or_default();
            *total = total.saturating_add(cycles);
            let by_kind = attribution
                .per_kind
                .entry((stage, kind.to_string()))
                .or_default();
            *by_kind = by_kind.saturating_add(cycles);
            let stat = attribution
                .per_pc
                .entry((stage, record.pc.clone()))
                .or_default();
            if stat.count == 0 {
                stat.asm = record.asm.clone();
            }
            stat.count += 1;
            stat.total_cycles = stat.total_cycles.saturating_add(cycles);
        }
    }

    attribution
}
