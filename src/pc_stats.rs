//! Per-pc cycle cost with shared-start IPC
//!
//! Instructions that share a `lastCmt` retired together, so the `n` members of
//! such a group split the first member's latency: each runs at IPC
//! `n / latency` and costs `latency / n` cycles. A zero-latency group costs
//! nothing. Costs are summed per pc and per instruction kind.

use crate::instruction_kind::InstructionClassifier;
use crate::trace::{escape_field, InstructionRecord, ProgramCounter};
use fnv::FnvHashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// IPC of every record, in input order, after splitting each shared start
pub fn shared_start_ipc(records: &[InstructionRecord]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&i| records[i].seq);

    // start -> (latency of first member, members)
    let mut groups: FnvHashMap<u64, (u64, usize)> = FnvHashMap::default();
    for &i in &order {
        let record = &records[i];
        groups.entry(record.start()).or_insert((record.latency(), 0)).1 += 1;
    }

    records
        .iter()
        .map(|record| match groups.get(&record.start()) {
            Some(&(latency, members)) if latency > 0 => members as f64 / latency as f64,
            _ => 0.0,
        })
        .collect()
}

/// Cost accumulated by one pc
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcCost {
    pub pc: ProgramCounter,
    /// Disassembly of the first occurrence
    pub asm: String,
    pub count: u64,
    pub total_cycles: f64,
}

impl PcCost {
    pub fn avg_cycles(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_cycles / self.count as f64
        }
    }
}

/// Cost accumulated by one instruction kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KindCost {
    pub count: u64,
    pub total_cycles: f64,
}

impl KindCost {
    pub fn avg_cycles(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_cycles / self.count as f64
        }
    }

    /// Cycles above what `count` instructions need at `target_ipc`
    pub fn save_cycles(&self, target_ipc: f64) -> f64 {
        self.total_cycles - self.count as f64 / target_ipc
    }
}

/// Per-pc and per-kind costs over a whole trace
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PcCostTable {
    /// Most expensive first; ties by pc
    pub per_pc: Vec<PcCost>,
    pub per_kind: BTreeMap<String, KindCost>,
    pub total_cycles: f64,
    pub target_ipc: f64,
}

impl PcCostTable {
    /// Write the pc table, the grand total and the per-kind table
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "pc,asm,count,total_cycles,avg_cycles")?;
        for cost in &self.per_pc {
            writeln!(
                out,
                "{},\"{}\",{},{:.6},{:.6}",
                escape_field(&cost.pc.to_string()),
                cost.asm.replace('"', "\"\""),
                cost.count,
                cost.total_cycles,
                cost.avg_cycles()
            )?;
        }

        writeln!(out)?;
        writeln!(out, "TOTAL_Cycles,{:.6}", self.total_cycles)?;
        writeln!(out)?;

        writeln!(out, "Type,count,total_cycles,avg_cycles,save_cycles")?;
        for (kind, cost) in &self.per_kind {
            writeln!(
                out,
                "{},{},{:.6},{:.6},{:.1}",
                kind,
                cost.count,
                cost.total_cycles,
                cost.avg_cycles(),
                cost.save_cycles(self.target_ipc)
            )?;
        }
        Ok(())
    }
}

/// Build the cost table for `records`
pub fn pc_cost_table(
    records: &[InstructionRecord],
    kinds: &InstructionClassifier,
    target_ipc: f64,
) -> PcCostTable {
    let ipc = shared_start_ipc(records);
    let mut table = PcCostTable {
        target_ipc,
        ..PcCostTable::default()
    };
    let mut index: FnvHashMap<&ProgramCounter, usize> = FnvHashMap::default();

    for (record, ipc) in records.iter().zip(ipc) {
        let cycles = if ipc > 0.0 { 1.0 / ipc } else { 0.0 };
        table.total_cycles += cycles;

        let slot = *index.entry(&record.pc).or_insert_with(|| {
            table.per_pc.push(PcCost {
                pc: record.pc.clone(),
                asm: record.asm.clone(),
                count: 0,
                total_cycles: 0.0,
            });
            table.per_pc.len() - 1
        });
        let cost = &mut table.per_pc[slot];
        cost.count += 1;
        cost.total_cycles += cycles;

        let kind = table
            .per_kind
            .entry(kinds.classify(&record.asm).to_string())
            .or_default();
        kind.count += 1;
        kind.total_cycles += cycles;
    }

    table.per_pc.sort_by(|a, b| {
        b.total_cycles
            .total_cmp(&a.total_cycles)
            .then_with(|| a.pc.cmp(&b.pc))
    });
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::StageCycles;

    fn instr(seq: u64, pc: u64, asm: &str, start: u64, latency: u64) -> InstructionRecord {
        InstructionRecord {
            seq,
            pc: ProgramCounter::Addr(pc),
            asm: asm.to_string(),
            stages: StageCycles {
                commit: start + latency,
                ..StageCycles::default()
            },
            last_commit: start,
            is_branch: false,
        }
    }

    #[test]
    fn test_shared_start_splits_first_latency() {
        let records = vec![
            instr(0, 0x0, "lw", 10, 6),
            instr(1, 0x4, "addi", 10, 6),
            instr(2, 0x8, "sw", 10, 1),
            instr(3, 0xc, "addi", 16, 4),
        ];
        let ipc = shared_start_ipc(&records);
        assert_eq!(ipc, vec![0.5, 0.5, 0.5, 0.25]);

        let table = pc_cost_table(&records, &InstructionClassifier::default(), 2.0);
        assert!((table.total_cycles - 10.0).abs() < 1e-12);
        for cost in table.per_pc.iter().filter(|c| c.pc != ProgramCounter::Addr(0xc)) {
            assert!((cost.total_cycles - 2.0).abs() < 1e-12);
        }
        assert_eq!(table.per_pc[0].pc, ProgramCounter::Addr(0xc));
    }

    #[test]
    fn test_group_latency_comes_from_earliest_member() {
        let records = vec![instr(5, 0x4, "addi", 0, 9), instr(2, 0x0, "lw", 0, 3)];
        assert_eq!(shared_start_ipc(&records), vec![2.0 / 3.0, 2.0 / 3.0]);
    }

    #[test]
    fn test_zero_latency_costs_nothing() {
        let records = vec![instr(0, 0x0, "nop", 7, 0), instr(1, 0x0, "nop", 7, 5)];
        let table = pc_cost_table(&records, &InstructionClassifier::default(), 2.0);
        assert_eq!(shared_start_ipc(&records), vec![0.0, 0.0]);
        assert_eq!(table.per_pc.len(), 1);
        assert_eq!(table.per_pc[0].count, 2);
        assert_eq!(table.total_cycles, 0.0);
    }

    #[test]
    fn test_per_pc_and_kind_accumulate() {
        let records = vec![
            instr(0, 0x40, "lw a0, 0(a1)", 0, 4),
            instr(1, 0x44, "addi a0, a0, 1", 4, 1),
            instr(2, 0x40, "lw a2, 4(a1)", 5, 4),
            instr(3, 0x44, "addi a0, a0, 1", 9, 1),
        ];
        let table = pc_cost_table(&records, &InstructionClassifier::default(), 2.0);

        let load = &table.per_pc[0];
        assert_eq!(load.pc, ProgramCounter::Addr(0x40));
        assert_eq!(load.asm, "lw a0, 0(a1)");
        assert_eq!(load.count, 2);
        assert!((load.avg_cycles() - 4.0).abs() < 1e-12);

        let kind = &table.per_kind["Load"];
        assert_eq!(kind.count, 2);
        assert!((kind.save_cycles(2.0) - 7.0).abs() < 1e-12);
        assert!((table.per_kind["Compute"].save_cycles(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_csv_layout() {
        let mut records = vec![
            instr(0, 0x10, "sw a0, 0(sp)", 0, 2),
            instr(1, 0x14, "sw a1, 4(sp)", 0, 2),
        ];
        records[1].pc = ProgramCounter::Raw("x,y".to_string());
        let table = pc_cost_table(&records, &InstructionClassifier::default(), 2.0);

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], "pc,asm,count,total_cycles,avg_cycles");
        assert_eq!(lines[1], "0x10,\"sw a0, 0(sp)\",1,1.000000,1.000000");
        assert_eq!(lines[2], "\"x,y\",\"sw a1, 4(sp)\",1,1.000000,1.000000");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "TOTAL_Cycles,2.000000");
        assert_eq!(lines[6], "Type,count,total_cycles,avg_cycles,save_cycles");
        assert_eq!(lines[7], "Store,2,2.000000,1.000000,1.0");
    }

    #[test]
    fn test_empty_trace() {
        let table = pc_cost_table(&[], &InstructionClassifier::default(), 2.0);
        assert!(table.per_pc.is_empty());
        assert!(table.per_kind.is_empty());
        assert_eq!(table.total_cycles, 0.0);
    }
}
