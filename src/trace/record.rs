//! Instruction record model and the fixed-field trace schemas

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Program counter of a retired instruction
///
/// Hex text is normalized to its numeric value, so `0x8000ABC0` and
/// `0x8000abc0` compare equal. Text that is not valid hex is kept (lower-cased)
/// so the row still keys a block, but it is never "sequential" to anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum ProgramCounter {
    Addr(u64),
    Raw(String),
}

impl ProgramCounter {
    /// Parse a program counter field; `None` for an empty field
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        match u64::from_str_radix(digits, 16) {
            Ok(addr) if !digits.is_empty() => Some(Self::Addr(addr)),
            _ => Some(Self::Raw(text.to_lowercase())),
        }
    }

    pub fn addr(&self) -> Option<u64> {
        match self {
            Self::Addr(addr) => Some(*addr),
            Self::Raw(_) => None,
        }
    }

    /// True when `self` is exactly `prev + fetch_width`
    pub fn follows(&self, prev: &ProgramCounter, fetch_width: u64) -> bool {
        match (prev.addr(), self.addr()) {
            (Some(prev), Some(cur)) => prev.checked_add(fetch_width) == Some(cur),
            _ => false,
        }
    }
}

impl fmt::Display for ProgramCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addr(addr) => write!(f, "0x{:x}", addr),
            Self::Raw(text) => f.write_str(text),
        }
    }
}

/// Pipeline-stage cycle stamps of one instruction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCycles {
    pub dispatch: u64,
    pub read_op: u64,
    pub execute: u64,
    pub write_back: u64,
    pub commit: u64,
}

/// One retired instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionRecord {
    pub seq: u64,
    pub pc: ProgramCounter,
    pub asm: String,
    pub stages: StageCycles,
    /// Cycle of the previous commit, i.e. when this instruction started retiring
    pub last_commit: u64,
    pub is_branch: bool,
}

impl InstructionRecord {
    pub fn start(&self) -> u64 {
        self.last_commit
    }

    /// `commit - last_commit`, clamped at zero for out-of-order stamps
    pub fn latency(&self) -> u64 {
        self.stages.commit.saturating_sub(self.last_commit)
    }

    pub fn end(&self) -> u64 {
        self.start() + self.latency()
    }
}

/// Why a row was excluded from the trace
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowDefect {
    #[error("row has {found} columns, program counter and mnemonic need {required}")]
    MissingIdentity { found: usize, required: usize },

    #[error("column {column} is not an integer: {value:?}")]
    BadNumber { column: &'static str, value: String },
}

/// Result of validating one row against a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Parsed {
        record: InstructionRecord,
        /// Trailing columns were missing and filled with zeros
        padded: bool,
    },
    Skipped(RowDefect),
}

/// Column layout of an instruction trace
///
/// `Pipeline16` is the exported analysis layout:
/// `pc, asm, fetch, preDecode, decode, dispatch, issue, readOp, execute,
/// execute1, execute2, writeBack, writeBackROB, commit, lastCmt, is_branch`.
///
/// `Sequenced` is the simulator's raw commit log:
/// `seq, pc, asm, lastCmt, fetch, preDecode, decode, dispatch, issue, readOp,
/// exe, exe1, exe2, wb, wbROB, commit, is_branch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TraceSchema {
    #[default]
    Pipeline16,
    Sequenced,
}

struct Layout {
    width: usize,
    seq: Option<usize>,
    pc: usize,
    asm: usize,
    dispatch: usize,
    read_op: usize,
    execute: usize,
    write_back: usize,
    commit: usize,
    last_commit: usize,
    branch: usize,
}

const PIPELINE16: Layout = Layout {
    width: 16,
    seq: None,
    pc: 0,
    asm: 1,
    dispatch: 5,
    read_op: 7,
    execute: 8,
    write_back: 11,
    commit: 13,
    last_commit: 14,
    branch: 15,
};

const SEQUENCED: Layout = Layout {
    width: 17,
    seq: Some(0),
    pc: 1,
    asm: 2,
    dispatch: 7,
    read_op: 9,
    execute: 10,
    write_back: 13,
    commit: 15,
    last_commit: 3,
    branch: 16,
};

impl TraceSchema {
    fn layout(self) -> &'static Layout {
        match self {
            Self::Pipeline16 => &PIPELINE16,
            Self::Sequenced => &SEQUENCED,
        }
    }

    /// Number of columns a complete row carries
    pub fn width(self) -> usize {
        self.layout().width
    }

    /// Column holding the program counter
    pub fn pc_column(self) -> usize {
        self.layout().pc
    }

    /// Column holding the commit cycle
    pub fn commit_column(self) -> usize {
        self.layout().commit
    }

    /// Validate one split row
    ///
    /// Missing trailing columns are padded with `0`. The program counter and
    /// mnemonic are never padded: a row too short to carry both is skipped.
    /// `seq` is used when the layout has no sequence column.
    pub fn parse_row(self, fields: &[String], seq: u64) -> RowOutcome {
        let layout = self.layout();
        let identity = layout.pc.max(layout.asm) + 1;
        if fields.len() < identity {
            return RowOutcome::Skipped(RowDefect::MissingIdentity {
                found: fields.len(),
                required: identity,
            });
        }

        let padded = fields.len() < layout.width;
        let field = |index: usize| fields.get(index).map(String::as_str).unwrap_or("0");
        let number = |index: usize, column: &'static str| -> Result<u64, RowDefect> {
            let value = field(index).trim();
            value.parse::<u64>().map_err(|_| RowDefect::BadNumber {
                column,
                value: value.to_string(),
            })
        };

        let parsed = (|| -> Result<InstructionRecord, RowDefect> {
            let pc = ProgramCounter::parse(field(layout.pc)).ok_or(RowDefect::MissingIdentity {
                found: fields.len(),
                required: identity,
            })?;
            let seq = match layout.seq {
                Some(index) => number(index, "seq")?,
                None => seq,
            };
            Ok(InstructionRecord {
                seq,
                pc,
                asm: field(layout.asm).trim().to_string(),
                stages: StageCycles {
                    dispatch: number(layout.dispatch, "dispatch")?,
                    read_op: number(layout.read_op, "readOp")?,
                    execute: number(layout.execute, "execute")?,
                    write_back: number(layout.write_back, "writeBack")?,
                    commit: number(layout.commit, "commit")?,
                },
                last_commit: number(layout.last_commit, "lastCmt")?,
                is_branch: number(layout.branch, "is_branch")? != 0,
            })
        })();

        match parsed {
            Ok(record) => RowOutcome::Parsed { record, padded },
            Err(defect) => RowOutcome::Skipped(defect),
        }
    }
}
