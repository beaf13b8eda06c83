//! Trace ingestion: retired-instruction logs and memory-subsystem event logs
//!
//! Both logs are read once, validated row by row, and handed downstream as
//! immutable data. Malformed rows never abort a run; they are counted in the
//! parse summaries instead.

mod events;
mod instructions;
mod record;
mod row;

pub use events::{parse_event_line, parse_event_trace, CacheEvent, EventLog, EventParseSummary};
pub use instructions::{parse_instruction_trace, InstructionParseSummary};
pub use record::{InstructionRecord, ProgramCounter, RowDefect, RowOutcome, StageCycles, TraceSchema};
pub use row::{escape_field, split_row};

use thiserror::Error;

/// Errors raised while reading a trace source
///
/// Row-level problems are not errors; only failures of the underlying reader are.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}
