//! Instruction trace parsing
//!
//! Simulator logs routinely end with truncated rows, and a multi-million-row
//! trace must not fail on one of them. Short rows are zero-padded; rows that
//! still do not validate are skipped and counted.

use super::record::{InstructionRecord, ProgramCounter, RowOutcome, TraceSchema};
use super::row::{raw_lines, split_row, RawLine};
use super::TraceError;
use serde::Serialize;
use std::io::BufRead;
use tracing::{debug, trace, warn};

/// Row accounting for one instruction trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstructionParseSummary {
    /// Non-blank rows seen, header excluded
    pub rows_read: usize,
    pub rows_padded: usize,
    pub rows_skipped: usize,
    pub header_detected: bool,
}

/// A first row is a header when it names its columns instead of carrying data
fn looks_like_header(fields: &[String], schema: TraceSchema) -> bool {
    let pc_is_address = fields
        .get(schema.pc_column())
        .and_then(|pc| ProgramCounter::parse(pc))
        .is_some_and(|pc| pc.addr().is_some());
    let commit_is_number = fields
        .get(schema.commit_column())
        .is_some_and(|commit| commit.trim().parse::<u64>().is_ok());
    !pc_is_address && !commit_is_number
}

/// Parse an instruction trace into records in file order
///
/// Sequence numbers for schemas without a sequence column are assigned over
/// retained rows, so they stay dense and monotonic.
///
/// # Example
/// ```
/// use stallscope::trace::{parse_instruction_trace, TraceSchema};
///
/// let log = "pc,asm,fetch,preDecode,decode,dispatch,issue,readOp,execute,execute1,execute2,writeBack,writeBackROB,commit,lastCmt,is_branch\n\
///            0x80000000,\"addi a0, a0, 1\",1,1,1,2,2,3,4,4,4,5,5,6,0,0\n";
/// let (records, summary) = parse_instruction_trace(log.as_bytes(), TraceSchema::Pipeline16)?;
/// assert_eq!(records.len(), 1);
/// assert!(summary.header_detected);
/// assert_eq!(records[0].asm, "addi a0, a0, 1");
/// # Ok::<(), stallscope::trace::TraceError>(())
/// ```
pub fn parse_instruction_trace<R: BufRead>(
    reader: R,
    schema: TraceSchema,
) -> Result<(Vec<InstructionRecord>, InstructionParseSummary), TraceError> {
    let mut records = Vec::new();
    let mut summary = InstructionParseSummary::default();
    let mut first_row = true;

    for line in raw_lines(reader) {
        let RawLine { number, text } = line?;
        let Some(text) = text else {
            trace!(line = number, "skipping instruction row that is not UTF-8");
            first_row = false;
            summary.rows_read += 1;
            summary.rows_skipped += 1;
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }

        let fields = split_row(&text);
        if first_row {
            first_row = false;
            if looks_like_header(&fields, schema) {
                debug!(line = number, "skipping instruction trace header");
                summary.header_detected = true;
                continue;
            }
        }

        summary.rows_read += 1;
        match schema.parse_row(&fields, records.len() as u64) {
            RowOutcome::Parsed { record, padded } => {
                if padded {
                    summary.rows_padded += 1;
                }
                records.push(record);
            }
            RowOutcome::Skipped(defect) => {
                trace!(line = number, %defect, "skipping instruction row");
                summary.rows_skipped += 1;
            }
        }
    }

    if summary.rows_skipped > 0 {
        warn!(
            skipped = summary.rows_skipped,
            read = summary.rows_read,
            "instruction rows skipped"
        );
    }
    debug!(
        records = records.len(),
        padded = summary.rows_padded,
        "instruction trace parsed"
    );

    Ok((records, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "pc,asm,fetch,preDecode,decode,dispatch,issue,readOp,execute,execute1,execute2,writeBack,writeBackROB,commit,lastCmt,is_branch";

    fn row(pc: &str, last_commit: u64, commit: u64, branch: u8) -> String {
        format!(
            "{},\"nop\",0,0,0,0,0,0,0,0,0,0,0,{},{},{}",
            pc, commit, last_commit, branch
        )
    }

    #[test]
    fn test_header_is_optional() {
        let body = format!("{}\n{}\n", row("0x0", 0, 1, 0), row("0x4", 1, 2, 0));
        let with_header = format!("{}\n{}", HEADER, body);

        let (plain, plain_summary) =
            parse_instruction_trace(body.as_bytes(), TraceSchema::Pipeline16).unwrap();
        let (headed, headed_summary) =
            parse_instruction_trace(with_header.as_bytes(), TraceSchema::Pipeline16).unwrap();

        assert_eq!(plain, headed);
        assert!(!plain_summary.header_detected);
        assert!(headed_summary.header_detected);
        assert_eq!(headed_summary.rows_read, 2);
    }

    #[test]
    fn test_sequence_numbers_are_dense_over_retained_rows() {
        let log = format!(
            "{}\n0x4,nop,1,2,3,4,5,6,7,8,9,10,11,bad,0,0\n{}\n",
            row("0x0", 0, 1, 0),
            row("0x8", 1, 2, 0)
        );
        let (records, summary) =
            parse_instruction_trace(log.as_bytes(), TraceSchema::Pipeline16).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].seq, 0);
        assert_eq!(records[1].seq, 1);
        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(summary.rows_read, 3);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let log = format!("\n{}\n\n   \n{}\n", row("0x0", 0, 1, 0), row("0x4", 1, 2, 1));
        let (records, summary) =
            parse_instruction_trace(log.as_bytes(), TraceSchema::Pipeline16).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(summary.rows_read, 2);
        assert!(records[1].is_branch);
    }

    #[test]
    fn test_truncated_rows_are_padded() {
        let log = "0x0,nop,1,2\n0x4,nop\n";
        let (records, summary) =
            parse_instruction_trace(log.as_bytes(), TraceSchema::Pipeline16).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(summary.rows_padded, 2);
        assert_eq!(summary.rows_skipped, 0);
        assert!(records.iter().all(|r| r.latency() == 0));
    }

    #[test]
    fn test_undecodable_row_is_skipped_not_fatal() {
        let mut log = Vec::new();
        log.extend_from_slice(row("0x0", 0, 1, 0).as_bytes());
        log.extend_from_slice(b"\n0x4,\"\xff\xfe\",0,0,0,0,0,0,0,0,0,0,0,2,1,0\n");
        log.extend_from_slice(row("0x8", 2, 3, 0).as_bytes());
        log.push(b'\n');

        let (records, summary) =
            parse_instruction_trace(log.as_slice(), TraceSchema::Pipeline16).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].pc, ProgramCounter::Addr(0x8));
        assert_eq!(records[1].seq, 1);
        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.rows_skipped, 1);
    }

    #[test]
    fn test_undecodable_first_row_is_not_a_header() {
        let mut log = b"\xff,\xff\n".to_vec();
        log.extend_from_slice(HEADER.as_bytes());
        log.push(b'\n');
        let (records, summary) =
            parse_instruction_trace(log.as_slice(), TraceSchema::Pipeline16).unwrap();
        assert!(records.is_empty());
        assert!(!summary.header_detected);
        assert_eq!(summary.rows_skipped, 2);
    }

    #[test]
    fn test_sequenced_schema_keeps_file_sequence() {
        let log = "5,0x80000000,\"lw a0, 0(a1)\",10,1,2,3,4,5,6,7,8,9,10,11,14,0\n";
        let (records, _) = parse_instruction_trace(log.as_bytes(), TraceSchema::Sequenced).unwrap();
        assert_eq!(records[0].seq, 5);
        assert_eq!(records[0].asm, "lw a0, 0(a1)");
        assert_eq!(records[0].latency(), 4);
    }
}
