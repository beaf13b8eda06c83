//! Two-pass block recovery: collect block starts, then cut the trace at them

use crate::trace::{InstructionRecord, ProgramCounter};
use fnv::{FnvHashMap, FnvHashSet};
use tracing::debug;

/// A reconstructed basic block and all of its dynamic executions
///
/// Iterations borrow contiguous runs of the parsed trace, so concatenating
/// them in program order yields the input records.
#[derive(Debug, Clone)]
pub struct BasicBlock<'a> {
    id: usize,
    start: ProgramCounter,
    iterations: Vec<&'a [InstructionRecord]>,
}

impl<'a> BasicBlock<'a> {
    /// Stable id, assigned in order of first discovery
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn start(&self) -> &ProgramCounter {
        &self.start
    }

    pub fn iterations(&self) -> &[&'a [InstructionRecord]] {
        &self.iterations
    }

    pub fn instruction_count(&self) -> usize {
        self.iterations.iter().map(|it| it.len()).sum()
    }
}

/// All blocks of one trace, in id order, with lookup by start address
#[derive(Debug, Clone, Default)]
pub struct BlockMap<'a> {
    blocks: Vec<BasicBlock<'a>>,
    by_start: FnvHashMap<ProgramCounter, usize>,
}

impl<'a> BlockMap<'a> {
    pub fn blocks(&self) -> &[BasicBlock<'a>] {
        &self.blocks
    }

    pub fn get(&self, start: &ProgramCounter) -> Option<&BasicBlock<'a>> {
        self.by_start.get(start).map(|&id| &self.blocks[id])
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Append an iteration to the block starting at `start`, creating it first if needed
    fn push_iteration(&mut self, start: &ProgramCounter, iteration: &'a [InstructionRecord]) {
        let id = match self.by_start.get(start) {
            Some(&id) => id,
            None => {
                let id = self.blocks.len();
                self.blocks.push(BasicBlock {
                    id,
                    start: start.clone(),
                    iterations: Vec::new(),
                });
                self.by_start.insert(start.clone(), id);
                id
            }
        };
        self.blocks[id].iterations.push(iteration);
    }
}

/// First pass: every address at which some block begins
///
/// The first instruction is a start. An instruction is a start when it does
/// not sit `fetch_width` after its predecessor, or when its predecessor is a
/// control transfer (even a not-taken one that falls through sequentially).
pub fn find_block_starts(
    records: &[InstructionRecord],
    fetch_width: u64,
) -> FnvHashSet<ProgramCounter> {
    let mut starts = FnvHashSet::default();
    if let Some(first) = records.first() {
        starts.insert(first.pc.clone());
    }
    for pair in records.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if prev.is_branch || !cur.pc.follows(&prev.pc, fetch_width) {
            starts.insert(cur.pc.clone());
        }
    }
    starts
}

/// Second pass: split the trace at block starts and file each iteration under its block
///
/// # Example
/// ```
/// use stallscope::blocks::reconstruct_blocks;
/// use stallscope::trace::{parse_instruction_trace, TraceSchema};
///
/// // A two-instruction loop: 0x0 -> 0x4 (branch back) -> 0x0 -> 0x4
/// let log = "0x0,addi,0,0,0,0,0,0,0,0,0,0,0,1,0,0\n\
///            0x4,bne,0,0,0,0,0,0,0,0,0,0,0,2,1,1\n\
///            0x0,addi,0,0,0,0,0,0,0,0,0,0,0,3,2,0\n\
///            0x4,bne,0,0,0,0,0,0,0,0,0,0,0,4,3,1\n";
/// let (records, _) = parse_instruction_trace(log.as_bytes(), TraceSchema::Pipeline16)?;
/// let blocks = reconstruct_blocks(&records, 4);
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks.blocks()[0].iterations().len(), 2);
/// # Ok::<(), stallscope::trace::TraceError>(())
/// ```
pub fn reconstruct_blocks(records: &[InstructionRecord], fetch_width: u64) -> BlockMap<'_> {
    let starts = find_block_starts(records, fetch_width);
    let mut map = BlockMap::default();

    let mut open = 0;
    for (index, record) in records.iter().enumerate() {
        if index > open && starts.contains(&record.pc) {
            map.push_iteration(&records[open].pc, &records[open..index]);
            open = index;
        }
    }
    if open < records.len() {
        map.push_iteration(&records[open].pc, &records[open..]);
    }

    debug!(
        blocks = map.len(),
        starts = starts.len(),
        instructions = records.len(),
        "basic blocks reconstructed"
    );
    map
}
