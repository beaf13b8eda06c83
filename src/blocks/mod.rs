//! Basic-block reconstruction from a flat retired-instruction log
//!
//! A block is recovered operationally: an address starts a block when it is
//! reached non-sequentially or right after a control transfer. Every dynamic
//! execution of a block is one iteration, and each iteration reduces to a
//! half-open cycle window.

mod reconstruct;
mod window;

pub use reconstruct::{find_block_starts, reconstruct_blocks, BasicBlock, BlockMap};
pub use window::{iteration_windows, IterationWindow, WindowSet};
