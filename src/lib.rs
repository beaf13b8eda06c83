//! stallscope - cache-stall attribution for cycle-accurate pipeline traces
//!
//! This library reconstructs basic blocks from a retired-instruction trace,
//! reduces every block iteration to a cycle window, groups the windows into
//! fixed-size sublayers, and correlates each sublayer with a memory event log
//! by address region and latency.

pub mod block_summary;
pub mod blocks;
pub mod cli;
pub mod config;
pub mod correlation;
pub mod hierarchy;
pub mod instruction_kind;
pub mod pc_stats;
pub mod pipeline;
pub mod pipeline_stages;
pub mod report;
pub mod trace;
