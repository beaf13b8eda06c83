//! CSV rendering of sublayer rows

use super::SublayerStat;
use crate::correlation::Bucket;
use std::io::{self, Write};

fn header() -> String {
    let mut columns: Vec<String> = [
        "block_id",
        "group_index",
        "sublayer_index",
        "global_index",
        "iter_first",
        "iter_last",
        "start",
        "end",
        "window_len",
        "match_count",
        "match_duration",
        "occupancy_ratio",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();

    for bucket in Bucket::ALL {
        columns.push(format!("{}_count", bucket.label()));
        columns.push(format!("{}_duration", bucket.label()));
    }
    columns.join(",")
}

fn format_row(row: &SublayerStat) -> String {
    let mut fields = vec![
        row.block_id.to_string(),
        row.group_index.to_string(),
        row.sublayer_index.to_string(),
        row.global_index.to_string(),
        row.iter_first.to_string(),
        row.iter_last.to_string(),
        row.start.to_string(),
        row.end.to_string(),
        row.window_len.to_string(),
        row.match_count.to_string(),
        row.match_duration.to_string(),
        format!("{:.6}", row.occupancy_ratio),
    ];
    for stat in row.buckets() {
        fields.push(stat.count.to_string());
        fields.push(stat.duration.to_string());
    }
    fields.join(",")
}

/// Write a header line and one line per row
pub fn write_csv<W: Write>(rows: &[SublayerStat], mut out: W) -> io::Result<()> {
    writeln!(out, "{}", header())?;
    for row in rows {
        writeln!(out, "{}", format_row(row))?;
    }
    out.flush()
}
