#![no_main]

use libfuzzer_sys::fuzz_target;
use stallscope::instruction_kind::InstructionClassifier;
use stallscope::pc_stats::pc_cost_table;
use stallscope::pipeline_stages::attribute_stages;
use stallscope::trace::{
    parse_event_line, parse_event_trace, parse_instruction_trace, split_row, TraceSchema,
};

fuzz_target!(|data: &[u8]| {
    // Whole-file readers take raw bytes; undecodable lines are skipped, never fatal
    let kinds = InstructionClassifier::default();
    for schema in [TraceSchema::Pipeline16, TraceSchema::Sequenced] {
        let (records, _) = parse_instruction_trace(data, schema).expect("in-memory read");
        let _ = attribute_stages(&records, &kinds);
        let _ = pc_cost_table(&records, &kinds, 2.0);
    }
    let (log, _) = parse_event_trace(data).expect("in-memory read");
    let _ = log.lower_bound(u64::MAX);

    if let Ok(input) = std::str::from_utf8(data) {
        let fields = split_row(input);
        let _ = TraceSchema::Pipeline16.parse_row(&fields, 0);
        let _ = TraceSchema::Sequenced.parse_row(&fields, 0);
        let _ = parse_event_line(input);
    }
});
