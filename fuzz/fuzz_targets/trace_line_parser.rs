#![no_main]

use ctxaudit::audit::run_audit;
use ctxaudit::config::AuditConfig;
use ctxaudit::loader::parse_trace_bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must load into events plus diagnostics, never panic
    let trace = parse_trace_bytes(data, "fuzz.jsonl");
    let report = run_audit(&trace, None, &AuditConfig::default());
    assert_eq!(report.total_events_analyzed, trace.events().len());
});
