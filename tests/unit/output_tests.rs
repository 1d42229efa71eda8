//! Summary rendering against real write results

use xml_record_writer::{Output, OutputFormat, VerbosityLevel};

use crate::common::test_helpers::{item, items_config, write_document};

#[test]
fn test_human_summary_of_a_run() {
    let (_, result) = write_document(items_config(), vec![item(1, "A"), item(2, "B")]);
    let summary = result.unwrap();

    let text = Output::new(VerbosityLevel::Normal)
        .without_colors()
        .format(&summary, OutputFormat::Human);

    assert!(text.contains("Records read: 2"));
    assert!(text.contains("Written: 2"));
    assert!(text.contains("Success rate: 100.0%"));
}

#[test]
fn test_json_summary_round_trips_counts() {
    let (_, result) = write_document(items_config(), vec![item(1, "A")]);
    let summary = result.unwrap();

    let json = Output::new(VerbosityLevel::Quiet).format(&summary, OutputFormat::Json);
    let parsed: xml_record_writer::WriteSummary = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.records_written, 1);
    assert_eq!(parsed.node_name.as_deref(), Some("Item"));
}

#[test]
fn test_one_line_summary() {
    let (_, result) = write_document(items_config(), vec![item(1, "A")]);
    let line = Output::new(VerbosityLevel::Normal).format(&result.unwrap(), OutputFormat::Summary);

    assert!(line.starts_with("read=1 written=1 skipped=0 filtered=0 failed=0 aborted=false"));
    assert!(line.ends_with('\n'));
}
