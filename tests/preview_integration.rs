//! Reference / candidate previews

mod common;

use common::builders::{registry, CaptureSink};
use common::{dataset, metadata};
use dataprep_rs::action::Action;
use dataprep_rs::config::PipelineSettings;
use dataprep_rs::dataset::{Flag, ROW_DIFF_KEY};
use dataprep_rs::pipeline::{
    created_columns, JsonLinesWriter, Node, PipelineError, PreviewBuilder, Signal, WriterNode,
};
use serde_json::Value;

fn uppercase() -> Action {
    Action::new("uppercase").with_parameter("column_id", "0000")
}

fn preview(sink: &CaptureSink) -> PreviewBuilder {
    let sink = sink.clone();
    PreviewBuilder::new()
        .with_initial_metadata(metadata(&["value"]))
        .with_action_registry(registry())
        .with_output(move || Node::plugin(sink.clone()))
}

#[test]
fn test_identical_lists_produce_no_diff() {
    let sink = CaptureSink::new();
    let pipeline = preview(&sink)
        .with_reference_actions([uppercase()])
        .with_candidate_actions([uppercase()])
        .build()
        .unwrap();

    pipeline.execute(&mut dataset(&["a", "b"])).unwrap();

    let rows = sink.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.diff_flags().is_empty()));
    let metadata = sink.last_metadata().unwrap();
    assert!(metadata.columns().iter().all(|c| c.diff_flag.is_none()));
    assert_eq!(sink.signals(), vec![Signal::EndOfStream]);
}

#[test]
fn test_candidate_changes_are_flagged() {
    let sink = CaptureSink::new();
    let pipeline = preview(&sink)
        .with_candidate_actions([
            uppercase(),
            Action::new("copy").with_parameter("column_id", "0000"),
        ])
        .build()
        .unwrap();

    pipeline.execute(&mut dataset(&["a"])).unwrap();

    let rows = sink.rows();
    let diff = rows[0].diff_flags();
    assert_eq!(diff.row, None);
    assert_eq!(diff.cells.get("0000"), Some(&Flag::Update));
    assert_eq!(diff.cells.get("0001"), Some(&Flag::New));
    assert_eq!(rows[0].reference().unwrap().get("0000"), Some("a"));

    let metadata = sink.last_metadata().unwrap();
    assert_eq!(metadata.created_columns(), vec!["0001".to_string()]);
}

#[test]
fn test_index_filter_keeps_rows_brought_back() {
    let sink = CaptureSink::new();
    let pipeline = preview(&sink)
        .with_reference_actions([Action::new("delete_matching").with_parameter("value", "b")])
        .with_indexes([0, 2])
        .build()
        .unwrap();

    pipeline
        .execute(&mut dataset(&["a", "b", "c", "d"]))
        .unwrap();

    assert_eq!(sink.values("0000"), vec!["a", "b", "d"]);
    assert_eq!(sink.rows()[1].diff_flags().row, Some(Flag::New));
}

#[test]
fn test_index_filter_ignores_rows_brought_back_outside_window() {
    let sink = CaptureSink::new();
    let pipeline = preview(&sink)
        .with_reference_actions([Action::new("delete_matching").with_parameter("value", "b")])
        .with_indexes([0])
        .build()
        .unwrap();

    pipeline
        .execute(&mut dataset(&["a", "c", "d", "b"]))
        .unwrap();

    assert_eq!(sink.values("0000"), vec!["a"]);
}

#[test]
fn test_index_filter_drops_rows_deleted_on_both_sides() {
    let sink = CaptureSink::new();
    let delete_b = Action::new("delete_matching").with_parameter("value", "b");
    let pipeline = preview(&sink)
        .with_reference_actions([delete_b.clone()])
        .with_candidate_actions([delete_b])
        .with_indexes([0, 2])
        .build()
        .unwrap();

    pipeline
        .execute(&mut dataset(&["a", "b", "c", "d"]))
        .unwrap();

    assert_eq!(sink.values("0000"), vec!["a", "d"]);
}

#[test]
fn test_settings_indexes_show_in_dump() {
    let settings =
        PipelineSettings::from_toml_str("[preview]\nindexes = [0]").unwrap();
    let pipeline = preview(&CaptureSink::new())
        .with_settings(&settings)
        .build()
        .unwrap();

    let dump = pipeline.to_string();
    assert!(dump.starts_with("-> SOURCE\n=> CLONE (2)\n"));
    assert!(dump.contains("REFERENCE CAPTURE"));
    assert!(dump.contains("DIFF (1 rows)"));
}

#[test]
fn test_written_preview_carries_row_markers() {
    let writer = WriterNode::new(JsonLinesWriter::new(Vec::new()));
    let handle = writer.writer();
    let pipeline = PreviewBuilder::new()
        .with_initial_metadata(metadata(&["value"]))
        .with_action_registry(registry())
        .with_candidate_actions([Action::new("delete_matching").with_parameter("value", "b")])
        .with_output(move || Node::plugin(writer.clone()))
        .build()
        .unwrap();

    pipeline.execute(&mut dataset(&["a", "b"])).unwrap();

    let writer = handle.lock().unwrap();
    // A row deleted by the candidate only is still written, marked deleted.
    assert_eq!(writer.rows_written(), 2);
    let text = String::from_utf8(writer.get_ref().clone()).unwrap();
    let lines: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines[1][ROW_DIFF_KEY], "delete");
    assert_eq!(lines[1]["0000"], "b");
}

#[test]
fn test_created_columns_between_lists() {
    let diff = created_columns(
        &metadata(&["value"]),
        &[uppercase()],
        &[uppercase(), Action::new("copy")],
        registry(),
    )
    .unwrap();
    assert_eq!(diff.created_columns, vec!["0001".to_string()]);

    let same = created_columns(&metadata(&["value"]), &[uppercase()], &[uppercase()], registry())
        .unwrap();
    assert!(same.created_columns.is_empty());
}

#[test]
fn test_created_columns_unknown_action() {
    let err = created_columns(&metadata(&["value"]), &[], &[Action::new("nope")], registry())
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownAction(name) if name == "nope"));
}
