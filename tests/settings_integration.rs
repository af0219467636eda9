//! Settings files applied to builders

mod common;

use common::builders::{registry, CaptureSink};
use common::{dataset, metadata};
use dataprep_rs::action::Action;
use dataprep_rs::config::PipelineSettings;
use dataprep_rs::pipeline::{Node, PipelineBuilder};
use dataprep_rs::PrepError;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[statistics]
before = true
after = false

[pipeline]
allow_metadata_change = false

[logging]
filter = "debug"
"#
    )
    .unwrap();

    let settings = PipelineSettings::load(file.path()).unwrap();

    assert!(settings.statistics.before);
    assert!(!settings.statistics.after);
    assert!(!settings.pipeline.allow_metadata_change);
    assert_eq!(settings.logging.filter, "debug");
    assert_eq!(settings.preview.indexes, None);
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.toml");
    let mut settings = PipelineSettings::default();
    settings.preview.indexes = Some(vec![1, 4]);

    settings.save(&path).unwrap();

    assert_eq!(PipelineSettings::load(&path).unwrap(), settings);
}

#[test]
fn test_missing_file_has_context() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineSettings::load(dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, PrepError::WithContext { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_settings_shape_the_plan() {
    let settings = PipelineSettings::from_toml_str(
        "[statistics]\nbefore = true\nafter = false",
    )
    .unwrap();
    let sink = CaptureSink::new();
    let output = sink.clone();
    let pipeline = PipelineBuilder::new()
        .with_initial_metadata(metadata(&["value"]))
        .with_action_registry(registry())
        .with_actions([Action::new("uppercase").with_parameter("column_id", "0000")])
        .with_settings(&settings)
        .with_output(move || Node::plugin(output.clone()))
        .build()
        .unwrap();

    let dump = pipeline.to_string();
    assert_eq!(dump.matches("STATISTICS").count(), 1);
    assert!(dump.contains("STATISTICS (all columns)"));

    pipeline.execute(&mut dataset(&["x"])).unwrap();
    assert_eq!(sink.values("0000"), vec!["X"]);
}
