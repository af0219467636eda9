//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use dataprep_rs::dataset::{ColumnMetadata, InMemoryDataSet, Row, RowMetadata};
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(500)
}

/// Metadata with one string column per name, ids `0000`, `0001`, ...
pub fn metadata(names: &[&str]) -> RowMetadata {
    RowMetadata::new(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnMetadata::new(format!("{:04}", i), *name))
            .collect(),
    )
}

/// Single-column dataset over column `0000`.
pub fn dataset(values: &[&str]) -> InMemoryDataSet {
    InMemoryDataSet::new(
        metadata(&["value"]),
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Row::from_values([("0000", *v)]).with_tdp_id(i as u64 + 1))
            .collect(),
    )
}
