//! Datasets consumed by the pipeline: column metadata plus a one-shot record
//! stream.
//!
//! The record stream is an iterator of `PipelineResult<Row>`. Dropping it
//! closes whatever resource backs it, so the pipeline gets scoped release for
//! free on every exit path.

pub mod diff;
pub mod metadata;
pub mod row;

pub use diff::{Flag, RowDiff, DIFF_KEY, ROW_DIFF_KEY};
pub use metadata::{ColumnMetadata, ColumnStatistics, RowMetadata, STRING_TYPE};
pub use row::{Row, TDP_ID};

use crate::pipeline::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;

/// Record stream handed out by [`DataSet::records`].
pub type Records<'a> = Box<dyn Iterator<Item = PipelineResult<Row>> + 'a>;

/// Source of rows for [`crate::pipeline::Pipeline::execute`].
pub trait DataSet {
    /// Column metadata of the records. The pipeline clones it once per run.
    fn metadata(&self) -> &RowMetadata;

    /// Open the record stream. Streams are one-shot.
    fn records(&mut self) -> PipelineResult<Records<'_>>;
}

/// Dataset held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSet {
    metadata: RowMetadata,
    records: Option<Vec<Row>>,
}

#[derive(Deserialize)]
struct DataSetDocument {
    #[serde(default)]
    metadata: RowMetadata,
    #[serde(default)]
    records: Vec<BTreeMap<String, Value>>,
}

impl InMemoryDataSet {
    pub fn new(metadata: RowMetadata, records: Vec<Row>) -> Self {
        Self {
            metadata,
            records: Some(records),
        }
    }

    /// Parse `{"metadata": {"columns": [...]}, "records": [{...}]}`.
    ///
    /// Scalar values are kept as their string form; `tdpId` becomes the
    /// technical row id.
    pub fn from_json_reader(reader: impl Read) -> PipelineResult<Self> {
        let document: DataSetDocument = serde_json::from_reader(reader)?;
        Self::from_document(document)
    }

    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let document: DataSetDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    fn from_document(document: DataSetDocument) -> PipelineResult<Self> {
        let records = document
            .records
            .into_iter()
            .map(record_to_row)
            .collect::<PipelineResult<Vec<_>>>()?;
        Ok(Self::new(document.metadata, records))
    }

    /// True once the record stream has been handed out.
    pub fn is_consumed(&self) -> bool {
        self.records.is_none()
    }
}

fn record_to_row(record: BTreeMap<String, Value>) -> PipelineResult<Row> {
    let mut row = Row::new();
    for (key, value) in record {
        if key == TDP_ID {
            let id = value.as_u64().ok_or_else(|| {
                PipelineError::Serialization(format!("{} must be an unsigned integer", TDP_ID))
            })?;
            row.set_tdp_id(Some(id));
            continue;
        }
        let value = match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        row.set(key, value);
    }
    Ok(row)
}

impl DataSet for InMemoryDataSet {
    fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    fn records(&mut self) -> PipelineResult<Records<'_>> {
        let records = self.records.take().ok_or(PipelineError::DatasetConsumed)?;
        Ok(Box::new(records.into_iter().map(Ok)))
    }
}
