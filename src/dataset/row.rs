//! A single mutable record flowing through the pipeline.

use crate::dataset::diff::{Flag, RowDiff, DIFF_KEY, ROW_DIFF_KEY};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key of the technical row id in rendered rows.
pub const TDP_ID: &str = "tdpId";

/// A record: column id → value, ordered by column id.
///
/// Rows move by value through the graph; a fork must clone (see
/// [`crate::pipeline::RuntimeLink`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, String>,
    deleted: bool,
    tdp_id: Option<u64>,
    /// Row computed by the reference branch, set by [`Row::diff`].
    reference: Option<Box<Row>>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_tdp_id(mut self, id: u64) -> Self {
        self.tdp_id = Some(id);
        self
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn set(&mut self, id: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(id.into(), value.into());
        self
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.values.remove(id)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }

    pub fn tdp_id(&self) -> Option<u64> {
        self.tdp_id
    }

    pub fn set_tdp_id(&mut self, id: Option<u64>) {
        self.tdp_id = id;
    }

    /// Remember `reference` as the row this one is compared against.
    pub fn diff(&mut self, reference: Row) {
        self.reference = Some(Box::new(reference));
    }

    pub fn reference(&self) -> Option<&Row> {
        self.reference.as_deref()
    }

    /// Whether a writer should output this row.
    ///
    /// Without a reference a deleted row is skipped. With one, a row is
    /// skipped only when both sides deleted it.
    pub fn should_write(&self) -> bool {
        match &self.reference {
            None => !self.deleted,
            Some(reference) => !reference.deleted || !self.deleted,
        }
    }

    /// Compare with the reference set by [`Row::diff`].
    pub fn diff_flags(&self) -> RowDiff {
        let Some(reference) = self.reference.as_deref() else {
            return RowDiff::default();
        };

        if reference.deleted && !self.deleted {
            return RowDiff {
                row: Some(Flag::New),
                cells: BTreeMap::new(),
            };
        }
        if !reference.deleted && self.deleted {
            return RowDiff {
                row: Some(Flag::Delete),
                cells: BTreeMap::new(),
            };
        }

        let mut cells = BTreeMap::new();
        for (id, value) in &self.values {
            match reference.values.get(id) {
                None => {
                    cells.insert(id.clone(), Flag::New);
                }
                Some(original) if original != value => {
                    cells.insert(id.clone(), Flag::Update);
                }
                Some(_) => {}
            }
        }
        for id in reference.values.keys() {
            if !self.values.contains_key(id) {
                cells.insert(id.clone(), Flag::Delete);
            }
        }
        RowDiff { row: None, cells }
    }

    /// Render the row as a JSON object, including diff markers when a
    /// reference is present. Cells deleted by the candidate are rendered with
    /// their reference value so they can still be displayed.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut result = Map::new();
        let diff = self.diff_flags();

        match (diff.row, self.reference.as_deref()) {
            (Some(Flag::Delete), Some(reference)) => {
                result.insert(ROW_DIFF_KEY.to_string(), Value::from(Flag::Delete.as_str()));
                extend_values(&mut result, &reference.values);
            }
            (Some(flag), _) => {
                result.insert(ROW_DIFF_KEY.to_string(), Value::from(flag.as_str()));
                extend_values(&mut result, &self.values);
            }
            (None, reference) => {
                extend_values(&mut result, &self.values);
                if let Some(reference) = reference {
                    for (id, flag) in &diff.cells {
                        if *flag == Flag::Delete {
                            if let Some(original) = reference.values.get(id) {
                                result.insert(id.clone(), Value::from(original.as_str()));
                            }
                        }
                    }
                }
                if !diff.cells.is_empty() {
                    let cells: Map<String, Value> = diff
                        .cells
                        .iter()
                        .map(|(id, flag)| (id.clone(), Value::from(flag.as_str())))
                        .collect();
                    result.insert(DIFF_KEY.to_string(), Value::Object(cells));
                }
            }
        }

        if let Some(id) = self.tdp_id {
            result.insert(TDP_ID.to_string(), Value::from(id));
        }
        result
    }
}

fn extend_values(target: &mut Map<String, Value>, values: &BTreeMap<String, String>) {
    for (id, value) in values {
        target.insert(id.clone(), Value::from(value.as_str()));
    }
}
