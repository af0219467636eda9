//! Column descriptors carried alongside every row of a run.

use crate::dataset::diff::Flag;
use serde::{Deserialize, Serialize};

/// Type name given to columns guessed from raw rows.
pub const STRING_TYPE: &str = "string";

/// Quality counters for a single column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub valid: u64,
    #[serde(default)]
    pub empty: u64,
    #[serde(default)]
    pub invalid: u64,
}

/// Description of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub type_name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub statistics: ColumnStatistics,
    /// Set by [`RowMetadata::diff`] when previewing.
    #[serde(
        rename = "__tdpColumnDiff",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub diff_flag: Option<Flag>,
}

fn default_type() -> String {
    STRING_TYPE.to_string()
}

impl ColumnMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            type_name: default_type(),
            domain: String::new(),
            statistics: ColumnStatistics::default(),
            diff_flag: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// True when name, type or domain differ. Statistics are not compared.
    pub(crate) fn differs_from(&self, other: &ColumnMetadata) -> bool {
        self.name != other.name || self.type_name != other.type_name || self.domain != other.domain
    }
}

/// Ordered list of columns describing the rows of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowMetadata {
    #[serde(default)]
    columns: Vec<ColumnMetadata>,
}

impl RowMetadata {
    pub fn new(columns: Vec<ColumnMetadata>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut Vec<ColumnMetadata> {
        &mut self.columns
    }

    pub fn column(&self, id: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_mut(&mut self, id: &str) -> Option<&mut ColumnMetadata> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    pub fn add_column(&mut self, column: ColumnMetadata) {
        self.columns.push(column);
    }

    /// Add a column after `after_id` (or at the end when not found) and return
    /// the id assigned to it. Ids are the next free four-digit number, the
    /// same scheme [`RowMetadata::next_id`] uses.
    pub fn insert_after(&mut self, after_id: &str, name: impl Into<String>) -> String {
        let id = self.next_id();
        let column = ColumnMetadata::new(id.clone(), name);
        match self.columns.iter().position(|c| c.id == after_id) {
            Some(pos) => self.columns.insert(pos + 1, column),
            None => self.columns.push(column),
        }
        id
    }

    pub fn remove_column(&mut self, id: &str) -> Option<ColumnMetadata> {
        let pos = self.columns.iter().position(|c| c.id == id)?;
        Some(self.columns.remove(pos))
    }

    /// Next unused numeric column id, formatted as `%04d`.
    pub fn next_id(&self) -> String {
        let next = self
            .columns
            .iter()
            .filter_map(|c| c.id.parse::<u32>().ok())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        format!("{:04}", next)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Flag every column of `self` against `reference`.
    ///
    /// - columns absent from the reference are marked [`Flag::New`],
    /// - reference columns absent from `self` are put back at their reference
    ///   position and marked [`Flag::Delete`],
    /// - columns whose name, type or domain changed are marked [`Flag::Update`].
    ///
    /// Existing flags are cleared first, so diffing twice is stable.
    pub fn diff(&mut self, reference: &RowMetadata) {
        for column in &mut self.columns {
            column.diff_flag = match reference.column(&column.id) {
                None => Some(Flag::New),
                Some(original) if column.differs_from(original) => Some(Flag::Update),
                Some(_) => None,
            };
        }

        for (position, original) in reference.columns.iter().enumerate() {
            if self.column(&original.id).is_none() {
                let mut deleted = original.clone();
                deleted.diff_flag = Some(Flag::Delete);
                let position = position.min(self.columns.len());
                self.columns.insert(position, deleted);
            }
        }
    }

    /// Ids of the columns flagged [`Flag::New`] by the last [`RowMetadata::diff`].
    pub fn created_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.diff_flag == Some(Flag::New))
            .map(|c| c.id.clone())
            .collect()
    }
}
