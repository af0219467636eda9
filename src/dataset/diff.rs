//! Diff flags computed between a candidate row and its reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key holding the row-level flag in rendered rows.
pub const ROW_DIFF_KEY: &str = "__tdpRowDiff";
/// Key holding the per-cell flags in rendered rows.
pub const DIFF_KEY: &str = "__tdpDiff";

/// Kind of change observed between the reference and the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    New,
    Update,
    Delete,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::New => "new",
            Flag::Update => "update",
            Flag::Delete => "delete",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of comparing a row against its reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowDiff {
    /// Set when the row appeared or disappeared as a whole.
    pub row: Option<Flag>,
    /// Per-column flags, only meaningful when `row` is `None`.
    pub cells: BTreeMap<String, Flag>,
}

impl RowDiff {
    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.row.is_none() && self.cells.is_empty()
    }
}
