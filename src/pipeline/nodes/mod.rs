//! Built-in node implementations that carry their own state.

pub mod statistics;
pub mod writer;

pub use statistics::{ColumnFilter, StatisticsStep};
pub use writer::{JsonLinesWriter, RowWriter, WriterNode};
