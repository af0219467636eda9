//! # dataprep-rs: streaming data preparation pipelines
//!
//! Rows from a [`dataset::DataSet`] flow through a graph of nodes that apply
//! user actions, gather column statistics and write the result. The same
//! graph can be run again and again; each run gets fresh runtime state.
//!
//! ## Architecture
//!
//! - **Plan**: [`pipeline::Node`] trees linked by [`pipeline::Link`]s, built
//!   with [`pipeline::NodeBuilder`] or [`pipeline::PipelineBuilder`]
//! - **Runtime**: each plan node produces a [`pipeline::RuntimeNode`] per run
//! - **Actions**: named transformations resolved through an
//!   [`action::ActionRegistry`] and compiled into compile/action node pairs
//! - **Preview**: [`pipeline::PreviewBuilder`] runs two action lists side by
//!   side and flags what the candidate changes
//!
//! ## Example
//!
//! ```
//! use dataprep_rs::dataset::{ColumnMetadata, InMemoryDataSet, Row, RowMetadata};
//! use dataprep_rs::pipeline::PipelineBuilder;
//!
//! let pipeline = PipelineBuilder::new()
//!     .with_initial_metadata(RowMetadata::new(vec![ColumnMetadata::new("0000", "name")]))
//!     .build()
//!     .unwrap();
//!
//! let mut dataset = InMemoryDataSet::new(
//!     RowMetadata::new(vec![ColumnMetadata::new("0000", "name")]),
//!     vec![Row::from_values([("0000", "Lily")])],
//! );
//! assert_eq!(pipeline.execute(&mut dataset).unwrap(), 1);
//! ```

pub mod action;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::PipelineSettings;
pub use error::{PrepError, Result};
pub use logging::init_logging;
