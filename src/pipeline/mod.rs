//! Node-based row pipeline.
//!
//! A plan is a tree of [`Node`]s joined by [`Link`]s. Executing a
//! [`Pipeline`] turns the plan into a chain of [`RuntimeNode`]s and pushes
//! every dataset row through it, followed by one `EndOfStream` signal.
//!
//! # Architecture
//!
//! ```text
//! [SOURCE] ──► [COMPILE a] ──► [ACTION a] ──► [STATISTICS] ──► [output] ──► [monitor]
//!
//! [SOURCE] ══► [reference actions] ──► [REFERENCE CAPTURE]
//!          ╚═► [candidate actions] ──► [DIFF] ──► [output]
//! ```
//!
//! # Design
//!
//! - **Plan / runtime split**: a plan is immutable once built; per-run state
//!   lives in runtime nodes created by [`Node::exec`].
//! - **Enum dispatch**: node and link kinds are enums, walked by the
//!   [`Visitor`] default methods.
//! - **Extension points**: [`NodePlugin`] for custom nodes, action and
//!   analyzer traits for behavior.

pub mod builder;
pub mod dump;
pub mod error;
pub mod executor;
pub mod link;
pub mod monitor;
pub mod node;
pub mod nodes;
pub mod preview;
pub mod runtime;
pub mod signal;
pub mod visitor;

pub use builder::NodeBuilder;
pub use dump::PipelineConsoleDump;
pub use error::{BuilderError, PipelineError, PipelineResult};
pub use executor::{NodeFactory, Pipeline, PipelineBuilder};
pub use link::{Link, LinkKind};
pub use monitor::{Monitored, NodeMetrics};
pub use node::{Node, NodeKind, NodePlugin, PluginStage, RowPredicate};
pub use nodes::{ColumnFilter, JsonLinesWriter, RowWriter, StatisticsStep, WriterNode};
pub use preview::{created_columns, PreviewBuilder, StepDiff};
pub use runtime::{CloneRuntime, RuntimeLink, RuntimeNode};
pub use signal::Signal;
pub use visitor::{walk_basic_link, walk_clone_link, walk_node, walk_pipeline, Visitor};
