//! Pipeline-specific error types.

use thiserror::Error;

/// Graph construction protocol violations reported by
/// [`crate::pipeline::NodeBuilder`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    #[error("expected node(s) after a link, got another link")]
    LinkAfterLink,

    #[error("expected a link after a node, got more nodes")]
    NodesAfterNodes,

    #[error("a basic link needs exactly one target, got {0}")]
    BasicLinkArity(usize),

    #[error("a clone link needs at least one target")]
    EmptyCloneLink,

    #[error("cannot append after a terminal node")]
    AfterTerminal,

    #[error("cannot continue after a fan-out to {0} branches")]
    AmbiguousTail(usize),

    #[error("graph ends with a link that has no target")]
    DanglingLink,
}

/// Errors that can occur while building or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid graph: {0}")]
    InvalidGraph(#[from] BuilderError),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("No action registry to resolve {0} action(s)")]
    MissingRegistry(usize),

    #[error("Action {action} failed: {message}")]
    Action { action: String, message: String },

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Diff error: {0}")]
    Diff(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset records were already consumed")]
    DatasetConsumed,

    #[error("Pipeline is already executing")]
    AlreadyRunning,
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
