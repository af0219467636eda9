//! Crate-level errors for settings and loading.
//!
//! Pipeline execution has its own [`PipelineError`]; it converts into
//! [`PrepError`] so callers mixing both can use a single `?`.

use crate::pipeline::error::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    /// Errors related to settings loading
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PrepError>,
    },
}

impl PrepError {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PrepError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<toml::de::Error> for PrepError {
    fn from(err: toml::de::Error) -> Self {
        PrepError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<PrepError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Into::<PrepError>::into(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Into::<PrepError>::into(e).with_context(f()))
    }
}
