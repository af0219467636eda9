//! Action collaborators consumed by the pipeline.
//!
//! The engine never knows what an action does. It resolves names through an
//! [`ActionRegistry`], asks the implementation for its [`Behavior`]s when
//! planning, then calls `compile` and `apply` from the compile/action node
//! pair built by an [`ActionCompiler`].

pub mod compiler;
pub mod statistics;

pub use compiler::{ActionCompiler, CompileRequest, DefaultActionCompiler};
pub use statistics::{
    Analyzer, AnalyzerService, ColumnAnalysis, DefaultStatisticsAdapter, NullAnalyzerService,
    StatisticsAdapter,
};

use crate::dataset::{Row, RowMetadata};
use crate::pipeline::error::PipelineResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A named step with its parameters, as stored in a preparation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

/// What an action touches; drives where statistics are recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Behavior {
    /// Rewrites values of every column.
    ValuesAll,
    /// Rewrites values of the column named by the `column_id` parameter.
    ValuesColumn,
    MetadataChangeType,
    MetadataCreateColumns,
    MetadataCopyColumns,
    MetadataDeleteColumns,
    MetadataChangeName,
    /// Needs up-to-date statistics before it compiles.
    NeedStatistics,
}

/// Status shared by a compile/action node pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionStatus {
    #[default]
    Ok,
    /// `apply` is skipped for the rest of the run.
    Canceled,
}

/// Per-action state: the parameters, a status and whatever the action keeps
/// between `compile` and `apply`.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    parameters: BTreeMap<String, String>,
    status: ActionStatus,
    store: HashMap<String, String>,
}

impl ActionContext {
    pub fn new(parameters: BTreeMap<String, String>) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn status(&self) -> ActionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ActionStatus) {
        self.status = status;
    }

    pub fn cancel(&mut self) {
        self.status = ActionStatus::Canceled;
    }

    pub fn is_canceled(&self) -> bool {
        self.status == ActionStatus::Canceled
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.store.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.store.insert(key.into(), value.into());
    }

    /// Forget compiled state before a recompilation. Parameters survive.
    pub fn reset(&mut self) {
        self.status = ActionStatus::Ok;
        self.store.clear();
    }
}

/// An action's behavior, supplied by the action catalog.
pub trait ActionImplementation: Send + Sync {
    fn behavior(&self) -> Vec<Behavior>;

    /// Prepare for the rows to come; may change `metadata` (add, rename or
    /// retype columns) and may cancel the action through `context`.
    fn compile(&self, context: &mut ActionContext, metadata: &mut RowMetadata)
        -> PipelineResult<()>;

    fn apply(&self, row: &mut Row, context: &mut ActionContext) -> PipelineResult<()>;
}

/// Name → implementation lookup.
pub trait ActionRegistry: Send + Sync {
    fn get(&self, name: &str) -> Option<Arc<dyn ActionImplementation>>;
}

/// Registry backed by a map.
#[derive(Default, Clone)]
pub struct StaticActionRegistry {
    actions: HashMap<String, Arc<dyn ActionImplementation>>,
}

impl StaticActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, action: Arc<dyn ActionImplementation>) -> Self {
        self.register(name, action);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, action: Arc<dyn ActionImplementation>) {
        self.actions.insert(name.into(), action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ActionRegistry for StaticActionRegistry {
    fn get(&self, name: &str) -> Option<Arc<dyn ActionImplementation>> {
        self.actions.get(name).cloned()
    }
}

impl fmt::Debug for StaticActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.actions.keys().collect();
        names.sort();
        f.debug_struct("StaticActionRegistry")
            .field("actions", &names)
            .finish()
    }
}

/// Context shared by the compile and action runtimes of one step for the
/// length of a run.
pub type SharedContext = Arc<Mutex<ActionContext>>;

pub(crate) fn lock_context(context: &SharedContext) -> MutexGuard<'_, ActionContext> {
    context.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A resolved action, shared by the compile node and the action node that
/// follows it. Holds no run state; each run gets a fresh context from
/// [`ActionStep::new_context`].
pub struct ActionStep {
    action: Action,
    implementation: Arc<dyn ActionImplementation>,
}

impl ActionStep {
    pub fn new(action: Action, implementation: Arc<dyn ActionImplementation>) -> Self {
        Self {
            action,
            implementation,
        }
    }

    pub fn name(&self) -> &str {
        &self.action.name
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn implementation(&self) -> &dyn ActionImplementation {
        self.implementation.as_ref()
    }

    pub fn new_context(&self) -> ActionContext {
        ActionContext::new(self.action.parameters.clone())
    }

    /// Reset `context` and compile against `metadata`.
    pub fn compile(
        &self,
        context: &mut ActionContext,
        metadata: &mut RowMetadata,
    ) -> PipelineResult<()> {
        context.reset();
        self.implementation.compile(context, metadata)
    }

    /// Apply to `row` unless `context` was canceled. Returns whether the
    /// action ran.
    pub fn apply(&self, context: &mut ActionContext, row: &mut Row) -> PipelineResult<bool> {
        if context.is_canceled() {
            return Ok(false);
        }
        self.implementation.apply(row, context)?;
        Ok(true)
    }
}

impl fmt::Debug for ActionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionStep")
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}
