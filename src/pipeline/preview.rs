//! Preview: run two action lists side by side and mark what the candidate
//! list changes compared to the reference list.
//!
//! ```text
//! SOURCE => CLONE (2)
//!   -> reference actions -> REFERENCE CAPTURE
//!   -> candidate actions -> DIFF -> output
//! ```
//!
//! The clone link hands each row to the reference branch first. The capture
//! queues the reference result; the diff stage pairs it with the candidate
//! result of the same row.

use crate::action::{
    Action, ActionCompiler, ActionRegistry, CompileRequest, DefaultActionCompiler,
    DefaultStatisticsAdapter, NullAnalyzerService,
};
use crate::config::PipelineSettings;
use crate::dataset::{Row, RowMetadata};
use crate::pipeline::builder::NodeBuilder;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::executor::{NodeFactory, Pipeline};
use crate::pipeline::node::{Node, NodePlugin, PluginStage};
use crate::pipeline::runtime::RuntimeLink;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Reference results waiting for their candidate counterpart.
#[derive(Debug, Default)]
struct ReferenceQueue {
    rows: VecDeque<Row>,
    metadata: RowMetadata,
    /// Bumped whenever `metadata` changes.
    version: u64,
}

type SharedQueue = Arc<Mutex<ReferenceQueue>>;

fn lock(queue: &SharedQueue) -> MutexGuard<'_, ReferenceQueue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ReferenceCapture {
    queue: SharedQueue,
}

impl NodePlugin for ReferenceCapture {
    fn label(&self) -> String {
        "REFERENCE CAPTURE".to_string()
    }

    fn stage(&self) -> Box<dyn PluginStage> {
        Box::new(ReferenceCaptureStage {
            queue: self.queue.clone(),
        })
    }
}

struct ReferenceCaptureStage {
    queue: SharedQueue,
}

impl PluginStage for ReferenceCaptureStage {
    fn receive(
        &mut self,
        row: Row,
        metadata: &mut RowMetadata,
        _link: &mut RuntimeLink,
    ) -> PipelineResult<()> {
        let mut queue = lock(&self.queue);
        if queue.metadata != *metadata {
            queue.metadata = metadata.clone();
            queue.version += 1;
        }
        queue.rows.push_back(row);
        Ok(())
    }
}

struct DiffNode {
    queue: SharedQueue,
    indexes: Option<Arc<BTreeSet<u64>>>,
}

impl NodePlugin for DiffNode {
    fn label(&self) -> String {
        match &self.indexes {
            Some(indexes) => format!("DIFF ({} rows)", indexes.len()),
            None => "DIFF".to_string(),
        }
    }

    fn stage(&self) -> Box<dyn PluginStage> {
        Box::new(DiffStage {
            queue: self.queue.clone(),
            indexes: self.indexes.clone(),
            index: 0,
            reference_version: None,
            candidate: None,
            diffed: RowMetadata::default(),
        })
    }
}

struct DiffStage {
    queue: SharedQueue,
    indexes: Option<Arc<BTreeSet<u64>>>,
    /// Position of the next row among rows the reference kept.
    index: u64,
    reference_version: Option<u64>,
    candidate: Option<RowMetadata>,
    /// Candidate metadata flagged against the reference metadata.
    diffed: RowMetadata,
}

impl DiffStage {
    /// Rows outside `min..=max` of the requested indexes are never selected,
    /// even when the candidate brought them back.
    fn selected(&self, index: u64, row: &Row, reference_deleted: bool) -> bool {
        let Some(indexes) = &self.indexes else {
            return true;
        };
        let in_range = match (indexes.first(), indexes.last()) {
            (Some(min), Some(max)) => (*min..=*max).contains(&index),
            _ => false,
        };
        in_range && (indexes.contains(&index) || (reference_deleted && !row.is_deleted()))
    }
}

impl PluginStage for DiffStage {
    fn receive(
        &mut self,
        mut row: Row,
        metadata: &mut RowMetadata,
        link: &mut RuntimeLink,
    ) -> PipelineResult<()> {
        {
            let mut queue = lock(&self.queue);
            let reference = queue.rows.pop_front().ok_or_else(|| {
                PipelineError::Diff("candidate row has no reference row".to_string())
            })?;
            row.diff(reference);

            let candidate_changed = self.candidate.as_ref() != Some(&*metadata);
            if candidate_changed || self.reference_version != Some(queue.version) {
                let mut diffed = metadata.clone();
                diffed.diff(&queue.metadata);
                self.diffed = diffed;
                self.reference_version = Some(queue.version);
                self.candidate = Some(metadata.clone());
            }
        }

        let reference_deleted = row.reference().is_some_and(Row::is_deleted);
        let index = self.index;
        if !reference_deleted {
            self.index += 1;
        }
        if self.selected(index, &row, reference_deleted) {
            link.emit(row, &mut self.diffed)?;
        }
        Ok(())
    }
}

/// Builds a preview [`Pipeline`] from a reference and a candidate action
/// list. Statistics are never computed in a preview.
#[derive(Clone)]
pub struct PreviewBuilder {
    reference: Vec<Action>,
    candidate: Vec<Action>,
    metadata: RowMetadata,
    registry: Option<Arc<dyn ActionRegistry>>,
    compiler: Arc<dyn ActionCompiler>,
    indexes: Option<BTreeSet<u64>>,
    output: NodeFactory,
}

impl Default for PreviewBuilder {
    fn default() -> Self {
        Self {
            reference: Vec::new(),
            candidate: Vec::new(),
            metadata: RowMetadata::default(),
            registry: None,
            compiler: Arc::new(DefaultActionCompiler),
            indexes: None,
            output: Arc::new(Node::basic),
        }
    }
}

impl PreviewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.reference.extend(actions);
        self
    }

    pub fn with_candidate_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.candidate.extend(actions);
        self
    }

    pub fn with_initial_metadata(mut self, metadata: RowMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_action_registry(mut self, registry: Arc<dyn ActionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn ActionCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Only emit rows at these positions (counted over rows the reference
    /// kept), plus rows the candidate brings back.
    pub fn with_indexes(mut self, indexes: impl IntoIterator<Item = u64>) -> Self {
        self.indexes = Some(indexes.into_iter().collect());
        self
    }

    pub fn with_output(mut self, output: impl Fn() -> Node + Send + Sync + 'static) -> Self {
        self.output = Arc::new(output);
        self
    }

    pub fn with_settings(mut self, settings: &PipelineSettings) -> Self {
        if let Some(indexes) = &settings.preview.indexes {
            self = self.with_indexes(indexes.iter().copied());
        }
        self
    }

    fn compile(&self, actions: &[Action]) -> PipelineResult<Node> {
        self.compiler.compile(CompileRequest {
            metadata: &self.metadata,
            actions,
            need_statistics_before: false,
            need_statistics_after: false,
            allow_schema_change: false,
            registry: self.registry.clone(),
            analyzer_service: Arc::new(NullAnalyzerService),
            adapter: Arc::new(DefaultStatisticsAdapter),
        })
    }

    pub fn build(&self) -> PipelineResult<Pipeline> {
        let queue = SharedQueue::default();

        let reference = NodeBuilder::from(self.compile(&self.reference)?)
            .to(Node::plugin(ReferenceCapture {
                queue: queue.clone(),
            }))
            .build()?;
        let candidate = NodeBuilder::from(self.compile(&self.candidate)?)
            .to(Node::plugin(DiffNode {
                queue,
                indexes: self.indexes.clone().map(Arc::new),
            }))
            .to((self.output)())
            .build()?;

        let root = NodeBuilder::source()
            .to_many(vec![reference, candidate])
            .build()?;
        let pipeline = Pipeline::new(root);
        tracing::debug!("Preview built:\n{}", pipeline);
        Ok(pipeline)
    }
}

/// Columns an action list creates compared to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepDiff {
    pub created_columns: Vec<String>,
}

/// Compile `base` and `new` against copies of `metadata` and return the ids
/// of the columns `new` has and `base` has not.
pub fn created_columns(
    metadata: &RowMetadata,
    base: &[Action],
    new: &[Action],
    registry: Arc<dyn ActionRegistry>,
) -> PipelineResult<StepDiff> {
    let compile_all = |actions: &[Action]| -> PipelineResult<RowMetadata> {
        let mut compiled = metadata.clone();
        for action in actions {
            let implementation = registry
                .get(&action.name)
                .ok_or_else(|| PipelineError::UnknownAction(action.name.clone()))?;
            let step = crate::action::ActionStep::new(action.clone(), implementation);
            step.compile(&mut step.new_context(), &mut compiled)?;
        }
        Ok(compiled)
    };

    let base_metadata = compile_all(base)?;
    let mut new_metadata = compile_all(new)?;
    new_metadata.diff(&base_metadata);
    Ok(StepDiff {
        created_columns: new_metadata.created_columns(),
    })
}
