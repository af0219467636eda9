//! Live side of the graph: one [`RuntimeNode`] chain per run.

use crate::action::{lock_context, ActionStep, SharedContext};
use crate::dataset::{Row, RowMetadata};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::monitor::NodeMetrics;
use crate::pipeline::node::{PluginStage, RowPredicate};
use crate::pipeline::signal::Signal;
use std::sync::{Arc, Mutex};

/// Action contexts of one run, one per step. The compile and action nodes of
/// a step find the same context here.
#[derive(Default)]
pub(crate) struct RunContexts {
    contexts: Vec<(Arc<ActionStep>, SharedContext)>,
}

impl RunContexts {
    pub(crate) fn for_step(&mut self, step: &Arc<ActionStep>) -> SharedContext {
        if let Some((_, context)) = self.contexts.iter().find(|(s, _)| Arc::ptr_eq(s, step)) {
            return context.clone();
        }
        let context = Arc::new(Mutex::new(step.new_context()));
        self.contexts.push((step.clone(), context.clone()));
        context
    }
}

/// A node as it runs. Receives rows and signals from upstream.
pub trait RuntimeNode: Send {
    fn receive(&mut self, row: Row, metadata: &mut RowMetadata) -> PipelineResult<()>;

    fn signal(&mut self, signal: Signal) -> PipelineResult<()>;
}

/// Live counterpart of [`crate::pipeline::Link`].
pub enum RuntimeLink {
    Basic(Box<dyn RuntimeNode>),
    Clone(CloneRuntime),
    Null,
}

impl RuntimeLink {
    pub fn emit(&mut self, row: Row, metadata: &mut RowMetadata) -> PipelineResult<()> {
        match self {
            RuntimeLink::Basic(target) => target.receive(row, metadata),
            RuntimeLink::Clone(clone) => clone.emit(row, metadata),
            RuntimeLink::Null => Ok(()),
        }
    }

    pub fn signal(&mut self, signal: Signal) -> PipelineResult<()> {
        match self {
            RuntimeLink::Basic(target) => target.signal(signal),
            RuntimeLink::Clone(clone) => clone.signal(signal),
            RuntimeLink::Null => Ok(()),
        }
    }
}

/// One fan-out target with the metadata it owns.
struct Branch {
    node: Box<dyn RuntimeNode>,
    metadata: RowMetadata,
    /// Upstream metadata `metadata` was last cloned from.
    upstream: Option<RowMetadata>,
}

impl Branch {
    fn receive(&mut self, row: Row, upstream: &RowMetadata) -> PipelineResult<()> {
        if self.upstream.as_ref() != Some(upstream) {
            self.metadata = upstream.clone();
            self.upstream = Some(upstream.clone());
        }
        self.node.receive(row, &mut self.metadata)
    }
}

/// Fan-out to several targets, in declaration order.
///
/// Every target but the last gets its own copy of the row; the last one gets
/// the original. Each target also works on its own copy of the metadata, so
/// what one branch changes is never seen by its siblings. A branch keeps its
/// metadata across rows until the upstream metadata changes.
pub struct CloneRuntime {
    branches: Vec<Branch>,
}

impl CloneRuntime {
    pub fn new(targets: Vec<Box<dyn RuntimeNode>>) -> Self {
        let branches = targets
            .into_iter()
            .map(|node| Branch {
                node,
                metadata: RowMetadata::default(),
                upstream: None,
            })
            .collect();
        Self { branches }
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    fn emit(&mut self, row: Row, metadata: &RowMetadata) -> PipelineResult<()> {
        let Some((last, rest)) = self.branches.split_last_mut() else {
            return Ok(());
        };
        for branch in rest {
            branch.receive(row.clone(), metadata)?;
        }
        last.receive(row, metadata)
    }

    fn signal(&mut self, signal: Signal) -> PipelineResult<()> {
        for branch in &mut self.branches {
            branch.node.signal(signal)?;
        }
        Ok(())
    }
}

/// Source and basic nodes.
pub(crate) struct PassThrough {
    link: RuntimeLink,
}

impl PassThrough {
    pub(crate) fn new(link: RuntimeLink) -> Self {
        Self { link }
    }
}

impl RuntimeNode for PassThrough {
    fn receive(&mut self, row: Row, metadata: &mut RowMetadata) -> PipelineResult<()> {
        self.link.emit(row, metadata)
    }

    fn signal(&mut self, signal: Signal) -> PipelineResult<()> {
        self.link.signal(signal)
    }
}

/// Filtered sources and output filters.
pub(crate) struct FilterRuntime {
    predicate: RowPredicate,
    link: RuntimeLink,
}

impl FilterRuntime {
    pub(crate) fn new(predicate: RowPredicate, link: RuntimeLink) -> Self {
        Self { predicate, link }
    }
}

impl RuntimeNode for FilterRuntime {
    fn receive(&mut self, row: Row, metadata: &mut RowMetadata) -> PipelineResult<()> {
        if (self.predicate)(&row) {
            self.link.emit(row, metadata)
        } else {
            Ok(())
        }
    }

    fn signal(&mut self, signal: Signal) -> PipelineResult<()> {
        self.link.signal(signal)
    }
}

pub(crate) struct TerminalRuntime;

impl RuntimeNode for TerminalRuntime {
    fn receive(&mut self, _row: Row, _metadata: &mut RowMetadata) -> PipelineResult<()> {
        Ok(())
    }

    fn signal(&mut self, _signal: Signal) -> PipelineResult<()> {
        Ok(())
    }
}

/// Compiles its action whenever the upstream metadata differs from what it
/// last compiled against.
///
/// The compiled metadata belongs to this node and is what downstream nodes
/// see. Changes made further down therefore never flow back into the
/// comparison, and a chain of compile nodes settles after one row.
pub(crate) struct CompileRuntime {
    step: Arc<ActionStep>,
    context: SharedContext,
    metrics: Arc<NodeMetrics>,
    last_input: Option<RowMetadata>,
    compiled: RowMetadata,
    link: RuntimeLink,
}

impl CompileRuntime {
    pub(crate) fn new(
        step: Arc<ActionStep>,
        context: SharedContext,
        metrics: Arc<NodeMetrics>,
        link: RuntimeLink,
    ) -> Self {
        Self {
            step,
            context,
            metrics,
            last_input: None,
            compiled: RowMetadata::default(),
            link,
        }
    }
}

impl RuntimeNode for CompileRuntime {
    fn receive(&mut self, row: Row, metadata: &mut RowMetadata) -> PipelineResult<()> {
        {
            let _timer = self.metrics.time_row();
            if self.last_input.as_ref() != Some(&*metadata) {
                if self.last_input.is_some() {
                    tracing::debug!(action = self.step.name(), "Metadata changed, recompiling");
                } else {
                    tracing::debug!(action = self.step.name(), "Compiling action");
                }
                let mut compiled = metadata.clone();
                self.step
                    .compile(&mut lock_context(&self.context), &mut compiled)?;
                self.compiled = compiled;
                self.last_input = Some(metadata.clone());
            }
        }
        self.link.emit(row, &mut self.compiled)
    }

    fn signal(&mut self, signal: Signal) -> PipelineResult<()> {
        self.link.signal(signal)
    }
}

/// Applies its action to every row unless the action was canceled.
pub(crate) struct ActionRuntime {
    step: Arc<ActionStep>,
    context: SharedContext,
    metrics: Arc<NodeMetrics>,
    link: RuntimeLink,
}

impl ActionRuntime {
    pub(crate) fn new(
        step: Arc<ActionStep>,
        context: SharedContext,
        metrics: Arc<NodeMetrics>,
        link: RuntimeLink,
    ) -> Self {
        Self {
            step,
            context,
            metrics,
            link,
        }
    }
}

impl RuntimeNode for ActionRuntime {
    fn receive(&mut self, mut row: Row, metadata: &mut RowMetadata) -> PipelineResult<()> {
        {
            let _timer = self.metrics.time_row();
            self.step.apply(&mut lock_context(&self.context), &mut row)?;
        }
        self.link.emit(row, metadata)
    }

    fn signal(&mut self, signal: Signal) -> PipelineResult<()> {
        self.link.signal(signal)
    }
}

/// Runs a plugin stage. Timings include whatever the stage forwards.
pub(crate) struct PluginRuntime {
    stage: Box<dyn PluginStage>,
    metrics: Arc<NodeMetrics>,
    link: RuntimeLink,
}

impl PluginRuntime {
    pub(crate) fn new(
        stage: Box<dyn PluginStage>,
        metrics: Arc<NodeMetrics>,
        link: RuntimeLink,
    ) -> Self {
        Self {
            stage,
            metrics,
            link,
        }
    }
}

impl RuntimeNode for PluginRuntime {
    fn receive(&mut self, row: Row, metadata: &mut RowMetadata) -> PipelineResult<()> {
        let _timer = self.metrics.time_row();
        self.stage.receive(row, metadata, &mut self.link)
    }

    fn signal(&mut self, signal: Signal) -> PipelineResult<()> {
        let _timer = self.metrics.time_signal();
        self.stage.signal(signal, &mut self.link)
    }
}
