//! Pipeline executor: drives a dataset through the runtime chain of a plan.
//!
//! Each [`Pipeline::execute`] call:
//! 1. Clones the dataset metadata as the run baseline.
//! 2. Builds a fresh runtime chain and publishes it in the active-run slot.
//! 3. Pushes every record through the chain, checking the cancel flag before
//!    and the stop flag after each row.
//! 4. Sends one `EndOfStream` once the loop ends.
//!
//! A second thread may call [`Pipeline::signal`] meanwhile. `Stop` ends the
//! loop and waits for the run to finish; `Cancel` is delivered to the chain
//! between two rows, and no row follows it.

use crate::action::{
    Action, ActionCompiler, ActionRegistry, AnalyzerService, CompileRequest,
    DefaultActionCompiler, DefaultStatisticsAdapter, NullAnalyzerService, StatisticsAdapter,
};
use crate::config::PipelineSettings;
use crate::dataset::{DataSet, Row, RowMetadata};
use crate::pipeline::builder::NodeBuilder;
use crate::pipeline::dump::PipelineConsoleDump;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::{Node, NodeKind, RowPredicate};
use crate::pipeline::runtime::RuntimeNode;
use crate::pipeline::signal::Signal;
use crate::pipeline::visitor::Visitor;
use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Produces a fresh node each time a pipeline is built.
pub type NodeFactory = Arc<dyn Fn() -> Node + Send + Sync>;

type SharedRuntime = Arc<Mutex<Box<dyn RuntimeNode>>>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State of the run in flight.
struct ActiveRun {
    runtime: SharedRuntime,
    /// Disconnects when the run ends; nothing is ever sent.
    done: Receiver<()>,
}

/// Clears the active run on every exit path of `execute`.
struct RunGuard<'a> {
    pipeline: &'a Pipeline,
    _done: Sender<()>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.pipeline.run) = None;
        self.pipeline.stopped.store(false, Ordering::SeqCst);
        self.pipeline.canceled.store(false, Ordering::SeqCst);
        // `_done` drops after this, releasing `Stop` waiters.
    }
}

/// A built graph, ready to execute datasets one after the other.
pub struct Pipeline {
    root: Node,
    stopped: AtomicBool,
    /// Set under the chain lock when `Cancel` reached the live chain.
    canceled: AtomicBool,
    run: Mutex<Option<ActiveRun>>,
}

impl Pipeline {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            stopped: AtomicBool::new(false),
            canceled: AtomicBool::new(false),
            run: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        lock(&self.run).is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.visit_pipeline(self);
    }

    /// Push every record of `dataset` through the graph, then signal
    /// `EndOfStream`. Returns the number of rows pushed.
    ///
    /// Errors from the records, the nodes or the sink are returned as is and
    /// no `EndOfStream` is sent. The record stream is dropped before this
    /// returns, whatever the outcome.
    pub fn execute(&self, dataset: &mut dyn DataSet) -> PipelineResult<u64> {
        let mut metadata = dataset.metadata().clone();
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let runtime: SharedRuntime = {
            let mut run = lock(&self.run);
            if run.is_some() {
                return Err(PipelineError::AlreadyRunning);
            }
            let runtime = Arc::new(Mutex::new(self.root.exec()));
            *run = Some(ActiveRun {
                runtime: runtime.clone(),
                done: done_rx,
            });
            runtime
        };
        let _guard = RunGuard {
            pipeline: self,
            _done: done_tx,
        };

        tracing::info!(columns = metadata.len(), "Pipeline execution started");
        let mut count = 0u64;
        {
            let records = dataset.records()?;
            for record in records {
                let row = record?;
                {
                    let mut chain = lock(&runtime);
                    if self.canceled.load(Ordering::SeqCst) {
                        tracing::debug!(rows = count, "Cancel received, ending run");
                        break;
                    }
                    chain.receive(row, &mut metadata)?;
                }
                count += 1;
                if self.stopped.load(Ordering::SeqCst) {
                    tracing::debug!(rows = count, "Stop requested, ending run");
                    break;
                }
            }
        }
        lock(&runtime).signal(Signal::EndOfStream)?;

        tracing::info!(rows = count, "Pipeline execution finished");
        Ok(count)
    }

    /// Control the pipeline from any thread.
    ///
    /// - `Stop` ends the current run after the row in progress and blocks
    ///   until that run has finished. Sent while idle, it ends the next run
    ///   after its first row.
    /// - `Cancel` also ends the run, and is forwarded to the live chain right
    ///   away so buffering nodes drop what they hold. No row follows it.
    /// - `EndOfStream` is forwarded as is.
    ///
    /// Must not be called from inside a node of the same pipeline.
    pub fn signal(&self, signal: Signal) -> PipelineResult<()> {
        match signal {
            Signal::Stop => {
                tracing::debug!("Stop requested");
                self.stopped.store(true, Ordering::SeqCst);
                let done = lock(&self.run).as_ref().map(|run| run.done.clone());
                if let Some(done) = done {
                    // Disconnects when the run ends.
                    let _ = done.recv();
                }
                Ok(())
            }
            Signal::Cancel => {
                tracing::debug!("Cancel requested");
                let runtime = lock(&self.run).as_ref().map(|run| run.runtime.clone());
                match runtime {
                    Some(runtime) => {
                        let mut chain = lock(&runtime);
                        self.canceled.store(true, Ordering::SeqCst);
                        self.stopped.store(true, Ordering::SeqCst);
                        chain.signal(signal)
                    }
                    None => {
                        self.stopped.store(true, Ordering::SeqCst);
                        self.root.exec().signal(signal)
                    }
                }
            }
            Signal::EndOfStream => self.forward(signal),
        }
    }

    /// Deliver to the live chain, or to a fresh one when idle.
    fn forward(&self, signal: Signal) -> PipelineResult<()> {
        let runtime = lock(&self.run).as_ref().map(|run| run.runtime.clone());
        match runtime {
            Some(runtime) => lock(&runtime).signal(signal),
            None => self.root.exec().signal(signal),
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dump = PipelineConsoleDump::new();
        self.accept(&mut dump);
        f.write_str(dump.output())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("root", &self.root)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

/// Assembles source → compiled actions → output filter → output → monitor.
///
/// Every knob is a plain value; [`PipelineBuilder::build`] can be called any
/// number of times and returns a new pipeline each time.
#[derive(Clone)]
pub struct PipelineBuilder {
    actions: Vec<Action>,
    metadata: RowMetadata,
    registry: Option<Arc<dyn ActionRegistry>>,
    compiler: Arc<dyn ActionCompiler>,
    analyzer_service: Arc<dyn AnalyzerService>,
    adapter: Arc<dyn StatisticsAdapter>,
    in_filter: Option<RowPredicate>,
    out_filter: Option<RowPredicate>,
    output: NodeFactory,
    monitor: NodeFactory,
    need_statistics_before: bool,
    need_statistics_after: bool,
    allow_metadata_change: bool,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            metadata: RowMetadata::default(),
            registry: None,
            compiler: Arc::new(DefaultActionCompiler),
            analyzer_service: Arc::new(NullAnalyzerService),
            adapter: Arc::new(DefaultStatisticsAdapter),
            in_filter: None,
            out_filter: None,
            output: Arc::new(Node::basic),
            monitor: Arc::new(Node::basic),
            need_statistics_before: false,
            need_statistics_after: true,
            allow_metadata_change: true,
        }
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append actions to the list.
    pub fn with_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Metadata the actions are planned against.
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

    pub fn with_analyzer_service(mut self, service: Arc<dyn AnalyzerService>) -> Self {
        self.analyzer_service = service;
        self
    }

    pub fn with_statistics_adapter(mut self, adapter: Arc<dyn StatisticsAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Only rows matching `filter` enter the pipeline.
    pub fn with_filter(mut self, filter: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        self.in_filter = Some(Arc::new(filter));
        self
    }

    /// Only rows matching `filter` reach the output.
    pub fn with_filter_out(
        mut self,
        filter: impl Fn(&Row) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.out_filter = Some(Arc::new(filter));
        self
    }

    /// Output node, e.g. a [`crate::pipeline::WriterNode`] plugin. It must not
    /// be terminal since the monitor follows it.
    pub fn with_output(mut self, output: impl Fn() -> Node + Send + Sync + 'static) -> Self {
        self.output = Arc::new(output);
        self
    }

    pub fn with_monitor(mut self, monitor: impl Fn() -> Node + Send + Sync + 'static) -> Self {
        self.monitor = Arc::new(monitor);
        self
    }

    pub fn with_statistics_before(mut self, enabled: bool) -> Self {
        self.need_statistics_before = enabled;
        self
    }

    /// Statistics over the modified columns once all actions ran.
    pub fn with_global_statistics(mut self, enabled: bool) -> Self {
        self.need_statistics_after = enabled;
        self
    }

    pub fn allow_metadata_change(mut self, allowed: bool) -> Self {
        self.allow_metadata_change = allowed;
        self
    }

    pub fn with_settings(self, settings: &PipelineSettings) -> Self {
        self.with_statistics_before(settings.statistics.before)
            .with_global_statistics(settings.statistics.after)
            .allow_metadata_change(settings.pipeline.allow_metadata_change)
    }

    pub fn build(&self) -> PipelineResult<Pipeline> {
        let compiled = self.compiler.compile(CompileRequest {
            metadata: &self.metadata,
            actions: &self.actions,
            need_statistics_before: self.need_statistics_before,
            need_statistics_after: self.need_statistics_after,
            allow_schema_change: self.allow_metadata_change,
            registry: self.registry.clone(),
            analyzer_service: self.analyzer_service.clone(),
            adapter: self.adapter.clone(),
        })?;

        let mut builder = match &self.in_filter {
            Some(filter) => NodeBuilder::from(Node::new(NodeKind::FilteredSource(filter.clone()))),
            None => NodeBuilder::source(),
        };
        builder = builder.to(compiled);
        if let Some(filter) = &self.out_filter {
            builder = builder.to(Node::new(NodeKind::Filtered(filter.clone())));
        }
        let root = builder.to((self.output)()).to((self.monitor)()).build()?;

        let pipeline = Pipeline::new(root);
        tracing::debug!("Pipeline built:\n{}", pipeline);
        Ok(pipeline)
    }
}
