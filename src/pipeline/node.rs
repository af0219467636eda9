//! Plan nodes.
//!
//! A [`Node`] is an immutable description of one processing step and its
//! outgoing [`Link`]. Nothing here holds per-run state: [`Node::exec`] builds a
//! fresh [`RuntimeNode`] chain for every run, so a plan can be dumped or
//! visited while a run is in flight.
//!
//! Built-in steps are variants of [`NodeKind`]. Anything else (writers,
//! monitors, preview stages) plugs in through [`NodePlugin`].

use crate::action::ActionStep;
use crate::dataset::{Row, RowMetadata};
use crate::pipeline::error::{BuilderError, PipelineResult};
use crate::pipeline::link::Link;
use crate::pipeline::monitor::{Monitored, NodeMetrics};
use crate::pipeline::nodes::statistics::{ReservoirRuntime, StatisticsStep};
use crate::pipeline::runtime::{
    ActionRuntime, CompileRuntime, FilterRuntime, PassThrough, PluginRuntime, RunContexts,
    RuntimeLink, RuntimeNode, TerminalRuntime,
};
use crate::pipeline::signal::Signal;
use crate::pipeline::visitor::Visitor;
use std::fmt;
use std::sync::Arc;

/// Row filter used by filtered sources and output filters.
pub type RowPredicate = Arc<dyn Fn(&Row) -> bool + Send + Sync>;

/// Collaborator-defined node. The plugin is the plan side; [`NodePlugin::stage`]
/// is called once per run to get the live side.
pub trait NodePlugin: Send + Sync {
    /// Label shown in plan dumps.
    fn label(&self) -> String;

    fn stage(&self) -> Box<dyn PluginStage>;
}

/// Live side of a [`NodePlugin`]. It decides what reaches `link`.
pub trait PluginStage: Send {
    fn receive(
        &mut self,
        row: Row,
        metadata: &mut RowMetadata,
        link: &mut RuntimeLink,
    ) -> PipelineResult<()>;

    fn signal(&mut self, signal: Signal, link: &mut RuntimeLink) -> PipelineResult<()> {
        link.signal(signal)
    }
}

/// The closed set of built-in steps, plus [`NodeKind::Plugin`].
pub enum NodeKind {
    Source,
    FilteredSource(RowPredicate),
    Basic,
    Compile(Arc<ActionStep>),
    Action(Arc<ActionStep>),
    Filtered(RowPredicate),
    Statistics(StatisticsStep),
    Terminal,
    Plugin(Arc<dyn NodePlugin>),
}

impl NodeKind {
    fn is_monitored(&self) -> bool {
        matches!(
            self,
            NodeKind::Compile(_)
                | NodeKind::Action(_)
                | NodeKind::Statistics(_)
                | NodeKind::Plugin(_)
        )
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Source => f.write_str("Source"),
            NodeKind::FilteredSource(_) => f.write_str("FilteredSource"),
            NodeKind::Basic => f.write_str("Basic"),
            NodeKind::Compile(step) => f.debug_tuple("Compile").field(&step.name()).finish(),
            NodeKind::Action(step) => f.debug_tuple("Action").field(&step.name()).finish(),
            NodeKind::Filtered(_) => f.write_str("Filtered"),
            NodeKind::Statistics(step) => f.debug_tuple("Statistics").field(step).finish(),
            NodeKind::Terminal => f.write_str("Terminal"),
            NodeKind::Plugin(plugin) => f.debug_tuple("Plugin").field(&plugin.label()).finish(),
        }
    }
}

/// A plan vertex with exactly one outgoing link.
pub struct Node {
    kind: NodeKind,
    link: Link,
    metrics: Option<Arc<NodeMetrics>>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        let metrics = kind.is_monitored().then(|| Arc::new(NodeMetrics::new()));
        Self {
            kind,
            link: Link::Null,
            metrics,
        }
    }

    pub fn source() -> Self {
        Self::new(NodeKind::Source)
    }

    pub fn filtered_source(predicate: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        Self::new(NodeKind::FilteredSource(Arc::new(predicate)))
    }

    pub fn basic() -> Self {
        Self::new(NodeKind::Basic)
    }

    pub fn compile(step: Arc<ActionStep>) -> Self {
        Self::new(NodeKind::Compile(step))
    }

    pub fn action(step: Arc<ActionStep>) -> Self {
        Self::new(NodeKind::Action(step))
    }

    pub fn filtered(predicate: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        Self::new(NodeKind::Filtered(Arc::new(predicate)))
    }

    pub fn statistics(step: StatisticsStep) -> Self {
        Self::new(NodeKind::Statistics(step))
    }

    /// Sink that swallows rows and signals.
    pub fn terminal() -> Self {
        Self::new(NodeKind::Terminal)
    }

    pub fn plugin(plugin: impl NodePlugin + 'static) -> Self {
        Self::new(NodeKind::Plugin(Arc::new(plugin)))
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }

    /// Replace the outgoing link, returning the previous one.
    pub fn set_link(&mut self, link: Link) -> Link {
        std::mem::replace(&mut self.link, link)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal)
    }

    /// Counters of monitored nodes (compile, action, statistics, plugins).
    pub fn monitored(&self) -> Option<&dyn Monitored> {
        self.metrics.as_deref().map(|m| m as &dyn Monitored)
    }

    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Source => "SOURCE".to_string(),
            NodeKind::FilteredSource(_) => "FILTERED SOURCE".to_string(),
            NodeKind::Basic => "NODE".to_string(),
            NodeKind::Compile(step) => format!("COMPILE {}", step.name()),
            NodeKind::Action(step) => format!("ACTION {}", step.name()),
            NodeKind::Filtered(_) => "FILTER".to_string(),
            NodeKind::Statistics(step) => format!("STATISTICS {}", step.filter()),
            NodeKind::Terminal => "[SINK]".to_string(),
            NodeKind::Plugin(plugin) => plugin.label(),
        }
    }

    /// Build the live chain rooted at this node for one run.
    pub fn exec(&self) -> Box<dyn RuntimeNode> {
        self.exec_with(&mut RunContexts::default())
    }

    pub(crate) fn exec_with(&self, contexts: &mut RunContexts) -> Box<dyn RuntimeNode> {
        if self.is_terminal() {
            return Box::new(TerminalRuntime);
        }

        let link = self.link.exec_with(contexts);
        let metrics = self.metrics.clone().unwrap_or_default();
        match &self.kind {
            NodeKind::Source | NodeKind::Basic => Box::new(PassThrough::new(link)),
            NodeKind::FilteredSource(predicate) | NodeKind::Filtered(predicate) => {
                Box::new(FilterRuntime::new(predicate.clone(), link))
            }
            NodeKind::Compile(step) => Box::new(CompileRuntime::new(
                step.clone(),
                contexts.for_step(step),
                metrics,
                link,
            )),
            NodeKind::Action(step) => Box::new(ActionRuntime::new(
                step.clone(),
                contexts.for_step(step),
                metrics,
                link,
            )),
            NodeKind::Statistics(step) => {
                Box::new(ReservoirRuntime::new(step.clone(), metrics, link))
            }
            NodeKind::Plugin(plugin) => Box::new(PluginRuntime::new(plugin.stage(), metrics, link)),
            NodeKind::Terminal => Box::new(TerminalRuntime),
        }
    }

    /// Dispatch to the visitor method of this node's kind.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match &self.kind {
            NodeKind::Source => visitor.visit_source(self),
            NodeKind::FilteredSource(_) => visitor.visit_filtered_source(self),
            NodeKind::Basic => visitor.visit_node(self),
            NodeKind::Compile(_) => visitor.visit_compile(self),
            NodeKind::Action(_) => visitor.visit_action(self),
            NodeKind::Filtered(_) => visitor.visit_filtered(self),
            NodeKind::Statistics(_) => visitor.visit_statistics(self),
            NodeKind::Plugin(_) => visitor.visit_plugin(self),
            NodeKind::Terminal => visitor.visit_terminal(self),
        }
    }

    /// Last node of the chain, following basic links and single-target
    /// clone links.
    pub(crate) fn tail_mut(&mut self) -> Result<&mut Node, BuilderError> {
        if self.link.is_null() {
            return Ok(self);
        }
        if let Link::Clone(targets) = &self.link {
            if targets.len() != 1 {
                return Err(BuilderError::AmbiguousTail(targets.len()));
            }
        }
        match &mut self.link {
            Link::Basic(next) => next.tail_mut(),
            Link::Clone(targets) => match targets.first_mut() {
                Some(target) => target.tail_mut(),
                None => Err(BuilderError::AmbiguousTail(0)),
            },
            Link::Null => Err(BuilderError::DanglingLink),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("link", &self.link)
            .finish()
    }
}
