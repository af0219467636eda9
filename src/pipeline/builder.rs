//! Fluent graph assembly.
//!
//! ```
//! use dataprep_rs::pipeline::{Node, NodeBuilder};
//!
//! let graph = NodeBuilder::source()
//!     .to(Node::basic())
//!     .to_many(vec![Node::basic(), Node::terminal()])
//!     .build()
//!     .unwrap();
//! assert_eq!(graph.label(), "SOURCE");
//! ```
//!
//! The builder alternates links and nodes. Every call appends at the tail of
//! what was built so far, so a pre-linked chain (e.g. compiled actions) can be
//! appended as a whole. The first protocol error is kept and returned by
//! [`NodeBuilder::build`]; later calls are ignored.

use crate::dataset::Row;
use crate::pipeline::error::{BuilderError, PipelineError, PipelineResult};
use crate::pipeline::link::{Link, LinkKind};
use crate::pipeline::node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingLink,
    AwaitingNodes(LinkKind),
    Terminated,
}

#[derive(Debug)]
pub struct NodeBuilder {
    root: Node,
    state: State,
    error: Option<BuilderError>,
}

impl NodeBuilder {
    pub fn source() -> Self {
        Self::from(Node::source())
    }

    pub fn filtered_source(predicate: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        Self::from(Node::filtered_source(predicate))
    }

    /// Open a link of the given kind; the next call must be
    /// [`NodeBuilder::nodes`].
    pub fn link(mut self, kind: LinkKind) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.state {
            State::AwaitingLink => {
                self.state = State::AwaitingNodes(kind);
                self
            }
            State::AwaitingNodes(_) => self.fail(BuilderError::LinkAfterLink),
            State::Terminated => self.fail(BuilderError::AfterTerminal),
        }
    }

    /// Close the open link with its targets.
    pub fn nodes(mut self, nodes: Vec<Node>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let kind = match self.state {
            State::AwaitingNodes(kind) => kind,
            State::AwaitingLink => return self.fail(BuilderError::NodesAfterNodes),
            State::Terminated => return self.fail(BuilderError::AfterTerminal),
        };

        let link = match kind {
            LinkKind::Basic => {
                let count = nodes.len();
                let mut nodes = nodes.into_iter();
                match (nodes.next(), nodes.next()) {
                    (Some(target), None) => Link::basic(target),
                    _ => return self.fail(BuilderError::BasicLinkArity(count)),
                }
            }
            LinkKind::Clone if nodes.is_empty() => {
                return self.fail(BuilderError::EmptyCloneLink)
            }
            LinkKind::Clone => Link::Clone(nodes),
        };

        let tail = match self.root.tail_mut() {
            Ok(tail) => tail,
            Err(e) => return self.fail(e),
        };
        if tail.is_terminal() {
            return self.fail(BuilderError::AfterTerminal);
        }
        tail.set_link(link);

        self.state = Self::state_after(&mut self.root);
        self
    }

    /// Append one node behind a basic link.
    pub fn to(self, node: Node) -> Self {
        self.link(LinkKind::Basic).nodes(vec![node])
    }

    /// Fan out to several nodes behind a clone link.
    pub fn to_many(self, nodes: Vec<Node>) -> Self {
        self.link(LinkKind::Clone).nodes(nodes)
    }

    /// End the graph with a terminal node. Nothing can be appended afterwards.
    pub fn sink(self) -> Self {
        self.to(Node::terminal())
    }

    pub fn build(self) -> PipelineResult<Node> {
        if let Some(error) = self.error {
            return Err(PipelineError::InvalidGraph(error));
        }
        match self.state {
            State::AwaitingNodes(_) => Err(BuilderError::DanglingLink.into()),
            State::AwaitingLink | State::Terminated => Ok(self.root),
        }
    }

    fn fail(mut self, error: BuilderError) -> Self {
        tracing::debug!("Graph builder error: {}", error);
        self.error.get_or_insert(error);
        self
    }

    fn state_after(root: &mut Node) -> State {
        match root.tail_mut() {
            Ok(tail) if tail.is_terminal() => State::Terminated,
            _ => State::AwaitingLink,
        }
    }
}

impl From<Node> for NodeBuilder {
    /// Start from an existing node or chain.
    fn from(mut root: Node) -> Self {
        let state = Self::state_after(&mut root);
        Self {
            root,
            state,
            error: None,
        }
    }
}
