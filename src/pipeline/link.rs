//! Outgoing edges of plan nodes.

use crate::pipeline::node::Node;
use crate::pipeline::runtime::{CloneRuntime, RunContexts, RuntimeLink};
use crate::pipeline::visitor::Visitor;
use std::slice;

/// The single outgoing edge of a [`Node`].
#[derive(Debug, Default)]
pub enum Link {
    /// Forwards to one target.
    Basic(Box<Node>),
    /// Fans out to every target, in declaration order.
    Clone(Vec<Node>),
    /// No target. Rows and signals stop here.
    #[default]
    Null,
}

/// Link strategy without its targets, as used by
/// [`crate::pipeline::NodeBuilder::link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Basic,
    Clone,
}

impl Link {
    pub fn basic(target: Node) -> Self {
        Link::Basic(Box::new(target))
    }

    pub fn targets(&self) -> &[Node] {
        match self {
            Link::Basic(target) => slice::from_ref(target.as_ref()),
            Link::Clone(targets) => targets,
            Link::Null => &[],
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Link::Null)
    }

    /// Build the live counterpart of this edge and everything behind it.
    pub fn exec(&self) -> RuntimeLink {
        self.exec_with(&mut RunContexts::default())
    }

    pub(crate) fn exec_with(&self, contexts: &mut RunContexts) -> RuntimeLink {
        match self {
            Link::Basic(target) => RuntimeLink::Basic(target.exec_with(contexts)),
            Link::Clone(targets) => RuntimeLink::Clone(CloneRuntime::new(
                targets
                    .iter()
                    .map(|target| target.exec_with(contexts))
                    .collect(),
            )),
            Link::Null => RuntimeLink::Null,
        }
    }

    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Link::Basic(target) => visitor.visit_basic_link(target),
            Link::Clone(targets) => visitor.visit_clone_link(targets),
            Link::Null => visitor.visit_null_link(),
        }
    }
}
