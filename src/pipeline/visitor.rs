//! Plan traversal.
//!
//! Every node kind and link kind has a `visit_*` method. The defaults call the
//! matching `walk_*` function, which recurses depth-first along the outgoing
//! link, visiting clone targets in declaration order. An implementation
//! overrides the cases it cares about and calls `walk_*` itself to keep
//! descending.

use crate::pipeline::executor::Pipeline;
use crate::pipeline::node::Node;

pub trait Visitor {
    fn visit_pipeline(&mut self, pipeline: &Pipeline) {
        walk_pipeline(self, pipeline);
    }

    fn visit_source(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_filtered_source(&mut self, node: &Node) {
        walk_node(self, node);
    }

    /// Basic pass-through nodes.
    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_compile(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_action(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_filtered(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_statistics(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_plugin(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_terminal(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_basic_link(&mut self, target: &Node) {
        walk_basic_link(self, target);
    }

    fn visit_clone_link(&mut self, targets: &[Node]) {
        walk_clone_link(self, targets);
    }

    fn visit_null_link(&mut self) {}
}

pub fn walk_pipeline<V: Visitor + ?Sized>(visitor: &mut V, pipeline: &Pipeline) {
    pipeline.root().accept(visitor);
}

/// Continue along the node's outgoing link.
pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    node.link().accept(visitor);
}

pub fn walk_basic_link<V: Visitor + ?Sized>(visitor: &mut V, target: &Node) {
    target.accept(visitor);
}

pub fn walk_clone_link<V: Visitor + ?Sized>(visitor: &mut V, targets: &[Node]) {
    for target in targets {
        target.accept(visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::link::Link;

    #[derive(Default)]
    struct Labels(Vec<String>);

    impl Visitor for Labels {
        fn visit_source(&mut self, node: &Node) {
            self.0.push(node.label());
            walk_node(self, node);
        }

        fn visit_node(&mut self, node: &Node) {
            self.0.push(node.label());
            walk_node(self, node);
        }

        fn visit_terminal(&mut self, node: &Node) {
            self.0.push(node.label());
            walk_node(self, node);
        }
    }

    #[test]
    fn test_depth_first_in_declaration_order() {
        let mut left = Node::basic();
        left.set_link(Link::basic(Node::terminal()));
        let mut root = Node::source();
        root.set_link(Link::Clone(vec![left, Node::terminal()]));

        let mut labels = Labels::default();
        root.accept(&mut labels);
        assert_eq!(labels.0, vec!["SOURCE", "NODE", "[SINK]", "[SINK]"]);
    }

    #[test]
    fn test_works_through_trait_object() {
        let mut root = Node::source();
        root.set_link(Link::basic(Node::terminal()));
        let mut labels = Labels::default();
        let visitor: &mut dyn Visitor = &mut labels;
        root.accept(visitor);
        assert_eq!(labels.0.len(), 2);
    }
}
