//! Text rendering of a plan, one line per node.
//!
//! ```text
//! -> SOURCE
//! -> COMPILE upper (total: 0 ms, count: 2, +Infinity rows/s)
//! -> ACTION upper (total: 0 ms, count: 2, +Infinity rows/s)
//! => CLONE (2)
//!   -> [SINK]
//!   -> [SINK]
//! ```

use crate::pipeline::monitor::format_metrics;
use crate::pipeline::node::Node;
use crate::pipeline::visitor::{walk_clone_link, walk_node, Visitor};
use std::fmt::Write;

#[derive(Debug, Default)]
pub struct PipelineConsoleDump {
    output: String,
    depth: usize,
}

impl PipelineConsoleDump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.output.push_str("  ");
        }
    }

    fn node(&mut self, node: &Node) {
        self.indent();
        self.output.push_str("-> ");
        self.output.push_str(&node.label());
        if let Some(monitored) = node.monitored() {
            self.output.push(' ');
            self.output.push_str(&format_metrics(monitored));
        }
        self.output.push('\n');
        walk_node(self, node);
    }
}

impl Visitor for PipelineConsoleDump {
    fn visit_source(&mut self, node: &Node) {
        self.node(node);
    }

    fn visit_filtered_source(&mut self, node: &Node) {
        self.node(node);
    }

    fn visit_node(&mut self, node: &Node) {
        self.node(node);
    }

    fn visit_compile(&mut self, node: &Node) {
        self.node(node);
    }

    fn visit_action(&mut self, node: &Node) {
        self.node(node);
    }

    fn visit_filtered(&mut self, node: &Node) {
        self.node(node);
    }

    fn visit_statistics(&mut self, node: &Node) {
        self.node(node);
    }

    fn visit_plugin(&mut self, node: &Node) {
        self.node(node);
    }

    fn visit_terminal(&mut self, node: &Node) {
        self.node(node);
    }

    fn visit_clone_link(&mut self, targets: &[Node]) {
        self.indent();
        let _ = writeln!(self.output, "=> CLONE ({})", targets.len());
        self.depth += 1;
        walk_clone_link(self, targets);
        self.depth -= 1;
    }
}
