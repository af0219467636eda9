//! Property checks for graph building and row accounting

mod common;

use common::builders::{registry, CaptureSink};
use common::{dataset, metadata};
use dataprep_rs::action::Action;
use dataprep_rs::pipeline::{
    BuilderError, LinkKind, Node, NodeBuilder, PipelineBuilder, PipelineError,
};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Step {
    Link(LinkKind),
    Nodes(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Link(LinkKind::Basic)),
        Just(Step::Link(LinkKind::Clone)),
        (1usize..3).prop_map(Step::Nodes),
    ]
}

/// What the builder should answer for a call sequence, worked out by hand.
fn expected(steps: &[Step]) -> Result<(), BuilderError> {
    let mut open: Option<LinkKind> = None;
    // Width of the last fan-out when it left the tail ambiguous.
    let mut fan_out: Option<usize> = None;
    for step in steps {
        match (*step, open) {
            (Step::Link(_), Some(_)) => return Err(BuilderError::LinkAfterLink),
            (Step::Link(kind), None) => open = Some(kind),
            (Step::Nodes(_), None) => return Err(BuilderError::NodesAfterNodes),
            (Step::Nodes(n), Some(kind)) => {
                if kind == LinkKind::Basic && n != 1 {
                    return Err(BuilderError::BasicLinkArity(n));
                }
                if let Some(width) = fan_out {
                    return Err(BuilderError::AmbiguousTail(width));
                }
                open = None;
                fan_out = (kind == LinkKind::Clone && n > 1).then_some(n);
            }
        }
    }
    match open {
        Some(_) => Err(BuilderError::DanglingLink),
        None => Ok(()),
    }
}

proptest! {
    #[test]
    fn test_builder_protocol(steps in prop::collection::vec(step(), 0..8)) {
        let mut builder = NodeBuilder::source();
        for step in &steps {
            builder = match *step {
                Step::Link(kind) => builder.link(kind),
                Step::Nodes(n) => builder.nodes((0..n).map(|_| Node::basic()).collect()),
            };
        }
        let result = builder.build().map(|_| ());
        let expected = expected(&steps);
        match (result, expected) {
            (Ok(()), Ok(())) => {}
            (Err(PipelineError::InvalidGraph(actual)), Err(wanted)) => {
                prop_assert_eq!(actual, wanted);
            }
            (actual, wanted) => {
                prop_assert!(false, "got {:?}, expected {:?}", actual, wanted);
            }
        }
    }

    #[test]
    fn test_every_row_reaches_the_output(
        values in prop::collection::vec("[a-z]{0,6}", 0..40),
        with_action in any::<bool>(),
    ) {
        let sink = CaptureSink::new();
        let output = sink.clone();
        let mut builder = PipelineBuilder::new()
            .with_initial_metadata(metadata(&["value"]))
            .with_action_registry(registry())
            .with_output(move || Node::plugin(output.clone()));
        if with_action {
            builder = builder
                .with_actions([Action::new("uppercase").with_parameter("column_id", "0000")]);
        }
        let pipeline = builder.build().unwrap();

        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let count = pipeline.execute(&mut dataset(&refs)).unwrap();

        prop_assert_eq!(count, values.len() as u64);
        prop_assert_eq!(sink.rows().len(), values.len());
        let expected: Vec<String> = if with_action {
            values.iter().map(|v| v.to_uppercase()).collect()
        } else {
            values.clone()
        };
        prop_assert_eq!(sink.values("0000"), expected);
    }
}
