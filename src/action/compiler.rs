//! Turns an action list into a compile/action node chain.

use super::statistics::{AnalyzerService, StatisticsAdapter};
use super::{Action, ActionImplementation, ActionRegistry, ActionStep, Behavior};
use crate::dataset::RowMetadata;
use crate::pipeline::builder::NodeBuilder;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::Node;
use crate::pipeline::nodes::statistics::{ColumnFilter, StatisticsStep};
use std::collections::HashSet;
use std::sync::Arc;

/// Parameter naming the column an action works on.
pub const COLUMN_ID: &str = "column_id";
/// Parameter holding an action's row filter expression.
pub const FILTER: &str = "filter";

/// Everything a compiler needs to plan one action list.
pub struct CompileRequest<'a> {
    pub metadata: &'a RowMetadata,
    pub actions: &'a [Action],
    pub need_statistics_before: bool,
    pub need_statistics_after: bool,
    pub allow_schema_change: bool,
    pub registry: Option<Arc<dyn ActionRegistry>>,
    pub analyzer_service: Arc<dyn AnalyzerService>,
    pub adapter: Arc<dyn StatisticsAdapter>,
}

/// Builds the node chain that applies an action list.
pub trait ActionCompiler: Send + Sync {
    fn compile(&self, request: CompileRequest<'_>) -> PipelineResult<Node>;
}

/// Outcome of the static behavior analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionAnalysis {
    /// Columns worth re-analyzing after the actions ran.
    pub filter: ColumnFilter,
    pub need_delayed_analysis: bool,
}

/// Compiler used unless the caller supplies another one.
///
/// Layout of the compiled chain:
/// 1. a reservoir over all columns when statistics are wanted up front or the
///    metadata is empty,
/// 2. for each action, an optional reservoir followed by compile → action,
/// 3. a trailing reservoir over the modified columns when statistics are
///    wanted afterwards and some column changed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultActionCompiler;

impl DefaultActionCompiler {
    /// Look every action up in the registry.
    fn resolve(
        actions: &[Action],
        registry: Option<&dyn ActionRegistry>,
    ) -> PipelineResult<Vec<(Action, Arc<dyn ActionImplementation>)>> {
        if actions.is_empty() {
            return Ok(Vec::new());
        }
        let Some(registry) = registry else {
            tracing::warn!(actions = actions.len(), "No action registry to resolve actions");
            return Err(PipelineError::MissingRegistry(actions.len()));
        };
        actions
            .iter()
            .map(|action| {
                registry
                    .get(&action.name)
                    .map(|implementation| (action.clone(), implementation))
                    .ok_or_else(|| PipelineError::UnknownAction(action.name.clone()))
            })
            .collect()
    }

    /// Work out which columns the actions touch, from their declared
    /// behaviors alone.
    pub fn analyze(
        metadata: &RowMetadata,
        resolved: &[(Action, Arc<dyn ActionImplementation>)],
    ) -> ActionAnalysis {
        let mut read_only: HashSet<String> =
            metadata.columns().iter().map(|c| c.id.clone()).collect();
        let mut modified = HashSet::new();
        let mut created_columns = 0usize;

        for (action, implementation) in resolved {
            for behavior in implementation.behavior() {
                match behavior {
                    Behavior::ValuesAll => {
                        modified.extend(read_only.drain());
                    }
                    Behavior::ValuesColumn | Behavior::MetadataChangeType => {
                        if let Some(column) = action.parameter(COLUMN_ID) {
                            modified.insert(column.to_string());
                        }
                    }
                    Behavior::MetadataCreateColumns => created_columns += 1,
                    // Copies, deletions and renames leave values untouched.
                    Behavior::MetadataCopyColumns
                    | Behavior::MetadataDeleteColumns
                    | Behavior::MetadataChangeName
                    | Behavior::NeedStatistics => {}
                }
            }
        }

        let need_delayed_analysis = !modified.is_empty() || created_columns > 0;
        ActionAnalysis {
            filter: ColumnFilter::Modified { read_only, modified },
            need_delayed_analysis,
        }
    }

    fn reservoir(request: &CompileRequest<'_>, filter: ColumnFilter) -> Node {
        Node::statistics(StatisticsStep::new(
            request.analyzer_service.clone(),
            request.adapter.clone(),
            filter,
        ))
    }

    /// Statistics nodes to insert ahead of one action.
    fn intermediate_statistics(
        request: &CompileRequest<'_>,
        action: &Action,
        implementation: &dyn ActionImplementation,
        analysis: &ActionAnalysis,
    ) -> Vec<Node> {
        let mut nodes = Vec::new();
        if !request.allow_schema_change {
            return nodes;
        }
        if implementation.behavior().contains(&Behavior::NeedStatistics) {
            nodes.push(Self::reservoir(request, analysis.filter.clone()));
        }
        // Filters on (in)valid values need fresh quality counters.
        if action
            .parameter(FILTER)
            .is_some_and(|filter| filter.contains("valid"))
        {
            nodes.push(Self::reservoir(request, ColumnFilter::All));
        }
        nodes
    }
}

impl ActionCompiler for DefaultActionCompiler {
    fn compile(&self, request: CompileRequest<'_>) -> PipelineResult<Node> {
        let resolved = Self::resolve(request.actions, request.registry.as_deref())?;
        let analysis = Self::analyze(request.metadata, &resolved);

        let mut nodes = Vec::new();
        if request.need_statistics_before || request.metadata.is_empty() {
            tracing::debug!("Computing statistics before applying actions");
            nodes.push(Self::reservoir(&request, ColumnFilter::All));
        }

        for (action, implementation) in resolved {
            nodes.extend(Self::intermediate_statistics(
                &request,
                &action,
                implementation.as_ref(),
                &analysis,
            ));
            let step = Arc::new(ActionStep::new(action, implementation));
            nodes.push(Node::compile(step.clone()));
            nodes.push(Node::action(step));
        }

        if request.need_statistics_after && analysis.need_delayed_analysis {
            nodes.push(Self::reservoir(&request, analysis.filter.clone()));
        }

        tracing::debug!(
            actions = request.actions.len(),
            nodes = nodes.len(),
            "Compiled action chain"
        );

        let mut nodes = nodes.into_iter();
        let Some(head) = nodes.next() else {
            return Ok(Node::basic());
        };
        nodes
            .fold(NodeBuilder::from(head), |builder, node| builder.to(node))
            .build()
    }
}
