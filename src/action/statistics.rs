//! Statistics collaborators used by reservoir nodes.
//!
//! The engine only buffers rows and hands values to an [`Analyzer`]; the
//! analysis itself (value counts, semantic types) lives behind these traits.

use crate::dataset::{ColumnMetadata, ColumnStatistics};
use crate::pipeline::error::PipelineResult;

/// What an analyzer learned about one column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnAnalysis {
    pub statistics: ColumnStatistics,
    pub suggested_type: Option<String>,
    pub domain: Option<String>,
}

/// Streaming analyzer over the values of a fixed set of columns.
pub trait Analyzer: Send {
    /// One row's values, in the column order the analyzer was built with.
    fn analyze(&mut self, values: &[&str]) -> PipelineResult<()>;

    /// Finish and return one result per column.
    fn end(&mut self) -> PipelineResult<Vec<ColumnAnalysis>>;
}

pub trait AnalyzerService: Send + Sync {
    fn build(&self, columns: &[ColumnMetadata]) -> Box<dyn Analyzer>;
}

/// Writes analyzer results back into column metadata.
pub trait StatisticsAdapter: Send + Sync {
    fn adapt(&self, columns: &mut [ColumnMetadata], results: &[ColumnAnalysis]);
}

/// Analyzer service that learns nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalyzerService;

struct NullAnalyzer;

impl Analyzer for NullAnalyzer {
    fn analyze(&mut self, _values: &[&str]) -> PipelineResult<()> {
        Ok(())
    }

    fn end(&mut self) -> PipelineResult<Vec<ColumnAnalysis>> {
        Ok(Vec::new())
    }
}

impl AnalyzerService for NullAnalyzerService {
    fn build(&self, _columns: &[ColumnMetadata]) -> Box<dyn Analyzer> {
        Box::new(NullAnalyzer)
    }
}

/// Copies statistics, suggested type and domain onto the matching column.
/// Extra results or columns are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStatisticsAdapter;

impl StatisticsAdapter for DefaultStatisticsAdapter {
    fn adapt(&self, columns: &mut [ColumnMetadata], results: &[ColumnAnalysis]) {
        for (column, result) in columns.iter_mut().zip(results) {
            column.statistics = result.statistics.clone();
            if let Some(suggested) = &result.suggested_type {
                column.type_name = suggested.clone();
            }
            if let Some(domain) = &result.domain {
                column.domain = domain.clone();
            }
        }
    }
}
