//! Reservoir node: buffers every row, analyzes the values and, once the
//! stream ends, writes the analysis into the metadata before re-emitting the
//! rows downstream.

use crate::action::statistics::{Analyzer, AnalyzerService, StatisticsAdapter};
use crate::dataset::{ColumnMetadata, Row, RowMetadata};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::monitor::NodeMetrics;
use crate::pipeline::runtime::{RuntimeLink, RuntimeNode};
use crate::pipeline::signal::Signal;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Which columns a reservoir analyzes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnFilter {
    All,
    /// Columns some action modifies, plus any column that was not in the
    /// input metadata.
    Modified {
        read_only: HashSet<String>,
        modified: HashSet<String>,
    },
}

impl ColumnFilter {
    pub fn accepts(&self, column: &ColumnMetadata) -> bool {
        match self {
            ColumnFilter::All => true,
            ColumnFilter::Modified {
                read_only,
                modified,
            } => modified.contains(&column.id) || !read_only.contains(&column.id),
        }
    }
}

impl fmt::Display for ColumnFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnFilter::All => f.write_str("(all columns)"),
            ColumnFilter::Modified { modified, .. } => {
                write!(f, "({} modified columns)", modified.len())
            }
        }
    }
}

/// Plan side of a reservoir.
#[derive(Clone)]
pub struct StatisticsStep {
    service: Arc<dyn AnalyzerService>,
    adapter: Arc<dyn StatisticsAdapter>,
    filter: ColumnFilter,
}

impl StatisticsStep {
    pub fn new(
        service: Arc<dyn AnalyzerService>,
        adapter: Arc<dyn StatisticsAdapter>,
        filter: ColumnFilter,
    ) -> Self {
        Self {
            service,
            adapter,
            filter,
        }
    }

    pub fn filter(&self) -> &ColumnFilter {
        &self.filter
    }
}

impl fmt::Debug for StatisticsStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsStep")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

pub(crate) struct ReservoirRuntime {
    step: StatisticsStep,
    metrics: Arc<NodeMetrics>,
    link: RuntimeLink,
    buffer: Vec<Row>,
    /// Latest metadata seen upstream; rows are re-emitted with it.
    metadata: Option<RowMetadata>,
    analyzer: Option<Box<dyn Analyzer>>,
    /// Ids of the columns the analyzer was built with, in order.
    analyzed: Vec<String>,
    failed: bool,
}

impl ReservoirRuntime {
    pub(crate) fn new(step: StatisticsStep, metrics: Arc<NodeMetrics>, link: RuntimeLink) -> Self {
        Self {
            step,
            metrics,
            link,
            buffer: Vec::new(),
            metadata: None,
            analyzer: None,
            analyzed: Vec::new(),
            failed: false,
        }
    }

    /// Metadata without columns: every value of the row becomes a string
    /// column.
    fn guess_columns(row: &Row, metadata: &mut RowMetadata) {
        tracing::debug!(
            columns = row.values().len(),
            "No metadata, guessing string columns"
        );
        for id in row.values().keys() {
            metadata.add_column(ColumnMetadata::new(id.clone(), id.clone()));
        }
    }

    fn analyze(&mut self, row: &Row, metadata: &RowMetadata) {
        if self.failed {
            return;
        }
        if self.analyzer.is_none() {
            let columns: Vec<ColumnMetadata> = metadata
                .columns()
                .iter()
                .filter(|c| self.step.filter.accepts(c))
                .cloned()
                .collect();
            self.analyzed = columns.iter().map(|c| c.id.clone()).collect();
            self.analyzer = Some(self.step.service.build(&columns));
        }
        let Some(analyzer) = self.analyzer.as_mut() else {
            return;
        };

        let values: Vec<&str> = self
            .analyzed
            .iter()
            .map(|id| row.get(id).unwrap_or_default())
            .collect();
        if let Err(e) = analyzer.analyze(&values) {
            tracing::warn!("Unable to analyze row, statistics skipped: {}", e);
            self.failed = true;
            self.analyzer = None;
        }
    }

    /// Write the analysis into the buffered metadata.
    fn adapt(&mut self, metadata: &mut RowMetadata) {
        let Some(mut analyzer) = self.analyzer.take() else {
            return;
        };
        let results = match analyzer.end() {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Unable to perform delayed analysis: {}", e);
                return;
            }
        };

        let mut columns: Vec<ColumnMetadata> = self
            .analyzed
            .iter()
            .filter_map(|id| metadata.column(id).cloned())
            .collect();
        self.step.adapter.adapt(&mut columns, &results);
        for column in columns {
            if let Some(target) = metadata.column_mut(&column.id) {
                *target = column;
            }
        }
    }

    fn flush(&mut self) -> PipelineResult<()> {
        let Some(mut metadata) = self.metadata.take() else {
            return Ok(());
        };
        self.adapt(&mut metadata);
        tracing::debug!(rows = self.buffer.len(), "Releasing reservoir");
        for row in std::mem::take(&mut self.buffer) {
            self.link.emit(row, &mut metadata)?;
        }
        Ok(())
    }
}

impl RuntimeNode for ReservoirRuntime {
    fn receive(&mut self, row: Row, metadata: &mut RowMetadata) -> PipelineResult<()> {
        let metrics = self.metrics.clone();
        let _timer = metrics.time_row();
        if metadata.is_empty() {
            Self::guess_columns(&row, metadata);
        }
        if self.metadata.as_ref() != Some(&*metadata) {
            self.metadata = Some(metadata.clone());
        }
        if !row.is_deleted() {
            self.analyze(&row, metadata);
        }
        self.buffer.push(row);
        Ok(())
    }

    fn signal(&mut self, signal: Signal) -> PipelineResult<()> {
        match signal {
            Signal::EndOfStream => {
                let metrics = self.metrics.clone();
                let _timer = metrics.time_signal();
                self.flush()?;
            }
            Signal::Cancel => {
                self.buffer.clear();
                self.analyzer = None;
                self.metadata = None;
            }
            Signal::Stop => {}
        }
        self.link.signal(signal)
    }
}
