//! Test nodes and sample actions

use dataprep_rs::action::{
    ActionContext, ActionImplementation, ActionRegistry, Behavior, StaticActionRegistry,
};
use dataprep_rs::dataset::{ColumnMetadata, Row, RowMetadata};
use dataprep_rs::pipeline::{NodePlugin, PipelineError, PipelineResult, PluginStage, RuntimeLink, Signal};
use std::sync::{Arc, Mutex};

/// What a [`CaptureSink`] saw, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Row(Row),
    Signal(Signal),
}

/// Terminal plugin recording rows, the metadata they came with, and signals.
#[derive(Clone, Default)]
pub struct CaptureSink {
    events: Arc<Mutex<Vec<Event>>>,
    metadata: Arc<Mutex<Vec<RowMetadata>>>,
    fail_after: Option<usize>,
    label: Option<String>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every row once `rows` rows were accepted.
    pub fn failing_after(rows: usize) -> Self {
        Self {
            fail_after: Some(rows),
            ..Self::default()
        }
    }

    pub fn named(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn rows(&self) -> Vec<Row> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Row(row) => Some(row),
                Event::Signal(_) => None,
            })
            .collect()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Signal(signal) => Some(signal),
                Event::Row(_) => None,
            })
            .collect()
    }

    /// Metadata seen with the last row.
    pub fn last_metadata(&self) -> Option<RowMetadata> {
        self.metadata.lock().unwrap().last().cloned()
    }

    pub fn values(&self, column: &str) -> Vec<String> {
        self.rows()
            .iter()
            .map(|row| row.get(column).unwrap_or_default().to_string())
            .collect()
    }
}

impl NodePlugin for CaptureSink {
    fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| "CAPTURE".to_string())
    }

    fn stage(&self) -> Box<dyn PluginStage> {
        Box::new(self.clone())
    }
}

impl PluginStage for CaptureSink {
    fn receive(
        &mut self,
        row: Row,
        metadata: &mut RowMetadata,
        _link: &mut RuntimeLink,
    ) -> PipelineResult<()> {
        let mut events = self.events.lock().unwrap();
        if let Some(limit) = self.fail_after {
            let accepted = events.iter().filter(|e| matches!(e, Event::Row(_))).count();
            if accepted >= limit {
                return Err(PipelineError::Sink("capture is full".to_string()));
            }
        }
        events.push(Event::Row(row));
        self.metadata.lock().unwrap().push(metadata.clone());
        Ok(())
    }

    fn signal(&mut self, signal: Signal, _link: &mut RuntimeLink) -> PipelineResult<()> {
        self.events.lock().unwrap().push(Event::Signal(signal));
        Ok(())
    }
}

/// Upper-cases the `column_id` column.
pub struct Uppercase;

impl ActionImplementation for Uppercase {
    fn behavior(&self) -> Vec<Behavior> {
        vec![Behavior::ValuesColumn]
    }

    fn compile(&self, _: &mut ActionContext, _: &mut RowMetadata) -> PipelineResult<()> {
        Ok(())
    }

    fn apply(&self, row: &mut Row, context: &mut ActionContext) -> PipelineResult<()> {
        let column = context.parameter("column_id").unwrap_or("0000").to_string();
        if let Some(value) = row.get(&column).map(str::to_uppercase) {
            row.set(column, value);
        }
        Ok(())
    }
}

/// Appends a `copy` column holding the value of `column_id`.
pub struct CopyColumn;

impl ActionImplementation for CopyColumn {
    fn behavior(&self) -> Vec<Behavior> {
        vec![Behavior::MetadataCreateColumns]
    }

    fn compile(&self, context: &mut ActionContext, metadata: &mut RowMetadata) -> PipelineResult<()> {
        let source = context.parameter("column_id").unwrap_or("0000").to_string();
        let id = metadata.next_id();
        metadata.add_column(ColumnMetadata::new(id.clone(), "copy"));
        context.put("source", source);
        context.put("target", id);
        Ok(())
    }

    fn apply(&self, row: &mut Row, context: &mut ActionContext) -> PipelineResult<()> {
        let (Some(source), Some(target)) = (context.get("source"), context.get("target")) else {
            return Err(PipelineError::Action {
                action: "copy".to_string(),
                message: "not compiled".to_string(),
            });
        };
        let value = row.get(source).unwrap_or_default().to_string();
        row.set(target.to_string(), value);
        Ok(())
    }
}

/// Deletes rows whose `0000` value equals the `value` parameter.
pub struct DeleteMatching;

impl ActionImplementation for DeleteMatching {
    fn behavior(&self) -> Vec<Behavior> {
        vec![Behavior::ValuesAll]
    }

    fn compile(&self, _: &mut ActionContext, _: &mut RowMetadata) -> PipelineResult<()> {
        Ok(())
    }

    fn apply(&self, row: &mut Row, context: &mut ActionContext) -> PipelineResult<()> {
        if row.get("0000") == context.parameter("value") {
            row.set_deleted(true);
        }
        Ok(())
    }
}

/// Cancels its own context after `limit` rows.
pub struct CancelAfter(pub usize);

impl ActionImplementation for CancelAfter {
    fn behavior(&self) -> Vec<Behavior> {
        vec![Behavior::ValuesAll]
    }

    fn compile(&self, context: &mut ActionContext, _: &mut RowMetadata) -> PipelineResult<()> {
        context.put("seen", "0");
        Ok(())
    }

    fn apply(&self, row: &mut Row, context: &mut ActionContext) -> PipelineResult<()> {
        let seen: usize = context.get("seen").and_then(|s| s.parse().ok()).unwrap_or(0) + 1;
        context.put("seen", seen.to_string());
        row.set("0000", format!("seen-{}", seen));
        if seen >= self.0 {
            context.cancel();
        }
        Ok(())
    }
}

/// Registry with every sample action.
pub fn registry() -> Arc<dyn ActionRegistry> {
    Arc::new(
        StaticActionRegistry::new()
            .with("uppercase", Arc::new(Uppercase))
            .with("copy", Arc::new(CopyColumn))
            .with("delete_matching", Arc::new(DeleteMatching))
            .with("cancel_after_2", Arc::new(CancelAfter(2))),
    )
}
