//! Writer node: hands every row that should be written to a [`RowWriter`],
//! then forwards it.

use crate::dataset::{Row, RowMetadata};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::{NodePlugin, PluginStage};
use crate::pipeline::runtime::RuntimeLink;
use crate::pipeline::signal::Signal;
use serde_json::Value;
use std::io::{BufWriter, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Output format adapter.
pub trait RowWriter: Send {
    fn write(&mut self, row: &Row) -> PipelineResult<()>;

    /// Final metadata of the run, given once the stream ended.
    fn write_metadata(&mut self, _metadata: &RowMetadata) -> PipelineResult<()> {
        Ok(())
    }

    fn flush(&mut self) -> PipelineResult<()>;
}

/// One JSON object per line, diff markers included.
pub struct JsonLinesWriter<W: Write> {
    out: BufWriter<W>,
    rows_written: u64,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn get_ref(&self) -> &W {
        self.out.get_ref()
    }

    /// Flush and return the underlying output.
    pub fn into_inner(self) -> PipelineResult<W> {
        self.out
            .into_inner()
            .map_err(|e| PipelineError::Io(e.into_error()))
    }
}

impl<W: Write + Send> RowWriter for JsonLinesWriter<W> {
    fn write(&mut self, row: &Row) -> PipelineResult<()> {
        serde_json::to_writer(&mut self.out, &Value::Object(row.to_json()))?;
        self.out.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> PipelineResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Plan side of a writer. The writer is shared by every run of the plan.
pub struct WriterNode<W> {
    writer: Arc<Mutex<W>>,
}

impl<W: RowWriter + 'static> WriterNode<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Handle on the writer, e.g. to read back what was written.
    pub fn writer(&self) -> Arc<Mutex<W>> {
        self.writer.clone()
    }
}

impl<W> Clone for WriterNode<W> {
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
        }
    }
}

impl<W: RowWriter + 'static> NodePlugin for WriterNode<W> {
    fn label(&self) -> String {
        "WRITER".to_string()
    }

    fn stage(&self) -> Box<dyn PluginStage> {
        Box::new(WriterStage {
            writer: self.writer.clone(),
            metadata: None,
        })
    }
}

struct WriterStage<W> {
    writer: Arc<Mutex<W>>,
    metadata: Option<RowMetadata>,
}

impl<W> WriterStage<W> {
    fn writer(&self) -> MutexGuard<'_, W> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: RowWriter> PluginStage for WriterStage<W> {
    fn receive(
        &mut self,
        row: Row,
        metadata: &mut RowMetadata,
        link: &mut RuntimeLink,
    ) -> PipelineResult<()> {
        if row.should_write() {
            self.writer().write(&row)?;
        }
        if self.metadata.as_ref() != Some(&*metadata) {
            self.metadata = Some(metadata.clone());
        }
        link.emit(row, metadata)
    }

    fn signal(&mut self, signal: Signal, link: &mut RuntimeLink) -> PipelineResult<()> {
        if signal == Signal::EndOfStream {
            let metadata = self.metadata.take();
            let mut writer = self.writer();
            if let Some(metadata) = &metadata {
                writer.write_metadata(metadata)?;
            }
            writer.flush()?;
        }
        link.signal(signal)
    }
}
