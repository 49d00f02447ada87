//! Record sinks for measurements and activity transitions.
//!
//! Durable circular buffering, wraparound policy, and chunked upstream
//! publishing are collaborator responsibilities behind the sink traits.
//! What lives here is the local glue: a JSON-lines file sink, a tracing
//! sink for activity changes, and an in-memory sink for tests.

use crate::core::{ActivitySink, ActivityTransition, MeasurementResult, ResultSink};
use crate::error::{AppResult, SenseError};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SinkRecord<'a> {
    Measurement(&'a MeasurementResult),
    Activity(&'a ActivityTransition),
}

/// Appends one JSON object per record to a file, flushed per record so a
/// power loss costs at most the line in flight.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: &Path) -> AppResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write(&mut self, record: &SinkRecord) -> AppResult<()> {
        let line =
            serde_json::to_string(record).map_err(|e| SenseError::Sink(e.to_string()))?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl ResultSink for JsonlSink {
    fn record(&mut self, result: &MeasurementResult) -> AppResult<()> {
        self.write(&SinkRecord::Measurement(result))
    }
}

impl ActivitySink for JsonlSink {
    fn activity_changed(&mut self, event: &ActivityTransition) -> AppResult<()> {
        self.write(&SinkRecord::Activity(event))
    }
}

/// Logs activity transitions through `tracing`.
#[derive(Default)]
pub struct LogActivitySink;

impl ActivitySink for LogActivitySink {
    fn activity_changed(&mut self, event: &ActivityTransition) -> AppResult<()> {
        info!(active = event.active, "generator activity changed");
        Ok(())
    }
}

/// Collects records in memory; test support.
#[derive(Default)]
pub struct MemorySink {
    pub results: Vec<MeasurementResult>,
    pub transitions: Vec<ActivityTransition>,
}

impl ResultSink for MemorySink {
    fn record(&mut self, result: &MeasurementResult) -> AppResult<()> {
        self.results.push(result.clone());
        Ok(())
    }
}

impl ActivitySink for MemorySink {
    fn activity_changed(&mut self, event: &ActivityTransition) -> AppResult<()> {
        self.transitions.push(event.clone());
        Ok(())
    }
}
