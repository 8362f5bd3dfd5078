//! Record sinks standing in for the persistence layer.
//!
//! Records are handed over in batches. The sink owns formatting and any
//! transaction-like boundary; the engine never sees either.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{record::DynamicRecord, schema::Schema};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub trait RecordSink<R> {
    fn write_batch(&mut self, records: &[R]) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

/// Hands `records` to `sink` in batches of `batch_size` and returns how many were written.
pub fn persist<R, S>(records: &[R], sink: &mut S, batch_size: usize) -> Result<usize>
where
    S: RecordSink<R> + ?Sized,
{
    let batch_size = batch_size.max(1);
    let mut written = 0usize;
    for (idx, batch) in records.chunks(batch_size).enumerate() {
        sink.write_batch(batch)
            .with_context(|| format!("Writing batch {}", idx + 1))?;
        written += batch.len();
    }
    sink.finish()?;
    Ok(written)
}

/// Delimited output with the schema's field names as the header row.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    headers: Vec<String>,
    wrote_headers: bool,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W, schema: &Schema, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .double_quote(true)
            .from_writer(inner);
        Self {
            writer,
            headers: schema.field_names(),
            wrote_headers: false,
        }
    }

    fn ensure_headers(&mut self) -> Result<()> {
        if !self.wrote_headers {
            self.writer
                .write_record(&self.headers)
                .context("Writing output headers")?;
            self.wrote_headers = true;
        }
        Ok(())
    }
}

impl<W: Write> RecordSink<DynamicRecord> for CsvSink<W> {
    fn write_batch(&mut self, records: &[DynamicRecord]) -> Result<()> {
        self.ensure_headers()?;
        for record in records {
            self.writer
                .write_record(record.values().map(|value| value.as_display()))
                .context("Writing output record")?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.ensure_headers()?;
        self.writer.flush().context("Flushing output writer")
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    inner: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write, R: Serialize> RecordSink<R> for JsonLinesSink<W> {
    fn write_batch(&mut self, records: &[R]) -> Result<()> {
        for record in records {
            serde_json::to_writer(&mut self.inner, record).context("Serializing record")?;
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.flush().context("Flushing output writer")
    }
}
