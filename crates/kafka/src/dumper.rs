//! Record dumpers: render one consumed record as a line of delimited text.
//!
//! Line layout, each part present only when enabled:
//!
//! ```text
//! <timestamp>\t<partition>\t<offset>\t<key>\t<value>\n
//! ```
//!
//! The value is always written. An absent key or value is written as `null`.

use crate::error::DumpError;
use async_trait::async_trait;
use clap::ValueEnum;
use kadumper_schema_registry::AvroTranscoder;
use kafka_types::Record;
use std::io::{self, BufWriter, Stdout, Write};

const FIELD_SEPARATOR: &[u8] = b"\t";
const LINE_TERMINATOR: &[u8] = b"\n";
const NULL_TOKEN: &[u8] = b"null";

/// Something that consumes one formatted record at a time.
#[async_trait]
pub trait RecordDumper: Send {
    async fn dump_record(&mut self, record: &Record) -> Result<(), DumpError>;
}

#[async_trait]
impl<D: RecordDumper + ?Sized> RecordDumper for Box<D> {
    async fn dump_record(&mut self, record: &Record) -> Result<(), DumpError> {
        (**self).dump_record(record).await
    }
}

/// Available dumper implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DumperKind {
    /// Buffered writer over standard output
    #[default]
    #[value(name = "stdout")]
    Stdout,
}

/// Which record fields precede the value on each line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DumpFields {
    pub timestamp: bool,
    pub partition: bool,
    pub offset: bool,
    pub key: bool,
}

/// Dumps records to a buffered writer, flushing after every record.
///
/// With a transcoder, present keys and values are decoded from framed Avro
/// to JSON text; without one they are copied verbatim.
pub struct WriterRecordDumper<W: Write + Send> {
    writer: W,
    fields: DumpFields,
    transcoder: Option<AvroTranscoder>,
}

impl<W: Write + Send> WriterRecordDumper<W> {
    pub fn new(writer: W, fields: DumpFields, transcoder: Option<AvroTranscoder>) -> Self {
        Self {
            writer,
            fields,
            transcoder,
        }
    }

    pub fn fields(&self) -> &DumpFields {
        &self.fields
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_record(&mut self, record: &Record) -> Result<(), DumpError> {
        if self.fields.timestamp {
            write!(self.writer, "{}", record.timestamp_millis())?;
            self.writer.write_all(FIELD_SEPARATOR)?;
        }

        if self.fields.partition {
            write!(self.writer, "{}", record.partition)?;
            self.writer.write_all(FIELD_SEPARATOR)?;
        }

        if self.fields.offset {
            write!(self.writer, "{}", record.offset)?;
            self.writer.write_all(FIELD_SEPARATOR)?;
        }

        if self.fields.key {
            self.write_data("key", record.key.as_deref()).await?;
            self.writer.write_all(FIELD_SEPARATOR)?;
        }

        self.write_data("value", record.value.as_deref()).await?;
        self.writer.write_all(LINE_TERMINATOR)?;

        Ok(())
    }

    async fn write_data(&mut self, field: &'static str, data: Option<&[u8]>) -> Result<(), DumpError> {
        let Some(data) = data else {
            self.writer.write_all(NULL_TOKEN)?;
            return Ok(());
        };

        match self.transcoder.as_mut() {
            Some(transcoder) => {
                let text = transcoder
                    .to_text(data)
                    .await
                    .map_err(|source| DumpError::RecordFormat { field, source })?;
                self.writer.write_all(&text)?;
            }
            None => self.writer.write_all(data)?,
        }

        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> RecordDumper for WriterRecordDumper<W> {
    async fn dump_record(&mut self, record: &Record) -> Result<(), DumpError> {
        let written = self.write_record(record).await;
        // Flush whatever was written, even for a failed record
        let flushed = self.writer.flush();
        written?;
        flushed?;
        Ok(())
    }
}

/// Build the dumper selected on the command line.
pub fn build_dumper(
    kind: DumperKind,
    fields: DumpFields,
    transcoder: Option<AvroTranscoder>,
) -> Box<dyn RecordDumper> {
    match kind {
        DumperKind::Stdout => Box::new(stdout_dumper(fields, transcoder)),
    }
}

fn stdout_dumper(
    fields: DumpFields,
    transcoder: Option<AvroTranscoder>,
) -> WriterRecordDumper<BufWriter<Stdout>> {
    WriterRecordDumper::new(BufWriter::new(io::stdout()), fields, transcoder)
}
