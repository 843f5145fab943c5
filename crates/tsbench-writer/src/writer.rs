//! Writer port and its Parquet-backed implementation.

use crate::columns::RowBuffer;
use crate::encoding::{self, WriterSettings, DEVICE_COLUMN, TIME_COLUMN};
use crate::error::{Result, WriterError};
use crate::sink::{FileSink, MemorySink, OutputSink};
use crate::types::{DataType, Encoding, FieldDescriptor, SampleValue, TsRecord};
use parquet::arrow::ArrowWriter;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Outcome of closing a writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// Records accepted by `write`
    pub records: u64,
    /// Size of the finished output in bytes
    pub bytes: u64,
}

/// Capability to persist time-series records into a backing store.
///
/// Every field must be registered before the first `write`. `close`
/// finalizes the output and may be called once.
pub trait TsWriter: Send {
    fn register_field(&mut self, field: FieldDescriptor) -> Result<()>;

    fn write(&mut self, record: &TsRecord) -> Result<()>;

    fn close(&mut self) -> Result<WriteSummary>;
}

/// Where a writer puts its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    File { path: PathBuf, overwrite: bool },
    Memory,
}

/// Open a writer for `destination`.
pub fn open_writer(
    destination: &Destination,
    settings: WriterSettings,
) -> Result<Box<dyn TsWriter>> {
    match destination {
        Destination::File { path, overwrite } => Ok(Box::new(ParquetTsWriter::create(
            path, *overwrite, settings,
        )?)),
        Destination::Memory => Ok(Box::new(ParquetTsWriter::in_memory(settings))),
    }
}

enum State<S: OutputSink> {
    /// Accepting registrations; the sink is untouched
    Open(S),
    /// First record seen; schema is fixed
    Writing {
        writer: ArrowWriter<S>,
        buffer: RowBuffer,
    },
    Closed(S),
    /// A failed transition left nothing usable behind
    Broken,
}

/// Time-series writer encoding records into a Parquet file.
///
/// Records become rows of `time`, `device` and one nullable column per
/// registered field.
pub struct ParquetTsWriter<S: OutputSink> {
    settings: WriterSettings,
    fields: Vec<FieldDescriptor>,
    field_index: HashMap<String, usize>,
    last_timestamp: HashMap<Arc<str>, i64>,
    slots: Vec<Option<SampleValue>>,
    records: u64,
    state: State<S>,
}

impl ParquetTsWriter<FileSink> {
    /// Create a writer backed by the file at `path`.
    pub fn create(path: impl AsRef<Path>, overwrite: bool, settings: WriterSettings) -> Result<Self> {
        let sink = FileSink::create(path, overwrite)?;
        debug!(path = %sink.path().display(), "opened file writer");
        Ok(Self::with_sink(sink, settings))
    }
}

impl ParquetTsWriter<MemorySink> {
    /// Create a writer that buffers the whole file in memory.
    pub fn in_memory(settings: WriterSettings) -> Self {
        Self::with_sink(MemorySink::new(), settings)
    }

    /// Encoded file bytes; only available after `close`.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        self.into_sink().map(MemorySink::into_bytes)
    }
}

impl<S: OutputSink> ParquetTsWriter<S> {
    pub fn with_sink(sink: S, settings: WriterSettings) -> Self {
        Self {
            settings,
            fields: Vec::new(),
            field_index: HashMap::new(),
            last_timestamp: HashMap::new(),
            slots: Vec::new(),
            records: 0,
            state: State::Open(sink),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed(_))
    }

    /// Return the sink of a closed writer.
    pub fn into_sink(self) -> Result<S> {
        match self.state {
            State::Closed(sink) => Ok(sink),
            _ => Err(WriterError::schema("output is only available after close")),
        }
    }

    /// Shorthand for registering a field by its parts.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        encoding: Encoding,
    ) -> Result<()> {
        self.register_field(FieldDescriptor::new(name, data_type, encoding))
    }

    fn start_writing(&mut self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(WriterError::schema("no fields registered before first write"));
        }
        let State::Open(sink) = std::mem::replace(&mut self.state, State::Broken) else {
            return Err(WriterError::closed());
        };

        let buffer = RowBuffer::new(&self.fields, self.settings.batch_rows.max(1));
        let props = encoding::writer_properties(&self.settings, &self.fields)?;
        let writer = ArrowWriter::try_new(sink, buffer.schema(), Some(props))?;
        debug!(fields = self.fields.len(), "schema fixed, writer started");
        self.state = State::Writing { writer, buffer };
        Ok(())
    }

    /// Resolve record points into one slot per registered field.
    fn fill_slots(&mut self, record: &TsRecord) -> Result<()> {
        self.slots.clear();
        self.slots.resize(self.fields.len(), None);

        for point in &record.points {
            let Some(&index) = self.field_index.get(&*point.measurement) else {
                return Err(WriterError::schema(format!(
                    "unregistered field '{}' on device '{}'",
                    point.measurement, record.device
                )));
            };
            let expected = self.fields[index].data_type;
            if point.value.data_type() != expected {
                return Err(WriterError::schema(format!(
                    "field '{}' expects {} but got {}",
                    point.measurement,
                    expected,
                    point.value.data_type()
                )));
            }
            if self.slots[index].replace(point.value).is_some() {
                return Err(WriterError::schema(format!(
                    "duplicate field '{}' in record for device '{}'",
                    point.measurement, record.device
                )));
            }
        }
        Ok(())
    }

    fn check_timestamp(&self, record: &TsRecord) -> Result<()> {
        if record.timestamp < 0 {
            return Err(WriterError::schema(format!(
                "negative timestamp {} on device '{}'",
                record.timestamp, record.device
            )));
        }
        if let Some(&last) = self.last_timestamp.get(&*record.device) {
            if record.timestamp <= last {
                return Err(WriterError::schema(format!(
                    "timestamp {} on device '{}' does not follow {}",
                    record.timestamp, record.device, last
                )));
            }
        }
        Ok(())
    }

    fn flush_buffer(writer: &mut ArrowWriter<S>, buffer: &mut RowBuffer) -> Result<()> {
        if buffer.len() == 0 {
            return Ok(());
        }
        let batch = buffer.take_batch()?;
        writer.write(&batch)?;
        Ok(())
    }
}

impl<S: OutputSink> TsWriter for ParquetTsWriter<S> {
    fn register_field(&mut self, field: FieldDescriptor) -> Result<()> {
        match self.state {
            State::Open(_) => {}
            State::Writing { .. } => {
                return Err(WriterError::invalid_config(format!(
                    "cannot register field '{}' after the first write",
                    field.name
                )))
            }
            State::Closed(_) | State::Broken => return Err(WriterError::closed()),
        }
        if field.name.is_empty() || field.name == TIME_COLUMN || field.name == DEVICE_COLUMN {
            return Err(WriterError::invalid_config(format!(
                "invalid field name '{}'",
                field.name
            )));
        }
        if self.field_index.contains_key(&field.name) {
            return Err(WriterError::invalid_config(format!(
                "field '{}' already registered",
                field.name
            )));
        }

        encoding::check_encoding(&field);
        self.field_index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    fn write(&mut self, record: &TsRecord) -> Result<()> {
        match self.state {
            State::Open(_) => self.start_writing()?,
            State::Writing { .. } => {}
            State::Closed(_) | State::Broken => return Err(WriterError::closed()),
        }
        if record.device.is_empty() {
            return Err(WriterError::schema("record has an empty device id"));
        }
        self.check_timestamp(record)?;
        self.fill_slots(record)?;

        let State::Writing { writer, buffer } = &mut self.state else {
            return Err(WriterError::closed());
        };
        buffer.push(record.timestamp, &record.device, &self.slots)?;
        if buffer.is_full() {
            Self::flush_buffer(writer, buffer)?;
        }

        match self.last_timestamp.get_mut(&*record.device) {
            Some(last) => *last = record.timestamp,
            None => {
                self.last_timestamp
                    .insert(Arc::clone(&record.device), record.timestamp);
            }
        }
        self.records += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<WriteSummary> {
        if matches!(self.state, State::Open(_)) {
            // Nothing written yet: still emit a valid, empty file.
            if self.fields.is_empty() {
                return Err(WriterError::schema("no fields registered before close"));
            }
            self.start_writing()?;
        }

        let (mut writer, mut buffer) = match std::mem::replace(&mut self.state, State::Broken) {
            State::Writing { writer, buffer } => (writer, buffer),
            State::Closed(sink) => {
                self.state = State::Closed(sink);
                return Err(WriterError::closed());
            }
            State::Open(_) | State::Broken => return Err(WriterError::closed()),
        };

        Self::flush_buffer(&mut writer, &mut buffer)?;
        let mut sink = writer.into_inner()?;
        sink.finish()?;

        let summary = WriteSummary {
            records: self.records,
            bytes: sink.position(),
        };
        debug!(
            records = summary.records,
            bytes = summary.bytes,
            "writer closed"
        );
        self.state = State::Closed(sink);
        Ok(summary)
    }
}
