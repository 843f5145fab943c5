//! Time-series record writer on top of Parquet.
//!
//! Callers register one descriptor per sensor, then submit timestamped
//! records per device. Rows are buffered in Arrow builders and handed to the
//! Parquet writer, which owns encoding, compression and page layout. Output
//! goes either to a local file or to an in-memory buffer.

mod columns;
mod encoding;
mod error;
mod sink;
mod types;
mod writer;

pub use encoding::WriterSettings;
pub use error::{ErrorCode, Result, WriterError};
pub use sink::{FileSink, MemorySink, OutputSink};
pub use types::{
    Compression, DataPoint, DataType, Encoding, FieldDescriptor, SampleValue, TsRecord,
};
pub use writer::{open_writer, Destination, ParquetTsWriter, TsWriter, WriteSummary};
