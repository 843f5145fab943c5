use crate::error::Result;
use crate::types::{Compression, DataType, Encoding, FieldDescriptor};
use parquet::basic::{Compression as ParquetCompression, Encoding as ParquetEncoding, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;
use parquet::schema::types::ColumnPath;
use tracing::warn;

pub(crate) const TIME_COLUMN: &str = "time";
pub(crate) const DEVICE_COLUMN: &str = "device";

const DEFAULT_ROW_GROUP_SIZE: usize = 32 * 1024;
const DEFAULT_BATCH_ROWS: usize = 8 * 1024;

/// Engine-level settings shared by every field of a writer.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterSettings {
    pub compression: Compression,
    /// Maximum rows per Parquet row group
    pub row_group_size: usize,
    /// Rows buffered in Arrow builders before a batch is handed to Parquet
    pub batch_rows: usize,
    /// Extra key/value pairs embedded in the file footer
    pub metadata: Vec<(String, String)>,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            compression: Compression::Snappy,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            batch_rows: DEFAULT_BATCH_ROWS,
            metadata: Vec::new(),
        }
    }
}

/// Physical layout chosen for a field column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnLayout {
    Dictionary,
    Fixed(ParquetEncoding),
}

/// Map a requested encoding onto one the Parquet writer accepts for the type.
///
/// Delta is only defined for integer columns and byte-stream-split only for
/// floating point columns; other combinations fall back to plain.
pub(crate) fn resolve_layout(encoding: Encoding, data_type: DataType) -> ColumnLayout {
    match (encoding, data_type.is_integer()) {
        (Encoding::Rle, _) => ColumnLayout::Dictionary,
        (Encoding::Plain, _) => ColumnLayout::Fixed(ParquetEncoding::PLAIN),
        (Encoding::Delta, true) => ColumnLayout::Fixed(ParquetEncoding::DELTA_BINARY_PACKED),
        (Encoding::ByteStreamSplit, false) => {
            ColumnLayout::Fixed(ParquetEncoding::BYTE_STREAM_SPLIT)
        }
        (Encoding::Delta, false) | (Encoding::ByteStreamSplit, true) => {
            ColumnLayout::Fixed(ParquetEncoding::PLAIN)
        }
    }
}

/// Warn when a field's requested encoding cannot be honored for its type.
pub(crate) fn check_encoding(field: &FieldDescriptor) {
    let fallback = matches!(
        (field.encoding, field.data_type.is_integer()),
        (Encoding::Delta, false) | (Encoding::ByteStreamSplit, true)
    );
    if fallback {
        warn!(
            field = %field.name,
            data_type = %field.data_type,
            encoding = %field.encoding,
            "encoding not applicable to data type; writing PLAIN"
        );
    }
}

fn compression_setting(compression: Compression) -> Result<ParquetCompression> {
    Ok(match compression {
        Compression::Uncompressed => ParquetCompression::UNCOMPRESSED,
        Compression::Snappy => ParquetCompression::SNAPPY,
        Compression::Zstd => ParquetCompression::ZSTD(ZstdLevel::try_new(2)?),
    })
}

/// Build writer properties for the registered fields.
///
/// - `time` is delta encoded since timestamps increase per device
/// - `device` keeps dictionary encoding (few distinct values)
/// - each field follows its descriptor's encoding
pub(crate) fn writer_properties(
    settings: &WriterSettings,
    fields: &[FieldDescriptor],
) -> Result<WriterProperties> {
    let mut metadata = vec![KeyValue {
        key: "tsbench.version".to_string(),
        value: Some(env!("CARGO_PKG_VERSION").to_string()),
    }];
    metadata.extend(settings.metadata.iter().map(|(key, value)| KeyValue {
        key: key.clone(),
        value: Some(value.clone()),
    }));

    let mut builder = WriterProperties::builder()
        .set_statistics_enabled(EnabledStatistics::Page)
        .set_compression(compression_setting(settings.compression)?)
        .set_data_page_size_limit(256 * 1024)
        .set_write_batch_size(settings.batch_rows.max(1))
        .set_max_row_group_size(settings.row_group_size.max(1))
        .set_dictionary_page_size_limit(128 * 1024)
        .set_key_value_metadata(Some(metadata))
        .set_column_dictionary_enabled(ColumnPath::from(TIME_COLUMN), false)
        .set_column_encoding(
            ColumnPath::from(TIME_COLUMN),
            ParquetEncoding::DELTA_BINARY_PACKED,
        )
        .set_column_dictionary_enabled(ColumnPath::from(DEVICE_COLUMN), true);

    for field in fields {
        let path = ColumnPath::from(field.name.as_str());
        builder = match resolve_layout(field.encoding, field.data_type) {
            ColumnLayout::Dictionary => builder.set_column_dictionary_enabled(path, true),
            ColumnLayout::Fixed(encoding) => builder
                .set_column_dictionary_enabled(path.clone(), false)
                .set_column_encoding(path, encoding),
        };
    }

    Ok(builder.build())
}
