//! Record and schema types shared by the writer and its callers.

use crate::error::{Result, WriterError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Value type of a registered field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float,
    Double,
    Int32,
    Int64,
}

impl DataType {
    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Float => write!(f, "FLOAT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Int32 => write!(f, "INT32"),
            DataType::Int64 => write!(f, "INT64"),
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = WriterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "float" | "float32" | "f32" => Ok(DataType::Float),
            "double" | "float64" | "f64" => Ok(DataType::Double),
            "int32" | "i32" | "int" => Ok(DataType::Int32),
            "int64" | "i64" | "long" => Ok(DataType::Int64),
            _ => Err(WriterError::invalid_config(format!(
                "Unsupported data type: {}. Supported: float, double, int32, int64",
                s
            ))),
        }
    }
}

/// Column encoding requested for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Plain,
    Rle,
    Delta,
    ByteStreamSplit,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Plain => write!(f, "PLAIN"),
            Encoding::Rle => write!(f, "RLE"),
            Encoding::Delta => write!(f, "DELTA"),
            Encoding::ByteStreamSplit => write!(f, "BYTE_STREAM_SPLIT"),
        }
    }
}

impl std::str::FromStr for Encoding {
    type Err = WriterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(Encoding::Plain),
            "rle" | "dictionary" => Ok(Encoding::Rle),
            "delta" | "ts_2diff" => Ok(Encoding::Delta),
            "byte_stream_split" | "bss" => Ok(Encoding::ByteStreamSplit),
            _ => Err(WriterError::invalid_config(format!(
                "Unsupported encoding: {}. Supported: plain, rle, delta, byte_stream_split",
                s
            ))),
        }
    }
}

/// Page compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Uncompressed,
    Snappy,
    Zstd,
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::Uncompressed => write!(f, "uncompressed"),
            Compression::Snappy => write!(f, "snappy"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

impl std::str::FromStr for Compression {
    type Err = WriterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Compression::Uncompressed),
            "snappy" => Ok(Compression::Snappy),
            "zstd" => Ok(Compression::Zstd),
            _ => Err(WriterError::invalid_config(format!(
                "Unsupported compression: {}. Supported: uncompressed, snappy, zstd",
                s
            ))),
        }
    }
}

/// A single generated reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleValue {
    F32(f32),
    F64(f64),
    I32(i32),
    I64(i64),
}

impl SampleValue {
    /// Cast a raw reading to the given type.
    ///
    /// Integer casts truncate toward zero and saturate at the type bounds;
    /// NaN becomes zero.
    pub fn cast(raw: f64, data_type: DataType) -> Self {
        match data_type {
            DataType::Float => SampleValue::F32(raw as f32),
            DataType::Double => SampleValue::F64(raw),
            DataType::Int32 => SampleValue::I32(raw as i32),
            DataType::Int64 => SampleValue::I64(raw as i64),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            SampleValue::F32(_) => DataType::Float,
            SampleValue::F64(_) => DataType::Double,
            SampleValue::I32(_) => DataType::Int32,
            SampleValue::I64(_) => DataType::Int64,
        }
    }
}

/// Name, type and encoding of one sensor column. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub data_type: DataType,
    pub encoding: Encoding,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, data_type: DataType, encoding: Encoding) -> Self {
        Self {
            name: name.into(),
            data_type,
            encoding,
        }
    }
}

/// One named value inside a record
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub measurement: Arc<str>,
    pub value: SampleValue,
}

/// A timestamped set of field values for exactly one device.
#[derive(Debug, Clone, PartialEq)]
pub struct TsRecord {
    pub timestamp: i64,
    pub device: Arc<str>,
    pub points: Vec<DataPoint>,
}

impl TsRecord {
    pub fn new(timestamp: i64, device: Arc<str>) -> Self {
        Self {
            timestamp,
            device,
            points: Vec::new(),
        }
    }

    pub fn with_capacity(timestamp: i64, device: Arc<str>, fields: usize) -> Self {
        Self {
            timestamp,
            device,
            points: Vec::with_capacity(fields),
        }
    }

    pub fn add_point(&mut self, measurement: Arc<str>, value: SampleValue) {
        self.points.push(DataPoint { measurement, value });
    }

    pub fn with_point(mut self, measurement: impl Into<Arc<str>>, value: SampleValue) -> Self {
        self.add_point(measurement.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_from_str() {
        assert_eq!("float".parse::<DataType>().unwrap(), DataType::Float);
        assert_eq!("DOUBLE".parse::<DataType>().unwrap(), DataType::Double);
        assert_eq!("i32".parse::<DataType>().unwrap(), DataType::Int32);
        assert_eq!("long".parse::<DataType>().unwrap(), DataType::Int64);
        assert!("text".parse::<DataType>().is_err());
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("ts_2diff".parse::<Encoding>().unwrap(), Encoding::Delta);
        assert_eq!("dictionary".parse::<Encoding>().unwrap(), Encoding::Rle);
        assert!("gorilla".parse::<Encoding>().is_err());
    }

    #[test]
    fn cast_truncates_and_saturates() {
        assert_eq!(SampleValue::cast(2.9, DataType::Int32), SampleValue::I32(2));
        assert_eq!(SampleValue::cast(-2.9, DataType::Int64), SampleValue::I64(-2));
        assert_eq!(
            SampleValue::cast(1e12, DataType::Int32),
            SampleValue::I32(i32::MAX)
        );
        assert_eq!(SampleValue::cast(f64::NAN, DataType::Int32), SampleValue::I32(0));
        assert_eq!(SampleValue::cast(0.5, DataType::Float), SampleValue::F32(0.5));
    }

    #[test]
    fn cast_matches_requested_type() {
        for dt in [
            DataType::Float,
            DataType::Double,
            DataType::Int32,
            DataType::Int64,
        ] {
            assert_eq!(SampleValue::cast(3.0, dt).data_type(), dt);
        }
    }

    #[test]
    fn record_builder_collects_points() {
        let record = TsRecord::new(7, Arc::from("device_0"))
            .with_point("sensor_0", SampleValue::I32(1))
            .with_point("sensor_1", SampleValue::I32(2));
        assert_eq!(record.points.len(), 2);
        assert_eq!(&*record.points[1].measurement, "sensor_1");
    }
}
