//! Arrow row buffer accumulating records between flushes.

use crate::encoding::{DEVICE_COLUMN, TIME_COLUMN};
use crate::error::{Result, WriterError};
use crate::types::{DataType, FieldDescriptor, SampleValue};
use arrow::array::{
    ArrayRef, Float32Builder, Float64Builder, Int32Builder, Int64Builder, StringBuilder,
};
use arrow::datatypes::{DataType as ArrowDataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

fn arrow_type(data_type: DataType) -> ArrowDataType {
    match data_type {
        DataType::Float => ArrowDataType::Float32,
        DataType::Double => ArrowDataType::Float64,
        DataType::Int32 => ArrowDataType::Int32,
        DataType::Int64 => ArrowDataType::Int64,
    }
}

/// Arrow schema for a set of registered fields.
pub(crate) fn schema_for(fields: &[FieldDescriptor]) -> SchemaRef {
    let mut columns = Vec::with_capacity(fields.len() + 2);
    columns.push(Field::new(TIME_COLUMN, ArrowDataType::Int64, false));
    columns.push(Field::new(DEVICE_COLUMN, ArrowDataType::Utf8, false));
    columns.extend(
        fields
            .iter()
            .map(|f| Field::new(f.name.as_str(), arrow_type(f.data_type), true)),
    );
    Arc::new(Schema::new(columns))
}

enum ColumnBuilder {
    Float32(Float32Builder),
    Float64(Float64Builder),
    Int32(Int32Builder),
    Int64(Int64Builder),
}

impl ColumnBuilder {
    fn new(data_type: DataType, capacity: usize) -> Self {
        match data_type {
            DataType::Float => Self::Float32(Float32Builder::with_capacity(capacity)),
            DataType::Double => Self::Float64(Float64Builder::with_capacity(capacity)),
            DataType::Int32 => Self::Int32(Int32Builder::with_capacity(capacity)),
            DataType::Int64 => Self::Int64(Int64Builder::with_capacity(capacity)),
        }
    }

    fn append(&mut self, value: Option<SampleValue>) -> Result<()> {
        match (self, value) {
            (Self::Float32(b), Some(SampleValue::F32(v))) => b.append_value(v),
            (Self::Float64(b), Some(SampleValue::F64(v))) => b.append_value(v),
            (Self::Int32(b), Some(SampleValue::I32(v))) => b.append_value(v),
            (Self::Int64(b), Some(SampleValue::I64(v))) => b.append_value(v),
            (Self::Float32(b), None) => b.append_null(),
            (Self::Float64(b), None) => b.append_null(),
            (Self::Int32(b), None) => b.append_null(),
            (Self::Int64(b), None) => b.append_null(),
            (_, Some(v)) => {
                return Err(WriterError::schema(format!(
                    "value of type {} does not match column type",
                    v.data_type()
                )))
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Float32(b) => Arc::new(b.finish()),
            Self::Float64(b) => Arc::new(b.finish()),
            Self::Int32(b) => Arc::new(b.finish()),
            Self::Int64(b) => Arc::new(b.finish()),
        }
    }
}

/// Column builders for `time`, `device` and every registered field.
pub(crate) struct RowBuffer {
    schema: SchemaRef,
    time: Int64Builder,
    device: StringBuilder,
    columns: Vec<ColumnBuilder>,
    capacity: usize,
    len: usize,
}

impl RowBuffer {
    pub(crate) fn new(fields: &[FieldDescriptor], capacity: usize) -> Self {
        Self {
            schema: schema_for(fields),
            time: Int64Builder::with_capacity(capacity),
            device: StringBuilder::with_capacity(capacity, capacity * 16),
            columns: fields
                .iter()
                .map(|f| ColumnBuilder::new(f.data_type, capacity))
                .collect(),
            capacity,
            len: 0,
        }
    }

    pub(crate) fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Append one row. `values` holds one slot per registered field, already
    /// type-checked against the schema.
    pub(crate) fn push(
        &mut self,
        timestamp: i64,
        device: &str,
        values: &[Option<SampleValue>],
    ) -> Result<()> {
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.append(*value)?;
        }
        self.time.append_value(timestamp);
        self.device.append_value(device);
        self.len += 1;
        Ok(())
    }

    /// Drain buffered rows into a batch; the buffer is empty afterwards.
    pub(crate) fn take_batch(&mut self) -> Result<RecordBatch> {
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len() + 2);
        arrays.push(Arc::new(self.time.finish()));
        arrays.push(Arc::new(self.device.finish()));
        arrays.extend(self.columns.iter_mut().map(ColumnBuilder::finish));
        self.len = 0;
        Ok(RecordBatch::try_new(self.schema(), arrays)?)
    }
}
