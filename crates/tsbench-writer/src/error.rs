//! Error types for the time-series writer.

use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Invalid field registration or writer setting
    E001InvalidConfig,
    /// E002: Destination could not be created, removed or written
    E002Io,
    /// E003: Record does not match the registered schema
    E003Schema,
    /// E004: Operation not supported by this sink
    E004Unsupported,
    /// E005: Columnar engine rejected the data
    E005WriteFailure,
    /// E006: Writer already closed
    E006Closed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E001InvalidConfig => "E001",
            Self::E002Io => "E002",
            Self::E003Schema => "E003",
            Self::E004Unsupported => "E004",
            Self::E005WriteFailure => "E005",
            Self::E006Closed => "E006",
        }
    }
}

/// Errors that can occur while writing time-series records
#[derive(Debug, Error)]
pub enum WriterError {
    /// Invalid field registration or writer setting
    #[error("[{code}] Invalid configuration: {message}")]
    InvalidConfig { code: &'static str, message: String },

    /// I/O failure on the destination
    #[error("[{code}] I/O error: {message}")]
    Io {
        code: &'static str,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Record rejected by the schema established at registration
    #[error("[{code}] Schema violation: {message}")]
    Schema { code: &'static str, message: String },

    /// Operation the sink does not implement
    #[error("[{code}] Unsupported operation: {operation}")]
    Unsupported {
        code: &'static str,
        operation: &'static str,
    },

    /// Parquet/Arrow encoding failed
    #[error("[{code}] Write operation failed: {message}")]
    WriteFailure { code: &'static str, message: String },

    /// Writer used after close
    #[error("[{code}] Writer is closed")]
    Closed { code: &'static str },
}

impl WriterError {
    /// Create an invalid config error with error code
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            code: ErrorCode::E001InvalidConfig.as_str(),
            message: message.into(),
        }
    }

    /// Create an I/O error with error code, keeping the OS error as source
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            code: ErrorCode::E002Io.as_str(),
            message: message.into(),
            source,
        }
    }

    /// Create a schema violation error with error code
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            code: ErrorCode::E003Schema.as_str(),
            message: message.into(),
        }
    }

    /// Create an unsupported operation error with error code
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported {
            code: ErrorCode::E004Unsupported.as_str(),
            operation,
        }
    }

    /// Create a write failure error with error code
    pub fn write_failure(message: impl Into<String>) -> Self {
        Self::WriteFailure {
            code: ErrorCode::E005WriteFailure.as_str(),
            message: message.into(),
        }
    }

    pub fn closed() -> Self {
        Self::Closed {
            code: ErrorCode::E006Closed.as_str(),
        }
    }

    /// The error code carried by this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig { .. } => ErrorCode::E001InvalidConfig,
            Self::Io { .. } => ErrorCode::E002Io,
            Self::Schema { .. } => ErrorCode::E003Schema,
            Self::Unsupported { .. } => ErrorCode::E004Unsupported,
            Self::WriteFailure { .. } => ErrorCode::E005WriteFailure,
            Self::Closed { .. } => ErrorCode::E006Closed,
        }
    }
}

impl From<parquet::errors::ParquetError> for WriterError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        Self::write_failure(format!("parquet: {}", err))
    }
}

impl From<arrow::error::ArrowError> for WriterError {
    fn from(err: arrow::error::ArrowError) -> Self {
        Self::write_failure(format!("arrow: {}", err))
    }
}

/// Result type alias for WriterError
pub type Result<T> = std::result::Result<T, WriterError>;
