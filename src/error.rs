use thiserror::Error;

/// Main error type covering every failure the writer can surface
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Missing field: no value found for '{field}' in record #{index}")]
    MissingField { field: String, index: u64 },

    #[error("Failed to write '{value}' value for '{field}' member in record #{index}: {source}")]
    FieldWrite {
        field: String,
        index: u64,
        value: String,
        #[source]
        source: Box<WriterError>,
    },

    #[error("Field value length overflowed for '{field}' member [Expected: {size}, Actual: {actual}]: {value}")]
    SizeOverflow {
        field: String,
        size: usize,
        actual: usize,
        value: String,
    },

    #[error("Field header '{field}' value contains the record terminator")]
    HeaderTerminator { field: String },

    #[error("Conversion failed for '{field}' value '{value}': {reason}")]
    Conversion {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation failed for '{field}' value '{value}': {reason}")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Object validation failed for record #{index}: {reason}")]
    ObjectValidation { index: u64, reason: String },

    #[error("Incorrect number of fields in record #{index}: expected {expected}, found {found}")]
    ColumnCount {
        index: u64,
        expected: usize,
        found: usize,
    },

    #[error("Fields [{}] are not found in record #{index}", fields.join(","))]
    MissingColumns { index: u64, fields: Vec<String> },

    #[error("Failed to write record #{index}: {source}")]
    RecordWrite {
        index: u64,
        #[source]
        source: Box<WriterError>,
    },

    #[error("Invalid sample element: {details}")]
    InvalidSample { details: String },
}

/// Topology resolution failures. All of them are fatal and raised only
/// while a configuration is being resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No record fields specified")]
    NoFieldsResolved,

    #[error("Duplicate field(s) [Name(s): {}] found", names.join(","))]
    DuplicateField { names: Vec<String> },

    #[error("Duplicate discovered name '{name}' found in sample")]
    DuplicateDiscoveredName { name: String },

    #[error("Invalid field '{name}': {reason}")]
    InvalidField { name: String, reason: String },

    #[error("Record configuration has not been resolved")]
    Unresolved,
}

impl WriterError {
    /// Field name attached to this error, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            WriterError::MissingField { field, .. }
            | WriterError::FieldWrite { field, .. }
            | WriterError::SizeOverflow { field, .. }
            | WriterError::HeaderTerminator { field }
            | WriterError::Conversion { field, .. }
            | WriterError::Validation { field, .. } => Some(field),
            WriterError::RecordWrite { source, .. } => source.field(),
            _ => None,
        }
    }

    /// 1-based record sequence index attached to this error, if any
    pub fn index(&self) -> Option<u64> {
        match self {
            WriterError::MissingField { index, .. }
            | WriterError::FieldWrite { index, .. }
            | WriterError::ObjectValidation { index, .. }
            | WriterError::ColumnCount { index, .. }
            | WriterError::MissingColumns { index, .. }
            | WriterError::RecordWrite { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Sink failures bypass every error policy
    pub fn is_io(&self) -> bool {
        match self {
            WriterError::Io(_) => true,
            WriterError::RecordWrite { source, .. } | WriterError::FieldWrite { source, .. } => {
                source.is_io()
            }
            _ => false,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, WriterError>;
