//! Error type tests
//!
//! Every diagnostic names the field, the record index and the offending value
//! where one exists.

use xml_record_writer::{ConfigurationError, WriterError};

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
    let error: WriterError = io_error.into();

    assert!(error.is_io());
    assert!(error.to_string().contains("pipe closed"));
}

#[test]
fn test_configuration_error_conversion() {
    let error: WriterError = ConfigurationError::DuplicateField {
        names: vec!["X".to_string(), "Y".to_string()],
    }
    .into();

    assert_eq!(
        error.to_string(),
        "Configuration error: Duplicate field(s) [Name(s): X,Y] found"
    );
    assert!(!error.is_io());
}

#[test]
fn test_field_write_error_carries_diagnostics() {
    let error = WriterError::FieldWrite {
        field: "Price".to_string(),
        index: 12,
        value: "abc".to_string(),
        source: Box::new(WriterError::Conversion {
            field: "Price".to_string(),
            value: "abc".to_string(),
            reason: "not a number".to_string(),
        }),
    };

    let message = error.to_string();
    assert!(message.contains("'abc'"));
    assert!(message.contains("'Price'"));
    assert!(message.contains("#12"));
    assert_eq!(error.field(), Some("Price"));
    assert_eq!(error.index(), Some(12));
}

#[test]
fn test_record_write_error_exposes_inner_field() {
    let error = WriterError::RecordWrite {
        index: 3,
        source: Box::new(WriterError::MissingField {
            field: "Name".to_string(),
            index: 3,
        }),
    };

    assert_eq!(error.field(), Some("Name"));
    assert_eq!(error.index(), Some(3));
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_size_overflow_message() {
    let error = WriterError::SizeOverflow {
        field: "Code".to_string(),
        size: 3,
        actual: 5,
        value: "ABCDE".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "Field value length overflowed for 'Code' member [Expected: 3, Actual: 5]: ABCDE"
    );
}

#[test]
fn test_io_inside_record_error_is_still_io() {
    let error = WriterError::RecordWrite {
        index: 1,
        source: Box::new(std::io::Error::other("disk full").into()),
    };
    assert!(error.is_io());
}
