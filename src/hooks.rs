//! Extension points raised while a stream is written
//!
//! Every method has a default that lets writing proceed, so an observer only
//! overrides the hooks it cares about.

use std::ops::ControlFlow;

use crate::error::WriterError;
use crate::value::{Record, Value};

/// Outcome of the before-record hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordAction {
    #[default]
    Write,
    /// Leave this record out and continue with the next one
    Skip,
    /// Stop the whole stream
    Abort,
}

pub trait WriteObserver {
    /// Raised once the topology is resolved, before the root tag; `false` aborts
    fn begin_write(&mut self) -> bool {
        true
    }

    /// Raised exactly once when the stream closes normally or is aborted
    fn end_write(&mut self) {}

    fn before_record_write(&mut self, _record: &dyn Record, _index: u64) -> RecordAction {
        RecordAction::Write
    }

    /// `false` aborts the stream after this record
    fn after_record_write(&mut self, _record: &dyn Record, _index: u64, _fragment: &str) -> bool {
        true
    }

    /// May rewrite `value`; `false` leaves the whole record unwritten
    fn before_field_write(
        &mut self,
        _record: &dyn Record,
        _index: u64,
        _field: &str,
        _value: &mut Value,
    ) -> bool {
        true
    }

    /// `false` leaves the whole record unwritten
    fn after_field_write(
        &mut self,
        _record: &dyn Record,
        _index: u64,
        _field: &str,
        _value: &Value,
    ) -> bool {
        true
    }

    /// Return `Some(markup)` to replace the field's rendered content verbatim
    fn serialize_field(
        &mut self,
        _record: &dyn Record,
        _index: u64,
        _field: &str,
        _value: &Value,
    ) -> Option<String> {
        None
    }

    /// `true` marks the error handled and writing continues
    fn record_write_error(&mut self, _record: &dyn Record, _index: u64, _error: &WriterError) -> bool {
        true
    }

    /// `true` marks the error handled; the field is left out
    fn field_write_error(
        &mut self,
        _record: &dyn Record,
        _index: u64,
        _field: &str,
        _error: &WriterError,
    ) -> bool {
        true
    }

    /// Raised every `notify_after` records; `Break` stops the stream
    fn rows_written(&mut self, _count: u64) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Observer that accepts every default
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl WriteObserver for NoopObserver {}

impl<O: WriteObserver + ?Sized> WriteObserver for &mut O {
    fn begin_write(&mut self) -> bool {
        (**self).begin_write()
    }
    fn end_write(&mut self) {
        (**self).end_write()
    }
    fn before_record_write(&mut self, record: &dyn Record, index: u64) -> RecordAction {
        (**self).before_record_write(record, index)
    }
    fn after_record_write(&mut self, record: &dyn Record, index: u64, fragment: &str) -> bool {
        (**self).after_record_write(record, index, fragment)
    }
    fn before_field_write(
        &mut self,
        record: &dyn Record,
        index: u64,
        field: &str,
        value: &mut Value,
    ) -> bool {
        (**self).before_field_write(record, index, field, value)
    }
    fn after_field_write(&mut self, record: &dyn Record, index: u64, field: &str, value: &Value) -> bool {
        (**self).after_field_write(record, index, field, value)
    }
    fn serialize_field(
        &mut self,
        record: &dyn Record,
        index: u64,
        field: &str,
        value: &Value,
    ) -> Option<String> {
        (**self).serialize_field(record, index, field, value)
    }
    fn record_write_error(&mut self, record: &dyn Record, index: u64, error: &WriterError) -> bool {
        (**self).record_write_error(record, index, error)
    }
    fn field_write_error(
        &mut self,
        record: &dyn Record,
        index: u64,
        field: &str,
        error: &WriterError,
    ) -> bool {
        (**self).field_write_error(record, index, field, error)
    }
    fn rows_written(&mut self, count: u64) -> ControlFlow<()> {
        (**self).rows_written(count)
    }
}
