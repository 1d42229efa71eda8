//! Streaming record emitter
//!
//! [`XmlRecordWriter`] owns the sink for one document. Records are pulled one
//! at a time through a [`RecordStream`]; each rendered fragment reaches the
//! sink before the next record is requested.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::encoder::RecordEncoder;
use crate::error::{Result, WriterError};
use crate::field::ErrorMode;
use crate::hooks::{NoopObserver, RecordAction, WriteObserver};
use crate::metadata::{FieldMetadataProvider, RecordShapeProvider};
use crate::record_config::{RecordConfiguration, RenderContext, ValidationScope};
use crate::resolver::{ResolveHint, resolve};
use crate::value::Record;

/// Lifecycle of one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    TopologyResolved,
    Emitting,
    Closed,
    /// A fatal error stopped the stream; the root element may be left open
    Broken,
}

impl StreamState {
    pub fn is_finished(self) -> bool {
        matches!(self, StreamState::Closed | StreamState::Broken)
    }
}

/// Counters for one written stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteSummary {
    pub records_read: u64,
    pub records_written: u64,
    /// Null, vetoed or empty records
    pub records_skipped: u64,
    /// Rejected by the caller's filter
    pub records_filtered: u64,
    /// Record errors that were ignored or reported and handled
    pub records_failed: u64,
    pub aborted: bool,
    pub root_name: Option<String>,
    pub node_name: Option<String>,
    pub duration: Duration,
}

impl WriteSummary {
    pub fn has_failures(&self) -> bool {
        self.records_failed > 0
    }

    /// Share of rendered-or-failed records that were written, in percent
    pub fn success_rate(&self) -> f64 {
        let attempted = self.records_written + self.records_failed;
        if attempted == 0 {
            return 0.0;
        }
        (self.records_written as f64 / attempted as f64) * 100.0
    }

    pub fn records_per_second(&self) -> f64 {
        let seconds = self.duration.as_secs_f64();
        if seconds > 0.0 {
            self.records_written as f64 / seconds
        } else {
            0.0
        }
    }
}

enum RecordOutcome {
    Written { keep_going: bool },
    Skipped,
}

/// Writes one XML document of records into `W`
pub struct XmlRecordWriter<W: Write, O: WriteObserver = NoopObserver> {
    sink: W,
    config: RecordConfiguration,
    observer: O,
    provider: Box<dyn FieldMetadataProvider>,
    ctx: RenderContext,
    state: StreamState,
    started: Option<Instant>,
    index: u64,
    root_open: bool,
    abort_requested: bool,
    summary: WriteSummary,
}

impl<W: Write> XmlRecordWriter<W, NoopObserver> {
    pub fn new(sink: W, config: RecordConfiguration) -> Self {
        Self::with_observer(sink, config, NoopObserver)
    }
}

impl<W: Write, O: WriteObserver> XmlRecordWriter<W, O> {
    pub fn with_observer(sink: W, config: RecordConfiguration, observer: O) -> Self {
        let ctx = config.render_context();
        Self {
            sink,
            config,
            observer,
            provider: Box::new(RecordShapeProvider),
            ctx,
            state: StreamState::Idle,
            started: None,
            index: 0,
            root_open: false,
            abort_requested: false,
            summary: WriteSummary::default(),
        }
    }

    /// Replace the provider that describes the first record's shape
    pub fn with_metadata_provider(mut self, provider: impl FieldMetadataProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    pub fn config(&self) -> &RecordConfiguration {
        &self.config
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn summary(&self) -> &WriteSummary {
        &self.summary
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn into_parts(self) -> (W, O) {
        (self.sink, self.observer)
    }

    /// Resolve the topology ahead of the first record, e.g. from an explicit field list
    pub fn resolve(&mut self, hint: ResolveHint<'_>) -> Result<()> {
        if self.state != StreamState::Idle {
            return Ok(());
        }
        resolve(&mut self.config, hint)?;
        self.resolved();
        Ok(())
    }

    /// Stream `records`, yielding each one back after it was handled
    pub fn write_records<I>(&mut self, records: I) -> RecordStream<'_, W, O, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Record,
    {
        RecordStream {
            writer: self,
            records: records.into_iter(),
            filter: None,
        }
    }

    /// Like [`write_records`](Self::write_records), rendering only records accepted by `filter`
    pub fn write_records_filtered<'w, I, F>(
        &'w mut self,
        records: I,
        filter: F,
    ) -> RecordStream<'w, W, O, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Record,
        F: FnMut(&I::Item) -> bool + 'w,
    {
        RecordStream {
            writer: self,
            records: records.into_iter(),
            filter: Some(Box::new(filter)),
        }
    }

    /// Drain `records` into the document and close it
    pub fn write_all<I>(&mut self, records: I) -> Result<WriteSummary>
    where
        I: IntoIterator,
        I::Item: Record,
    {
        for record in self.write_records(records) {
            record?;
        }
        self.close()?;
        Ok(self.summary.clone())
    }

    /// Close the document: root end tag if one was opened, then the end hook.
    /// Calling it again, or after a fatal error, does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.state.is_finished() {
            return Ok(());
        }
        self.start()?;

        if self.root_open {
            let root = self
                .config
                .topology()
                .ok()
                .and_then(|t| t.root_name.clone());
            if let Some(root) = root {
                let written = write!(self.sink, "{}</{}>", self.config.eol, root);
                self.check_io(written)?;
            }
            self.root_open = false;
        }
        let flushed = self.sink.flush();
        self.check_io(flushed)?;

        self.state = StreamState::Closed;
        self.summary.duration = self.elapsed();
        debug!(
            "Closed stream after {} records ({} written)",
            self.summary.records_read, self.summary.records_written
        );
        self.observer.end_write();
        Ok(())
    }

    fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    fn check_io(&mut self, result: std::io::Result<()>) -> Result<()> {
        result.map_err(|e| {
            self.state = StreamState::Broken;
            WriterError::Io(e)
        })
    }

    /// Write the declaration once, before anything else
    fn start(&mut self) -> Result<()> {
        if self.started.is_some() {
            return Ok(());
        }
        self.started = Some(Instant::now());
        if self.config.omit_xml_declaration {
            return Ok(());
        }
        let written = write!(
            self.sink,
            "<?xml version=\"{}\" encoding=\"{}\"?>{}",
            self.config.xml_version, self.config.encoding, self.config.eol
        );
        self.check_io(written)
    }

    fn resolved(&mut self) {
        self.ctx = self.config.render_context();
        if let Ok(topology) = self.config.topology() {
            self.summary.root_name = topology.root_name.clone();
            self.summary.node_name = Some(topology.node_name.clone());
        }
        self.state = StreamState::TopologyResolved;
    }

    /// Resolve from the first record if needed, raise the begin hook and open the root.
    /// `Ok(false)` means the begin hook aborted.
    fn open(&mut self, record: &dyn Record) -> Result<bool> {
        if self.state == StreamState::Idle {
            let shape = self.provider.describe_fields(record);
            resolve(&mut self.config, ResolveHint::Shape(&shape))?;
            self.resolved();
        }
        if !self.observer.begin_write() {
            return Ok(false);
        }
        self.state = StreamState::Emitting;

        let topology = self.config.topology()?;
        let open_tag = topology
            .root_name
            .as_ref()
            .map(|root| format!("<{}{}>", root, topology.namespaces.declarations()));
        if let Some(tag) = open_tag {
            let written = self.sink.write_all(tag.as_bytes());
            self.check_io(written)?;
            self.root_open = true;
        }
        Ok(true)
    }

    fn write_record(&mut self, record: &dyn Record, index: u64) -> Result<RecordOutcome> {
        if self.config.validation_scope == ValidationScope::Object
            && let Some(validator) = &self.config.object_validator
        {
            validator(record).map_err(|reason| WriterError::ObjectValidation { index, reason })?;
        }

        let rendered = RecordEncoder::new(&mut self.observer, &self.ctx, &self.config).render(
            record,
            &self.config,
            index,
        )?;
        let Some(fragment) = rendered else {
            return Ok(RecordOutcome::Skipped);
        };

        let separator = if self.root_open || self.summary.records_written > 0 {
            self.config.eol.as_str()
        } else {
            ""
        };
        let written = write!(self.sink, "{}{}", separator, fragment).and_then(|_| self.sink.flush());
        self.check_io(written)?;
        trace!("Wrote record #{}", index);

        let keep_going = self.observer.after_record_write(record, index, &fragment);
        Ok(RecordOutcome::Written { keep_going })
    }

    /// Apply the record error policy; `Err` stops the stream
    fn handle_record_error(&mut self, record: &dyn Record, index: u64, error: WriterError) -> Result<()> {
        if matches!(error, WriterError::Io(_)) {
            self.state = StreamState::Broken;
            return Err(error);
        }
        let mode = self.config.error_mode;
        match mode {
            ErrorMode::IgnoreAndContinue => {
                warn!("Ignoring failed record #{}: {}", index, error);
                self.summary.records_failed += 1;
                Ok(())
            }
            ErrorMode::ReportAndContinue if self.observer.record_write_error(record, index, &error) => {
                warn!("Record #{} failed and was handled: {}", index, error);
                self.summary.records_failed += 1;
                Ok(())
            }
            _ => {
                self.state = StreamState::Broken;
                Err(WriterError::RecordWrite {
                    index,
                    source: Box::new(error),
                })
            }
        }
    }

    fn abort<R>(&mut self, reason: &str) -> Option<Result<R>> {
        info!("Stream aborted at record #{}: {}", self.index, reason);
        self.summary.aborted = true;
        self.finish()
    }

    fn finish<R>(&mut self) -> Option<Result<R>> {
        match self.close() {
            Ok(()) => None,
            Err(e) => Some(Err(e)),
        }
    }

    fn process<R: Record>(&mut self, record: R, accepted: bool) -> Option<Result<R>> {
        self.index += 1;
        self.summary.records_read += 1;
        let index = self.index;

        if !accepted {
            self.summary.records_filtered += 1;
            self.notify_progress(index);
            return Some(Ok(record));
        }

        if matches!(self.state, StreamState::Idle | StreamState::TopologyResolved) {
            // Leading nulls cannot describe a shape
            if self.state == StreamState::Idle && record.is_null() {
                self.summary.records_skipped += 1;
                self.notify_progress(index);
                return Some(Ok(record));
            }
            match self.open(&record) {
                Ok(true) => {}
                Ok(false) => return self.abort("begin hook declined"),
                Err(e) => {
                    self.state = StreamState::Broken;
                    return Some(Err(e));
                }
            }
        }

        match self.observer.before_record_write(&record, index) {
            RecordAction::Abort => return self.abort("before-record hook declined"),
            RecordAction::Skip => self.summary.records_skipped += 1,
            RecordAction::Write => match self.write_record(&record, index) {
                Ok(RecordOutcome::Written { keep_going }) => {
                    self.summary.records_written += 1;
                    if !keep_going {
                        return self.abort("after-record hook declined");
                    }
                }
                Ok(RecordOutcome::Skipped) => self.summary.records_skipped += 1,
                Err(error) => {
                    if let Err(fatal) = self.handle_record_error(&record, index, error) {
                        return Some(Err(fatal));
                    }
                }
            },
        }

        self.notify_progress(index);
        Some(Ok(record))
    }

    /// Raised for every pulled record, filtered ones included
    fn notify_progress(&mut self, index: u64) {
        let every = self.config.notify_after;
        if every > 0 && index % every == 0 && self.observer.rows_written(index).is_break() {
            info!("Progress hook requested cancellation after {} records", index);
            self.abort_requested = true;
        }
    }
}

/// Pull-based stream over the records being written.
///
/// Yields each record after it was rendered (or skipped), and `Err` once
/// when a fatal error stops the stream. The document is closed when the
/// input is exhausted or a hook aborts.
pub struct RecordStream<'w, W: Write, O: WriteObserver, I: Iterator> {
    writer: &'w mut XmlRecordWriter<W, O>,
    records: I,
    filter: Option<Box<dyn FnMut(&I::Item) -> bool + 'w>>,
}

impl<W: Write, O: WriteObserver, I> Iterator for RecordStream<'_, W, O, I>
where
    I: Iterator,
    I::Item: Record,
{
    type Item = Result<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.writer.state.is_finished() {
            return None;
        }
        if self.writer.abort_requested {
            self.writer.summary.aborted = true;
            return self.writer.finish();
        }
        if let Err(e) = self.writer.start() {
            return Some(Err(e));
        }

        let Some(record) = self.records.next() else {
            return self.writer.finish();
        };
        let accepted = self.filter.as_mut().is_none_or(|filter| filter(&record));
        self.writer.process(record, accepted)
    }
}
