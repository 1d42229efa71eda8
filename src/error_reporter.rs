use std::ops::ControlFlow;

use crate::cli::VerbosityLevel;
use crate::config::ConfigError;
use crate::error::{ConfigurationError, WriterError};
use crate::hooks::WriteObserver;
use crate::value::Record;

/// Observer that reports record and field failures on stderr.
///
/// Every reported error is declared handled, so a stream written with a
/// `ReportAndContinue` policy keeps going.
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
    show_timestamps: bool,
    show_error_codes: bool,
    record_errors: u64,
    field_errors: u64,
}

impl ErrorReporter {
    /// Create a new error reporter with specified verbosity
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self::with_options(verbosity, false, false)
    }

    /// Create a new error reporter with additional options
    pub fn with_options(
        verbosity: VerbosityLevel,
        show_timestamps: bool,
        show_error_codes: bool,
    ) -> Self {
        Self {
            verbosity,
            show_timestamps,
            show_error_codes,
            record_errors: 0,
            field_errors: 0,
        }
    }

    pub fn record_errors(&self) -> u64 {
        self.record_errors
    }

    pub fn field_errors(&self) -> u64 {
        self.field_errors
    }

    /// Report a settings error
    pub fn report_config_error(&self, error: &ConfigError) {
        let formatted = match self.verbosity {
            VerbosityLevel::Quiet => format!("Config error: {}", error),
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                format!("Configuration Error: {}\n{}", error, config_help(error))
            }
            VerbosityLevel::Debug => format!(
                "Configuration Error: {}\nDebug: {:?}\n{}",
                error,
                error,
                config_help(error)
            ),
        };
        eprintln!("{}", formatted);
    }

    /// Report a fatal error that stopped the stream
    pub fn report_fatal(&self, error: &WriterError) {
        eprintln!("{}", self.format_error(error));
    }

    /// Format `error` at this reporter's verbosity
    pub fn format_error(&self, error: &WriterError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => format!("ERROR: {}", error),
            VerbosityLevel::Normal => self.format_error_normal(error),
            VerbosityLevel::Verbose => self.format_error_verbose(error),
            VerbosityLevel::Debug => self.format_error_debug(error),
        }
    }

    fn format_error_normal(&self, error: &WriterError) -> String {
        let timestamp = if self.show_timestamps {
            format!("[{}] ", chrono::Utc::now().format("%H:%M:%S"))
        } else {
            String::new()
        };
        let code = if self.show_error_codes {
            format!("[{}] ", error_code(error))
        } else {
            String::new()
        };

        format!("{}{}{}", timestamp, code, error)
    }

    fn format_error_verbose(&self, error: &WriterError) -> String {
        let mut output = self.format_error_normal(error);

        match error {
            WriterError::SizeOverflow { field, size, .. } => {
                output.push_str(&format!(
                    "\nSuggestion: enable truncation for '{}' or raise its size above {}",
                    field, size
                ));
            }
            WriterError::MissingField { field, .. } => {
                output.push_str(&format!(
                    "\nSuggestion: add '{}' to the record or disable strict missing fields",
                    field
                ));
            }
            WriterError::ColumnCount { .. } | WriterError::MissingColumns { .. } => {
                output.push_str("\nSuggestion: disable strict column count for records with optional fields");
            }
            WriterError::Configuration(ConfigurationError::DuplicateField { .. }) => {
                output.push_str("\nSuggestion: give attribute and element fields distinct names");
            }
            _ => {}
        }

        output
    }

    fn format_error_debug(&self, error: &WriterError) -> String {
        let mut output = self.format_error_verbose(error);
        output.push_str(&format!("\nDebug Info: {:?}", error));

        output.push_str("\nError Chain:");
        let mut current_error: &dyn std::error::Error = error;
        let mut level = 0;
        while let Some(source) = current_error.source() {
            output.push_str(&format!("\n  {}: {}", level + 1, source));
            current_error = source;
            level += 1;
        }

        output
    }

    /// Progress line for `count` written records; `None` when quiet
    pub fn format_progress(&self, count: u64) -> Option<String> {
        match self.verbosity {
            VerbosityLevel::Quiet => None,
            _ => Some(format!("Progress: {} records written", count)),
        }
    }
}

impl WriteObserver for ErrorReporter {
    fn record_write_error(&mut self, _record: &dyn Record, index: u64, error: &WriterError) -> bool {
        self.record_errors += 1;
        eprintln!("Record #{}: {}", index, self.format_error(error));
        true
    }

    fn field_write_error(
        &mut self,
        _record: &dyn Record,
        index: u64,
        field: &str,
        error: &WriterError,
    ) -> bool {
        self.field_errors += 1;
        if self.verbosity >= VerbosityLevel::Verbose {
            eprintln!("Record #{} field '{}': {}", index, field, self.format_error(error));
        }
        true
    }

    fn rows_written(&mut self, count: u64) -> ControlFlow<()> {
        if let Some(line) = self.format_progress(count) {
            eprintln!("{}", line);
        }
        ControlFlow::Continue(())
    }
}

/// Stable short code per error kind
pub fn error_code(error: &WriterError) -> &'static str {
    match error {
        WriterError::Io(_) => "W001",
        WriterError::Configuration(_) => "W002",
        WriterError::MissingField { .. } => "W003",
        WriterError::FieldWrite { .. } => "W004",
        WriterError::SizeOverflow { .. } => "W005",
        WriterError::HeaderTerminator { .. } => "W006",
        WriterError::Conversion { .. } => "W007",
        WriterError::Validation { .. } | WriterError::ObjectValidation { .. } => "W008",
        WriterError::ColumnCount { .. } | WriterError::MissingColumns { .. } => "W009",
        WriterError::RecordWrite { .. } => "W010",
        WriterError::InvalidSample { .. } => "W011",
    }
}

fn config_help(error: &ConfigError) -> String {
    match error {
        ConfigError::Io(_) => "Check that the settings file exists and is readable".to_string(),
        ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
            "Check the settings file syntax (TOML/JSON format expected)".to_string()
        }
        ConfigError::Validation(reason) => format!("Fix the settings value: {}", reason),
        ConfigError::Environment(reason) => {
            format!("Fix the XML_WRITER_* environment variable: {}", reason)
        }
        ConfigError::UnsupportedFormat(ext) => {
            format!("Rename the settings file: '{}' is not .toml or .json", ext)
        }
    }
}
