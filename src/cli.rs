use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{parse_error_mode, parse_null_handling};
use crate::field::ErrorMode;
use crate::record_config::NullValueHandling;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

/// How the run summary is reported on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Summary,
}

/// Stream JSON records into a single XML document
#[derive(Parser, Debug, Clone)]
#[command(name = "xml-record-writer")]
#[command(about = "Write JSON records as one streamed XML document")]
#[command(version)]
pub struct Cli {
    /// JSON array or JSON Lines file; `-` reads stdin
    #[arg(help = "Input file with JSON records ('-' for stdin)")]
    pub input: PathBuf,

    /// Settings file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Output file; stdout when absent
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Root element name; without --node it names each record instead
    #[arg(long = "root")]
    pub root: Option<String>,

    /// Element name for each record
    #[arg(long = "node")]
    pub node: Option<String>,

    /// Location hint such as `//Items/Item`
    #[arg(long = "location")]
    pub location: Option<String>,

    /// Indentation width
    #[arg(long = "indent")]
    pub indent: Option<usize>,

    /// No indentation and no line breaks
    #[arg(long = "compact", conflicts_with = "indent")]
    pub compact: bool,

    /// Write the `<?xml ...?>` declaration
    #[arg(long = "xml-declaration")]
    pub xml_declaration: bool,

    /// ignore, substitute_default_instance or emit_nil_marker
    #[arg(long = "null-handling", value_parser = parse_null_handling)]
    pub null_handling: Option<NullValueHandling>,

    /// throw_and_stop, report_and_continue or ignore_and_continue
    #[arg(long = "error-mode", value_parser = parse_error_mode)]
    pub error_mode: Option<ErrorMode>,

    /// Report progress every N records
    #[arg(long = "notify-after")]
    pub notify_after: Option<u64>,

    /// Summary format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.reads_stdin() && !self.input.exists() {
            return Err(format!("Input does not exist: {}", self.input.display()));
        }
        if let Some(config) = &self.config
            && !config.exists()
        {
            return Err(format!("Settings file does not exist: {}", config.display()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_basic_cli_parsing() {
        let cli = Cli::try_parse_from(["xml-record-writer", "records.json"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("records.json"));
        assert_eq!(cli.format, OutputFormat::Human);
        assert_eq!(cli.verbosity(), VerbosityLevel::Normal);
        assert!(!cli.reads_stdin());
    }

    #[test]
    fn test_policy_flags() {
        let cli = Cli::try_parse_from([
            "xml-record-writer",
            "-",
            "--root",
            "Items",
            "--null-handling",
            "emit_nil_marker",
            "--error-mode",
            "ignore_and_continue",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();

        assert!(cli.reads_stdin());
        assert_eq!(cli.root.as_deref(), Some("Items"));
        assert_eq!(cli.null_handling, Some(NullValueHandling::EmitNilMarker));
        assert_eq!(cli.error_mode, Some(ErrorMode::IgnoreAndContinue));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbosity(), VerbosityLevel::Verbose);
    }

    #[test]
    fn test_conflicting_flags() {
        assert!(Cli::try_parse_from(["xml-record-writer", "-", "-v", "-q"]).is_err());
        assert!(
            Cli::try_parse_from(["xml-record-writer", "-", "--compact", "--indent", "4"]).is_err()
        );
        assert!(Cli::try_parse_from(["xml-record-writer", "-", "--error-mode", "panic"]).is_err());
    }
}
