//! Run summary reporting
//!
//! Renders a [`WriteSummary`] for stderr in human, JSON or one-line form.

use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::emitter::WriteSummary;

/// Formatter for run summaries
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stderr),
        }
    }

    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format(&self, summary: &WriteSummary, format: OutputFormat) -> String {
        match format {
            OutputFormat::Human => self.format_results(summary),
            OutputFormat::Json => format_json(summary),
            OutputFormat::Summary => format_one_line(summary),
        }
    }

    pub fn format_results(&self, summary: &WriteSummary) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                if summary.has_failures() {
                    output.push_str(&format!("Failed records: {}\n", summary.records_failed));
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose | VerbosityLevel::Debug => {
                output.push_str(&self.format_summary(summary));

                if self.verbosity == VerbosityLevel::Debug {
                    output.push_str(&format_debug_info(summary));
                }
            }
        }

        output
    }

    fn format_summary(&self, summary: &WriteSummary) -> String {
        let mut output = String::new();
        output.push_str("Write Summary:\n");
        output.push_str(&format!("  Records read: {}\n", summary.records_read));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Written:", "32"),
            summary.records_written
        ));

        if summary.records_failed > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Failed:", "31"),
                summary.records_failed
            ));
        }
        if summary.records_skipped > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Skipped:", "36"),
                summary.records_skipped
            ));
        }
        if summary.records_filtered > 0 {
            output.push_str(&format!("  Filtered: {}\n", summary.records_filtered));
        }
        if summary.aborted {
            output.push_str(&format!("  {}\n", self.colorize("Aborted by hook", "33")));
        }

        output.push_str(&format!("  Success rate: {:.1}%\n", summary.success_rate()));
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(summary.duration)
        ));

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format!(
                "  Throughput: {:.1} records/sec\n",
                summary.records_per_second()
            ));
        }

        output
    }
}

fn format_debug_info(summary: &WriteSummary) -> String {
    let mut output = String::new();
    output.push_str("\nDebug Information:\n");
    output.push_str(&format!(
        "  Root: {}\n",
        summary.root_name.as_deref().unwrap_or("(none)")
    ));
    output.push_str(&format!(
        "  Node: {}\n",
        summary.node_name.as_deref().unwrap_or("(unresolved)")
    ));
    output
}

fn format_json(summary: &WriteSummary) -> String {
    serde_json::to_string_pretty(summary)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}\n", e))
}

fn format_one_line(summary: &WriteSummary) -> String {
    format!(
        "read={} written={} skipped={} filtered={} failed={} aborted={} duration={}\n",
        summary.records_read,
        summary.records_written,
        summary.records_skipped,
        summary.records_filtered,
        summary.records_failed,
        summary.aborted,
        format_duration(summary.duration)
    )
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
