use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::ExitCode;

use xml_record_writer::cli::{Cli, OutputFormat, VerbosityLevel};
use xml_record_writer::config::ConfigManager;
use xml_record_writer::error_reporter::ErrorReporter;
use xml_record_writer::output::Output;
use xml_record_writer::{Value, XmlRecordWriter};

/// Install the stderr subscriber; `RUST_LOG` wins over the verbosity flags
fn init_logging(verbosity: VerbosityLevel) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = match verbosity {
        VerbosityLevel::Quiet => "off",
        VerbosityLevel::Normal => "error",
        VerbosityLevel::Verbose => "info",
        VerbosityLevel::Debug => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("xml_record_writer={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn open_input(cli: &Cli) -> Result<Box<dyn BufRead>> {
    if cli.reads_stdin() {
        return Ok(Box::new(BufReader::new(std::io::stdin().lock())));
    }
    let file = std::fs::File::open(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Whether the first non-blank byte opens a JSON array
fn starts_with_array(input: &mut dyn BufRead) -> Result<bool> {
    loop {
        let buffer = input.fill_buf().context("Failed to read records")?;
        if buffer.is_empty() {
            return Ok(false);
        }
        match buffer.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(at) => return Ok(buffer[at] == b'['),
            None => {
                let blank = buffer.len();
                input.consume(blank);
            }
        }
    }
}

/// One record per JSON line, parsed as the writer pulls it. The first bad
/// line ends the sequence and is left in `failure`.
fn json_lines<'a>(
    input: Box<dyn BufRead>,
    failure: &'a mut Option<anyhow::Error>,
) -> impl Iterator<Item = Value> + 'a {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map_while(move |(n, line)| {
            let parsed = line
                .context("Failed to read records")
                .and_then(|line| {
                    serde_json::from_str::<serde_json::Value>(&line)
                        .with_context(|| format!("Invalid JSON on line {}", n + 1))
                });
            match parsed {
                Ok(json) => Some(Value::from(json)),
                Err(e) => {
                    *failure = Some(e);
                    None
                }
            }
        })
}

fn open_sink(cli: &Cli) -> Result<Box<dyn Write>> {
    Ok(match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = match ConfigManager::load_config(cli).await {
        Ok(config) => config,
        Err(e) => {
            ErrorReporter::new(cli.verbosity()).report_config_error(&e);
            return Ok(ExitCode::from(2));
        }
    };
    let verbosity = if config.output.quiet {
        VerbosityLevel::Quiet
    } else if config.output.verbose {
        VerbosityLevel::Verbose.max(cli.verbosity())
    } else {
        cli.verbosity()
    };
    let format: OutputFormat = config.output.format.clone().into();

    let record_config = config.into_record_configuration()?;
    let mut input = open_input(cli)?;

    let mut writer = XmlRecordWriter::with_observer(
        open_sink(cli)?,
        record_config,
        ErrorReporter::new(verbosity),
    );
    let mut bad_line = None;
    let result = if starts_with_array(&mut *input)? {
        let values: Vec<serde_json::Value> =
            serde_json::from_reader(input).context("Input is not a valid JSON array")?;
        writer.write_all(values.into_iter().map(Value::from))
    } else {
        writer.write_all(json_lines(input, &mut bad_line))
    };
    let summary = writer.summary().clone();
    if let Some(e) = bad_line {
        eprint!("{}", Output::new(verbosity).format(&summary, format));
        return Err(e);
    }

    let code = match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            writer.observer().report_fatal(&e);
            ExitCode::FAILURE
        }
    };

    eprint!("{}", Output::new(verbosity).format(&summary, format));
    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbosity());

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
