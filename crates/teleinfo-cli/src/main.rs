use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use teleinfo_core::{
    EventKind, FrameSource, Handler, Observer, Record, SerialFrameSource, SourceError,
    decode_frame,
};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TELEINFO_BUILD_COMMIT"),
    " ",
    env!("TELEINFO_BUILD_DATE"),
    ")"
);

const STTY_HINT: &str =
    "configure and expose the serial device first, e.g. stty -F /dev/ttyAMA0 1200 sane evenp parenb cs7 -crtscts";

#[derive(Parser, Debug)]
#[command(name = "teleinfo")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Reader for the French meter telemetry serial output (téléinformation client).",
    long_about = None,
    after_help = "Examples:\n  teleinfo watch /dev/ttyAMA0\n  teleinfo decode capture.bin --stdout\n  teleinfo decode capture.bin -o records.jsonl"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read frames from a live serial device and print one JSON record per frame.
    #[command(
        after_help = "The device must already be configured (stty) and the loop never ends on its own: a lost stream is a fatal error, restart once the device is back."
    )]
    Watch {
        /// Serial character device carrying the meter output
        device: PathBuf,

        /// Number of notification worker threads
        #[arg(long, default_value_t = teleinfo_core::DEFAULT_WORKERS)]
        workers: usize,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
    /// Decode a recorded byte capture offline into JSON records.
    Decode {
        /// Path to a raw capture of the serial stream
        input: PathBuf,

        /// Output path (one JSON record per line)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        output: Option<PathBuf>,

        /// Write records to stdout
        #[arg(long, conflicts_with = "output")]
        stdout: bool,

        /// Pretty-print each record
        #[arg(long)]
        pretty: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch {
            device,
            workers,
            quiet,
        } => cmd_watch(device, workers, quiet),
        Commands::Decode {
            input,
            output,
            stdout,
            pretty,
            quiet,
        } => cmd_decode(input, output, stdout, pretty, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(err.to_string(), None)
    }
}

/// Observer printing each record's cached JSON form, one per line.
struct JsonLineObserver;

impl Observer for JsonLineObserver {
    fn notify(&self, _event: EventKind, record: &Record) {
        println!("{}", record.json());
    }
}

fn cmd_watch(device: PathBuf, workers: usize, quiet: bool) -> Result<(), CliError> {
    // Records go to stdout; keep diagnostics on stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let mut handler = Handler::new(&device)
        .map_err(|err| CliError::new(err.to_string(), Some(STTY_HINT.to_string())))?;
    handler.set_workers(workers);
    handler.register(Arc::new(JsonLineObserver));

    if !quiet {
        eprintln!("watching {} (ctrl-c to stop)", device.display());
    }

    let err = match handler.run() {
        Ok(never) => match never {},
        Err(err) => err,
    };
    Err(CliError::new(
        format!("stream lost: {err}"),
        Some("the reader does not reconnect; restart once the device is back".to_string()),
    ))
}

fn cmd_decode(
    input: PathBuf,
    output: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    quiet: bool,
) -> Result<(), CliError> {
    validate_input_file(&input)?;
    let file = fs::File::open(&input)
        .with_context(|| format!("Failed to open capture: {}", input.display()))?;
    let mut source = SerialFrameSource::from_reader(file);

    let mut lines = Vec::new();
    loop {
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            // Offline captures are finite: running out of bytes is the
            // normal end here, unlike in `watch`.
            Err(SourceError::StreamClosed) => break,
            Err(err) => {
                return Err(CliError::new(format!("capture read failed: {err}"), None));
            }
        };
        let record = decode_frame(&frame.payload, frame.timestamp).context("frame decoding failed")?;
        let line = if pretty {
            serde_json::to_string_pretty(record.fields()).context("JSON serialization failed")?
        } else {
            record.json().to_string()
        };
        lines.push(line);
    }

    if stdout {
        for line in &lines {
            println!("{line}");
        }
        return Ok(());
    }

    let output = output.expect("output required when not using stdout");
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }

    let mut rendered = String::new();
    for line in &lines {
        rendered.push_str(line);
        rendered.push('\n');
    }
    fs::write(&output, rendered)
        .with_context(|| format!("Failed to write records: {}", output.display()))?;

    if !quiet {
        eprintln!(
            "OK: {} records written -> {}",
            lines.len(),
            output.display()
        );
    }
    Ok(())
}

fn validate_input_file(input: &PathBuf) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("pass a raw capture of the serial stream".to_string()),
        ));
    }
    let meta = fs::metadata(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("decode expects a regular capture file; use `watch` for live devices".to_string()),
        ));
    }
    Ok(())
}
