//! CLI entry point for `unforward`.
//!
//! Reads a raw message, unwraps its forward layers and prints the result
//! as JSON on stdout.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde_json::json;
use unforward::{ExtractError, Extractor, MatchTrace, Outcome, decode_parts};

#[derive(Parser)]
#[command(name = "unforward", version, about = "Recover the original message from a forwarded email")]
struct Cli {
    /// Raw message file; reads stdin when omitted
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Which parts of the message to extract from
    #[arg(short, long, value_enum, default_value_t = Mode::Auto)]
    mode: Mode,

    /// Pretty-print the JSON output
    #[arg(short, long)]
    pretty: bool,

    /// Include the match trace in the output
    #[arg(short, long)]
    trace: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Both parts, reconciled when both are present
    Auto,
    /// The markup part only
    Html,
    /// The plain-text part only
    Text,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level);

    let raw = read_input(cli.file.as_ref())?;
    let extractor = Extractor::new();
    let outcome = match cli.mode {
        Mode::Auto => extractor.extract_from_mime(&raw),
        Mode::Html => extractor.extract_html_from_mime(&raw),
        Mode::Text => match decode_parts(&raw) {
            Ok(parts) => extractor.extract(None, parts.text.as_deref()),
            Err(error) => failed(error),
        },
    };

    let output = render(outcome, cli.trace);
    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{json}");
    Ok(())
}

fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

fn read_input(file: Option<&PathBuf>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .context("Failed to read stdin")?;
            Ok(raw)
        }
    }
}

fn failed(error: ExtractError) -> Outcome {
    let trace = MatchTrace::new().with_error(&error);
    Outcome {
        result: Err(error),
        trace,
    }
}

fn render(outcome: Outcome, include_trace: bool) -> serde_json::Value {
    let Outcome { result, trace } = outcome;
    let mut output = match result {
        Ok(result) => json!({ "result": result }),
        Err(error) => json!({
            "error": error.kind(),
            "message": error.to_string(),
        }),
    };
    if include_trace && let Some(object) = output.as_object_mut() {
        object.insert("trace".into(), json!(trace));
    }
    output
}
