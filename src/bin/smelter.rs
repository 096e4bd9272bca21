//! smelter: Generate Go struct definitions from sample JSON
//!
//! Usage:
//!   # Read a document from a file
//!   smelter --name User user.json
//!
//!   # Read newline-delimited objects from stdin with live output
//!   tail -f events.jsonl | smelter --lines --stream --stat-comments
//!
//!   # Dump the inferred tree as JSON
//!   smelter --format json data.json

use anyhow::{Context, Result};
use clap::Parser;
use smelter::{
    render, FieldOrder, GeneratorConfig, InputMode, NoProgress, OutputFormat, Pipeline,
    ProgressReporter, SampleSource, Strategy,
};
use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, IsTerminal, Write};
use std::time::Duration;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Lines reserved for the progress header and footer
const PROGRESS_CHROME: usize = 7;

const MIN_VISIBLE_LINES: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "smelter")]
#[command(about = "Generate Go struct definitions from sample JSON", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Name of the root struct
    #[arg(long, default_value = "Foo")]
    name: String,

    /// Package clause of the generated source
    #[arg(long, default_value = "main")]
    pkg: String,

    /// Emit `omitempty` on every json tag
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    omitempty: bool,

    /// Factor repeated and nullable nested structs into named types
    #[arg(long)]
    extract_structs: bool,

    /// Annotate fields with statistics comments
    #[arg(long)]
    stat_comments: bool,

    /// Field order: alphabetical, encounter, common-first or rare-first
    #[arg(long, default_value = "alphabetical")]
    field_order: FieldOrder,

    /// Combination strategy: accumulate or merge
    #[arg(long, default_value = "accumulate")]
    strategy: Strategy,

    /// Treat the input as newline-delimited objects
    #[arg(long, conflicts_with = "document")]
    lines: bool,

    /// Treat the input as a single document
    #[arg(long)]
    document: bool,

    /// Show progressive output while reading
    #[arg(long)]
    stream: bool,

    /// Minimum milliseconds between progressive updates
    #[arg(long, default_value_t = 500)]
    update_interval: u64,

    /// Output format: go or json
    #[arg(long, default_value = "go")]
    format: OutputFormat,
}

impl Args {
    fn config(&self) -> GeneratorConfig {
        GeneratorConfig::default()
            .with_type_name(self.name.clone())
            .with_package_name(self.pkg.clone())
            .with_omit_empty(self.omitempty)
            .with_extract_structs(self.extract_structs)
            .with_stat_comments(self.stat_comments)
            .with_field_order(self.field_order)
            .with_strategy(self.strategy)
            .with_update_interval(Duration::from_millis(self.update_interval))
    }

    fn input_mode(&self) -> InputMode {
        if self.lines {
            InputMode::Lines
        } else if self.document {
            InputMode::Document
        } else {
            InputMode::Auto
        }
    }
}

/// Repaints the whole screen on a terminal, appends plain snapshots otherwise
struct TerminalProgress {
    terminal: bool,
    rows: usize,
}

impl TerminalProgress {
    fn new() -> Self {
        let rows = std::env::var("LINES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);
        TerminalProgress {
            terminal: stdout().is_terminal(),
            rows,
        }
    }
}

impl ProgressReporter for TerminalProgress {
    fn update(&mut self, text: &str, current: usize, total: Option<usize>) {
        let mut out = stdout().lock();
        let progress = match total {
            Some(total) => format!("{}/{}", current, total),
            None => current.to_string(),
        };

        if !self.terminal {
            let _ = writeln!(out, "{}", text);
            return;
        }

        let visible = self.rows.saturating_sub(PROGRESS_CHROME).max(MIN_VISIBLE_LINES);
        let lines: Vec<&str> = text.lines().collect();
        let mut screen = format!("{}=== Processing JSON objects: {} ===\n\n", CLEAR_SCREEN, progress);
        if lines.len() > visible {
            for line in &lines[..visible - 1] {
                screen.push_str(line);
                screen.push('\n');
            }
            screen.push_str(&format!("... ({} more lines)", lines.len() - visible + 1));
        } else {
            screen.push_str(text);
        }
        screen.push_str(&format!("\n\nProcessing... ({})", progress));

        let _ = out.write_all(screen.as_bytes());
        let _ = out.flush();
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();

    // Create reader based on input source
    let reader: Box<dyn BufRead> = if let Some(file_path) = &args.input {
        let file = File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?;
        Box::new(BufReader::new(file))
    } else {
        if stdin().is_terminal() {
            eprintln!("Expects input on stdin (or pass a FILE)");
            std::process::exit(1);
        }
        Box::new(BufReader::new(stdin()))
    };

    let source = SampleSource::open(reader, args.input_mode())?;
    let mut pipeline = Pipeline::new(&config);
    let mut terminal = TerminalProgress::new();
    let live = args.stream && args.format == OutputFormat::Go;

    let schema = if live {
        pipeline.run_source(source, &mut terminal, None)?
    } else {
        pipeline.run_source(source, &mut NoProgress, None)?
    };

    let output = match render(&schema, &config, args.format) {
        Ok(output) => output,
        Err(err) => {
            if let Some(raw) = err.unformatted_source() {
                eprintln!("{}", raw);
            }
            return Err(err.into());
        }
    };

    let mut out = stdout().lock();
    if live && terminal.terminal {
        write!(out, "{}", CLEAR_SCREEN)?;
    }
    write!(out, "{}", output)?;
    out.flush()?;

    Ok(())
}
