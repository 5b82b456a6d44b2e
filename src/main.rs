//! seqstore - Interactive shell for the sequencing document store.
//!
//! Reads one command per line from stdin (or from a script file), applies it
//! to an in-memory store and prints the result. Type `help` for the command
//! list.
//!
//! # Usage
//!
//! ```bash
//! cargo run                                  # Interactive shell
//! cargo run -- --history 100 session.txt     # Run a script with bounded undo
//! RUST_LOG=seqstore=debug cargo run          # Log every command to stderr
//! ```

use anyhow::{Context, Result};
use seqstore::shell::{self, Flow};
use seqstore::{SharedStore, StoreConfig};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::thread;

/// Command-line options for the application.
struct CliOptions {
    /// JSON configuration file.
    config: Option<PathBuf>,
    /// Undo depth per project, overriding the config file.
    history: Option<usize>,
    /// Ticks per quarter for new projects, overriding the config file.
    ticks: Option<u64>,
    /// Script to run instead of reading stdin.
    script: Option<PathBuf>,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--config <path>` or `-c <path>`: Load settings from a JSON file
    /// - `--history <n>`: Keep at most `n` undo steps per project
    /// - `--ticks <n>`: Ticks per quarter note for new projects
    /// - `--help` or `-h`: Print help and exit
    /// - a positional path: run that script, then exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = Self {
            config: None,
            history: None,
            ticks: None,
            script: None,
        };
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    i += 1;
                    let path = args.get(i).context("--config requires a path argument")?;
                    options.config = Some(PathBuf::from(path));
                }
                "--history" => {
                    i += 1;
                    let value = args.get(i).context("--history requires a number")?;
                    options.history =
                        Some(value.parse().with_context(|| format!("Invalid --history value: {value}"))?);
                }
                "--ticks" => {
                    i += 1;
                    let value = args.get(i).context("--ticks requires a number")?;
                    options.ticks =
                        Some(value.parse().with_context(|| format!("Invalid --ticks value: {value}"))?);
                }
                "--help" | "-h" => {
                    eprintln!("seqstore - Command-driven sequencing document store");
                    eprintln!();
                    eprintln!(
                        "Usage: {} [OPTIONS] [SCRIPT]",
                        args.first().map(String::as_str).unwrap_or("seqstore")
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -c, --config PATH   Load settings from a JSON file");
                    eprintln!("      --history N     Keep at most N undo steps per project");
                    eprintln!("      --ticks N       Ticks per quarter note for new projects");
                    eprintln!("  -h, --help          Print this help message");
                    eprintln!();
                    eprintln!("Without SCRIPT, commands are read from stdin.");
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    eprintln!("Unknown option: {}", other);
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
                other => options.script = Some(PathBuf::from(other)),
            }
            i += 1;
        }

        Ok(options)
    }

    /// Builds the store configuration: file first, then flag overrides.
    fn store_config(&self) -> Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::load_from_file(path)?,
            None => StoreConfig::default(),
        };
        if let Some(history) = self.history {
            config.history_limit = Some(history);
        }
        if let Some(ticks) = self.ticks {
            config.ticks_per_quarter = ticks;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.store_config().context("Failed to load configuration")?;
    let (store, notifications) = SharedStore::new(config);

    // Drain completion signals so the channel never grows without bound.
    let listener = thread::spawn(move || {
        for notification in notifications {
            match &notification.result {
                Ok(created) => tracing::trace!(
                    request = notification.request,
                    command = %notification.command,
                    ?created,
                    "completed"
                ),
                Err(err) => tracing::trace!(
                    request = notification.request,
                    command = %notification.command,
                    error = %err,
                    "failed"
                ),
            }
        }
    });

    let interactive = cli.script.is_none();
    let input: Box<dyn BufRead> = match &cli.script {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open script {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let result = run(&store, input, interactive);

    drop(store);
    if listener.join().is_err() {
        tracing::error!("notification listener panicked");
    }
    result
}

fn run(store: &SharedStore, input: Box<dyn BufRead>, interactive: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if interactive {
        writeln!(out, "seqstore - type 'help' for commands")?;
    }

    for (number, line) in input.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        match shell::run_line(store, &line, &mut out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            // Interactive sessions report errors and carry on; scripts stop.
            Err(err) if interactive => writeln!(out, "error: {err:#}")?,
            Err(err) => return Err(err.context(format!("line {}: {}", number + 1, line.trim()))),
        }
        out.flush()?;
    }
    Ok(())
}
