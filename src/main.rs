//! Media Organizer - sort photo and video archives by capture date
//!
//! Command line front end: parses arguments, prompts for anything missing,
//! prints run log lines as they happen and the final summary.

use anyhow::{Context, Result};
use clap::Parser;
use media_organizer::{Cli, LogSink, Organizer, RunOptions, RunSummary};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored console output shared by the prompts, live log and summary

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_banner(title: &str) {
        let line = "=".repeat(41);
        let _ = stdout().execute(Print(format!("{}\n", line)));
        let _ = stdout().execute(Print(format!("{:^41}\n", title).bold()));
        let _ = stdout().execute(Print(format!("{}\n\n", line)));
    }

    /// Color for a run log line, chosen by its tag
    pub fn tag_color(line: &str) -> Option<Color> {
        if line.starts_with("[SUCCESS]") {
            Some(CliTheme::SUCCESS)
        } else if line.starts_with("[DRY RUN]") {
            Some(CliTheme::ACCENT)
        } else if line.starts_with("[DUPLICATE]") || line.starts_with("[WARN]") {
            Some(CliTheme::WARNING)
        } else if line.starts_with("[ERROR]") {
            Some(CliTheme::ERROR)
        } else {
            None
        }
    }

    /// Print a run log line, colored by its tag
    pub fn print_log_line(line: &str) {
        let mut out = stdout();
        match tag_color(line) {
            Some(color) => {
                let _ = out.execute(Print(style(format!("{}\n", line)).with(color)));
            }
            None => {
                let _ = out.execute(Print(format!("{}\n", line)));
            }
        }
    }

    pub fn print_prompt(msg: &str) {
        let _ = stdout().execute(Print(style(msg).bold()));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("! ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("x ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

/// Live sink printing run log lines to the terminal
struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, line: &str) {
        cli_output::print_log_line(line);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Run failed");
            cli_output::print_error(&format!("Error: {:#}", e));
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if let Some(ref path) = cli.write_config {
        RunOptions::write_sample_config(path)?;
        println!("Sample configuration written to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let _guard = setup_logging(cli)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Media Organizer starting");

    cli_output::print_banner(&format!("Media Archive Organizer v{}", env!("CARGO_PKG_VERSION")));

    let options = load_options(cli)?;
    if cli.verbose {
        info!(?options, "Options loaded");
    }

    let organizer = Organizer::new(options);
    let summary = organizer.run(&ConsoleSink)?;
    print_summary(&summary);

    if summary.stats.errors > 0 {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Build run options from the config file, the CLI and, when a terminal is
/// attached, the interactive prompts
fn load_options(cli: &Cli) -> Result<RunOptions> {
    let mut options = match cli.config {
        Some(ref path) => {
            info!(config_file = %path.display(), "Loading configuration from file");
            cli.merge_with_config(RunOptions::load_from_file(path)?)
        }
        None => cli.to_options(),
    };

    let interactive = io::stdin().is_terminal();
    let mut stdin = io::stdin().lock();

    if options.source_root.as_os_str().is_empty() {
        if !interactive {
            anyhow::bail!("No source folder given");
        }
        options.source_root = prompt_source(&mut stdin)?;
    }

    // Without an explicit choice, ask; default to simulating
    if cli.config.is_none() && !cli.mode_given() {
        options.dry_run = if interactive {
            prompt_dry_run(&mut stdin)?
        } else {
            true
        };
    }

    Ok(options)
}

fn prompt_source(input: &mut impl BufRead) -> Result<PathBuf> {
    cli_output::print_prompt("Enter the source folder path to process: ");
    io::stdout().flush()?;
    let answer = read_answer(input)?;
    Ok(PathBuf::from(answer))
}

fn prompt_dry_run(input: &mut impl BufRead) -> Result<bool> {
    cli_output::print_blank();
    cli_output::print_prompt("Run in Dry Run mode (simulate only)? [Y/n]: ");
    io::stdout().flush()?;
    let answer = read_answer(input)?;
    Ok(parse_yes_default(&answer))
}

fn read_answer(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().trim_matches('"').to_string())
}

/// Empty, `y` and `yes` mean yes
fn parse_yes_default(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer.is_empty() || answer == "y" || answer == "yes"
}

fn print_summary(summary: &RunSummary) {
    use cli_output::*;

    print_blank();
    print_stat("Processed", &summary.stats.processed.to_string(), CliTheme::SUCCESS);
    print_stat(
        "Duplicates skipped",
        &summary.stats.skipped_duplicates.to_string(),
        CliTheme::ACCENT,
    );
    print_stat("Errors", &summary.stats.errors.to_string(), CliTheme::ERROR);
    print_stat("Log", &summary.log_file.display().to_string(), CliTheme::HINT);
    print_blank();

    if summary.dry_run {
        print_warning("Dry run: no files were moved. Re-run with --live to apply.");
    }
}

/// Setup diagnostic logging (console + optional trace file)
fn setup_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    // The run log already reports every file, so diagnostics stay quiet
    // unless asked for
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.trace_log.is_some() {
        Level::INFO
    } else {
        Level::WARN
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let Some(ref trace_path) = cli.trace_log else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let file = open_trace_file(trace_path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(Some(guard))
}

fn open_trace_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to open trace log {}", path.display()))?;
    Ok(file)
}
