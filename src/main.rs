//! # pagegrep CLI Application
//!
//! Command-line front end for the scan pipeline.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands:
//!   - `scan`: fetch a page, search it and write the PDF report
//!   - `config`: inspect and edit the settings file
//!
//! Progress is printed as timestamped lines while a spinner shows the current
//! stage. Ctrl-C cancels a running scan at its next stage boundary.

mod logging;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use logging::LogGuard;
use pagegrep::config::{Config, parse_value};
use pagegrep::matcher::SearchOptions;
use pagegrep::scan::{ScanRequest, Scanner};
use serde_json::Value;
use tracing::{info, instrument};

#[derive(Parser)]
#[command(author, version, about = "Search a web page for a keyword and save the matches as a PDF report", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a page for a keyword and write a PDF report
    Scan(ScanArgs),

    /// Show or change settings
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Page to scan (http or https)
    #[arg(required = true)]
    url: String,

    /// Keyword to search for
    #[arg(required = true)]
    keyword: String,

    /// Directory to write the report into (default: ui.default_save_path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Match the keyword's exact casing
    #[arg(short, long)]
    case_sensitive: bool,

    /// Match whole words only
    #[arg(short, long)]
    whole_word: bool,

    /// Request timeout in seconds (default: scraper.timeout_secs)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Characters of context around each match (default: scraper.context_length)
    #[arg(long)]
    context_length: Option<u64>,

    /// Settings file to use instead of ~/.pagegrep/config.json
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,

    /// Settings file to use instead of ~/.pagegrep/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print all settings
    Show,

    /// Print one setting, e.g. `scraper.timeout_secs`
    Get { key: String },

    /// Change one setting; JSON values are parsed, anything else is a string
    Set { key: String, value: String },

    /// Print the settings file location
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard: LogGuard = logging::init_logging();

    match cli.command {
        Some(Commands::Scan(args)) => {
            scan_command(args).await?;
        }
        Some(Commands::Config(args)) => {
            config_command(args)?;
        }
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["pagegrep", "--help"]);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

#[instrument]
async fn scan_command(args: ScanArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref());

    let output_dir = args
        .output
        .unwrap_or_else(|| config.default_save_path());

    let mut fetcher_config = config.fetcher_config();
    if let Some(timeout) = args.timeout {
        fetcher_config.timeout_secs = timeout.max(1);
    }
    let context_radius = args
        .context_length
        .map(|length| usize::try_from(length / 2).unwrap_or(usize::MAX))
        .unwrap_or_else(|| config.context_radius());

    let scanner = Scanner::new(fetcher_config, config.report_config())
        .with_context_radius(context_radius);
    let request = ScanRequest::new(
        args.url,
        args.keyword,
        output_dir,
        SearchOptions::new(args.case_sensitive, args.whole_word),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));

    let mut handle = scanner.spawn(request);
    let token = handle.cancellation_token();
    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => {
                    spinner.println(format!("[{}] {}", Local::now().format("%H:%M:%S"), event));
                    spinner.set_message(event.to_string());
                }
                None => break,
            },
            signal = tokio::signal::ctrl_c(), if !token.is_cancelled() => {
                signal?;
                info!("Interrupt received, cancelling scan");
                spinner.set_message("Cancelling...");
                token.cancel();
            }
        }
    }

    match handle.join().await {
        Ok(outcome) => {
            spinner.finish_and_clear();
            println!(
                "Found {} matches. Report saved to {}",
                outcome.match_count,
                outcome.path.display()
            );
            Ok(())
        }
        Err(err) => {
            spinner.abandon_with_message(format!("Failed: {err}"));
            Err(anyhow!(err))
        }
    }
}

fn config_command(args: ConfigArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref());

    match args.action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config.values())?);
        }
        ConfigAction::Get { key } => {
            let value = config
                .get(&key)
                .ok_or_else(|| anyhow!("No such setting: {key}"))?;
            match value {
                Value::String(s) => println!("{s}"),
                other => println!("{}", serde_json::to_string_pretty(other)?),
            }
        }
        ConfigAction::Set { key, value } => {
            let value = parse_value(&value);
            config.set(&key, value.clone())?;
            println!("{key} = {value}");
        }
        ConfigAction::Path => match config.path() {
            Some(path) => println!("{}", path.display()),
            None => println!("(in memory)"),
        },
    }

    Ok(())
}
