//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail};
use serde::Serialize;
use tracing::info;

use webacquire_core::{Engine, ScrapeMethod};
use webacquire_shared::{AppConfig, config_file_path, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// webacquire: acquire web pages and PDFs as structured records.
#[derive(Parser)]
#[command(
    name = "webacquire",
    version,
    about = "Fetch web pages and PDF documents and print them as structured JSON records.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.webacquire/webacquire.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Acquire a single URL.
    Scrape {
        /// URL to fetch.
        url: String,

        /// Strategy: auto, static, dynamic_a, dynamic_b, or pdf.
        #[arg(short, long, default_value = "auto")]
        method: ScrapeMethod,
    },

    /// Acquire many URLs concurrently.
    Batch {
        /// URLs to fetch.
        urls: Vec<String>,

        /// File with one URL per line (blank lines and `#` comments ignored).
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Maximum simultaneous acquisitions (defaults to `batch.max_concurrent`).
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Strategy applied to every URL.
        #[arg(short, long, default_value = "auto")]
        method: ScrapeMethod,
    },

    /// Report available strategies, tools, and network reachability.
    Health,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries records.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "webacquire=info",
        1 => "webacquire=debug",
        _ => "webacquire=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Scrape { url, method } => cmd_scrape(config_path, &url, method).await,
        Command::Batch {
            urls,
            file,
            max_concurrent,
            method,
        } => cmd_batch(config_path, urls, file.as_deref(), max_concurrent, method).await,
        Command::Health => cmd_health(config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

/// Load the config file (explicit path or default location) and apply
/// environment overrides.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config.apply_env())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).wrap_err("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_scrape(config_path: Option<&Path>, url: &str, method: ScrapeMethod) -> Result<()> {
    let engine = Engine::new(resolve_config(config_path)?).await?;
    let record = engine.scrape_url(url, method).await;
    print_json(&record)?;

    if !record.is_success() {
        bail!("{url}: {}", record.content);
    }
    Ok(())
}

async fn cmd_batch(
    config_path: Option<&Path>,
    mut urls: Vec<String>,
    file: Option<&Path>,
    max_concurrent: Option<usize>,
    method: ScrapeMethod,
) -> Result<()> {
    let config = resolve_config(config_path)?;

    if let Some(path) = file {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read URL list {}", path.display()))?;
        urls.extend(parse_url_list(&content));
    }
    check_batch_size(urls.len(), config.batch.max_batch_size)?;

    let max_concurrent = max_concurrent.unwrap_or(config.batch.max_concurrent);
    info!(urls = urls.len(), max_concurrent, %method, "starting batch");

    let engine = Engine::new(config).await?;
    let records = engine.scrape_many_with(urls, method, max_concurrent).await;
    print_json(&records)
}

async fn cmd_health(config_path: Option<&Path>) -> Result<()> {
    let engine = Engine::new(resolve_config(config_path)?).await?;
    let report = engine.health_check().await;
    print_json(&report)?;

    if !report.is_healthy() {
        bail!("static fetch or network unavailable");
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        bail!("config already exists at {}", path.display());
    }
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// URLs from a list file: one per line, blank lines and `#` comments skipped.
fn parse_url_list(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
}

fn check_batch_size(count: usize, limit: usize) -> Result<()> {
    if count == 0 {
        bail!("no URLs given; pass them as arguments or with --file");
    }
    if count > limit {
        bail!("too many URLs: {count} (batch limit is {limit})");
    }
    Ok(())
}
