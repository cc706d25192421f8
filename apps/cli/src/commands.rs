//! CLI command definitions, routing, and tracing setup.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chatmark_markdown::{MarkdownProcessor, normalize_with_report};
use chatmark_shared::{AppConfig, ProcessorConfig, init_config, load_config, load_config_from};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// chatmark: turn generated markdown answers into safe, structured HTML.
#[derive(Parser)]
#[command(
    name = "chatmark",
    version,
    about = "Render LLM-generated markdown into HTML with citations and callouts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.chatmark/chatmark.toml.
    #[arg(long, global = true, env = "CHATMARK_CONFIG")]
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

/// Render output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Rendered HTML only.
    Html,
    /// The full result: html, citations, enrichments, warnings, timing.
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full pipeline on a markdown answer.
    Render {
        /// Markdown file (reads stdin when omitted).
        file: Option<PathBuf>,

        /// Output format.
        #[arg(short, long, default_value = "html")]
        format: OutputFormat,

        /// Override the input character limit.
        #[arg(long)]
        max_chars: Option<usize>,

        /// Keep soft line breaks instead of rendering `<br />`.
        #[arg(long)]
        soft_breaks: bool,
    },

    /// Print the normalized markdown without rendering it.
    Normalize {
        /// Markdown file (reads stdin when omitted).
        file: Option<PathBuf>,
    },

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

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// clean for rendered output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "chatmark=info",
        1 => "chatmark=debug",
        _ => "chatmark=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Render {
            file,
            format,
            max_chars,
            soft_breaks,
        } => cmd_render(
            cli.config.as_deref(),
            file.as_deref(),
            format,
            max_chars,
            soft_breaks,
        ),
        Command::Normalize { file } => cmd_normalize(file.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_render(
    config_path: Option<&Path>,
    file: Option<&Path>,
    format: OutputFormat,
    max_chars: Option<usize>,
    soft_breaks: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let mut processor_config = ProcessorConfig::from(&config);
    if let Some(limit) = max_chars {
        processor_config.max_input_chars = limit;
    }
    if soft_breaks {
        processor_config.hard_breaks = false;
    }

    let processor = MarkdownProcessor::new(processor_config)?;
    let markdown = read_input(file)?;
    let result = processor
        .process(&markdown)
        .wrap_err("failed to render markdown")?;

    for warning in &result.warnings {
        warn!(kind = ?warning.kind, position = warning.position, "{}", warning.message);
    }
    info!(
        citations = result.citations.len(),
        enrichments = result.enrichments.len(),
        elapsed_ms = result.processing_time_ms,
        "rendered"
    );

    match format {
        OutputFormat::Html => println!("{}", result.html),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&*result)?),
    }
    Ok(())
}

fn cmd_normalize(file: Option<&Path>) -> Result<()> {
    let markdown = read_input(file)?;
    let report = normalize_with_report(&markdown);
    if report.closed_unterminated_fence {
        warn!("input ended inside a code fence; a closing fence was added");
    }
    println!("{}", report.text);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("failed to read stdin")?;
            Ok(buffer)
        }
    }
}
