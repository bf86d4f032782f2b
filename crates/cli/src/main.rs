//! SceneTrack CLI — the main entry point.
//!
//! Commands:
//! - `default`    — Print an all-default tracker
//! - `normalize`  — Canonicalize a raw tracker against the schema
//! - `update`     — Merge an incoming tracker over a previous one
//! - `exists`     — Check whether a tracker carries real data
//! - `clean`      — Remove values equal to their defaults
//! - `strip`      — Remove internal-only fields
//! - `prompt`     — Print field instructions for a generation prompt
//! - `examples`   — Print few-shot example trackers
//! - `audit`      — Report problems in a schema file
//! - `init`       — Print or write the default configuration

use clap::{Parser, Subcommand};
use scenetrack_codec::Format;
use scenetrack_core::IncludeFilter;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "scenetrack",
    about = "SceneTrack — schema-driven scene tracker reconciliation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.scenetrack/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Schema file, overriding the configured schema
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Presence filter: dynamic, static or all
    #[arg(long, global = true)]
    filter: Option<IncludeFilter>,

    /// Output format: json or yaml
    #[arg(long, global = true)]
    format: Option<Format>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an all-default tracker
    Default,

    /// Canonicalize a raw tracker (`-` reads stdin)
    Normalize {
        file: PathBuf,
        /// Leave quarantined data out of the output
        #[arg(long)]
        no_extra: bool,
    },

    /// Merge an incoming tracker over a previous one
    Update { previous: PathBuf, incoming: PathBuf },

    /// Print whether a tracker carries anything beyond defaults
    Exists { file: PathBuf },

    /// Remove values equal to their schema defaults
    Clean {
        file: PathBuf,
        /// Keep emptied keys as "", [] or {}
        #[arg(long)]
        preserve: bool,
    },

    /// Remove internal-only fields
    Strip { file: PathBuf },

    /// Print field instructions for a generation prompt
    Prompt,

    /// Print few-shot example trackers
    Examples,

    /// Report problems in a schema file
    Audit {
        file: PathBuf,
        /// Print the corrected schema instead of the findings
        #[arg(long)]
        normalized: bool,
        /// Fail when anything above info severity is found
        #[arg(long)]
        strict: bool,
    },

    /// Print the default configuration, or write it with --write
    Init {
        /// Create ~/.scenetrack/config.toml and schema.json
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays parseable.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = commands::GlobalOptions {
        config: cli.config,
        schema: cli.schema,
        filter: cli.filter,
        format: cli.format,
    };

    // Init and Audit run without a loaded configuration.
    let ctx = || commands::Context::load(&options);
    match cli.command {
        Commands::Init { write } => commands::init::run(write).await?,
        Commands::Audit {
            file,
            normalized,
            strict,
        } => {
            let format = options.format.unwrap_or_default();
            commands::audit::run(&file, normalized, strict, format).await?
        }
        Commands::Default => commands::tracker::default(&ctx()?).await?,
        Commands::Normalize { file, no_extra } => commands::tracker::normalize(&ctx()?, &file, no_extra).await?,
        Commands::Update { previous, incoming } => commands::tracker::update(&ctx()?, &previous, &incoming).await?,
        Commands::Exists { file } => commands::tracker::exists(&ctx()?, &file).await?,
        Commands::Clean { file, preserve } => commands::tracker::clean(&ctx()?, &file, preserve).await?,
        Commands::Strip { file } => commands::tracker::strip(&ctx()?, &file).await?,
        Commands::Prompt => commands::prompt::prompt(&ctx()?).await?,
        Commands::Examples => commands::prompt::examples(&ctx()?).await?,
    }

    Ok(())
}
