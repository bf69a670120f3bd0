//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::output::OutputFormat;

/// Log filter when neither flag, env nor config sets one
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;

    init_logging(&cli, &config);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Flag > env (handled by clap) > config file > default
    let output_format = cli
        .output
        .or(config.output_format)
        .unwrap_or(OutputFormat::Pretty);
    let program = cli.ca_client_bin.clone().or_else(|| config.ca_client_bin.clone());
    let timeout = cli
        .timeout_secs
        .or(config.timeout_secs)
        .map(Duration::from_secs);

    let ctx = commands::Context {
        output_format,
        program,
        timeout,
        material_selection: config.material_selection.unwrap_or_default(),
    };
    tracing::debug!(
        output = %ctx.output_format,
        program = ?ctx.program,
        timeout = ?ctx.timeout,
        "resolved settings"
    );

    // Dispatch to appropriate command
    match cli.command {
        Commands::EnrollOrg(args) => commands::org::execute(ctx, args).await,
        Commands::EnrollOrderer(args) => commands::orderer::execute(ctx, args).await,
        Commands::Register(args) => commands::ca::register(ctx, args).await,
        Commands::Enroll(args) => commands::ca::enroll(ctx, args).await,
        Commands::EnrollUser(args) => commands::user::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args),
    }
}

/// Install the tracing subscriber on stderr.
fn init_logging(cli: &Cli, config: &Config) {
    let configured = cli
        .log_level
        .as_deref()
        .or(config.log_level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    let level = match cli.verbose {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
