mod config_commands;
mod share_commands;

use std::path::PathBuf;

use {
    clap::{CommandFactory, FromArgMatches, Parser, Subcommand},
    sharebridge_config::ShareConfig,
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "sharebridge",
    version,
    about = "Hand shared content over to a host application"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of sharebridge.{toml,yaml,yml,json}).
    #[arg(long, global = true, env = "SHAREBRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one share invocation.
    Share(share_commands::ShareArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Exit status for an unreadable config file (sysexits.h `EX_CONFIG`).
const EXIT_CONFIG: i32 = 78;

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// An explicit `--config` must load; discovery falls back to defaults.
fn load_config(explicit: Option<&PathBuf>) -> (ShareConfig, Option<PathBuf>) {
    let (config, source) = match explicit {
        Some(path) => match sharebridge_config::load_config(path) {
            Ok(config) => (config, Some(path.clone())),
            Err(e) => {
                eprintln!("failed to load {}: {e}", path.display());
                std::process::exit(EXIT_CONFIG);
            },
        },
        None => (
            sharebridge_config::discover_and_load(),
            sharebridge_config::find_config_file(),
        ),
    };
    (sharebridge_config::apply_env_overrides(config), source)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "sharebridge starting");

    let (config, source) = load_config(cli.config.as_ref());
    if let Some(path) = &source {
        info!(path = %path.display(), "using config");
    }

    match cli.command {
        Commands::Share(args) => {
            share_commands::handle_share(args, matches.subcommand_matches("share"), config).await
        },
        Commands::Config { action } => {
            config_commands::handle_config(action, &config, source.as_deref())
        },
    }
}
