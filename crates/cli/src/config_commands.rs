use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use sharebridge_config::{ShareConfig, validate::Severity};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the config file that would be used.
    Path,
}

pub fn handle_config(
    action: ConfigAction,
    config: &ShareConfig,
    source: Option<&Path>,
) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(config, source, verbose),
        ConfigAction::Path => {
            let path = source
                .map(Path::to_path_buf)
                .unwrap_or_else(sharebridge_config::find_or_default_config_path);
            println!("{}", path.display());
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &ShareConfig, source: Option<&Path>, verbose: bool) -> Result<()> {
    let result = sharebridge_config::validate::validate(config);

    match source {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults and environment.\n"),
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}
