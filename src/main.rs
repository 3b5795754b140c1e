//! cinder-volume - main entry point
//!
//! Dispatches the snap hooks, offline validation and the service runner.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use tracing::{error, info};

use cinder_volume::cli::{Cli, Commands};
use cinder_volume::config::{self, ConfigSource, RawOptions, SnapctlConfig};
use cinder_volume::paths::{PathProvider, SnapPaths};
use cinder_volume::render::{Renderer, TemplateSearch};
use cinder_volume::types::Location;
use cinder_volume::{CinderVolume, SnapctlSupervisor, logging, services};

/// Log file of the install and configure hooks, under the common root
const HOOK_LOG: &str = "hooks.log";

fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    match &cli.command {
        Commands::Validate { file } => validate_file(file),
        Commands::Install | Commands::Configure => run_hook(&cli).map(|_| ExitCode::SUCCESS),
        Commands::Run { service } => run_service(service),
    }
}

fn option_source(cli: &Cli) -> Result<Box<dyn ConfigSource>> {
    match &cli.options {
        Some(path) => {
            let options = RawOptions::load_from_file(path)?;
            Ok(Box::new(options))
        }
        None => Ok(Box::new(SnapctlConfig::new())),
    }
}

fn run_hook(cli: &Cli) -> Result<()> {
    let paths = SnapPaths::from_env().context("Snap environment not available")?;
    logging::setup_logging(&paths.location(Location::Common).join(HOOK_LOG))
        .context("Failed to set up hook logging")?;

    let source = option_source(cli)?;
    let supervisor = SnapctlSupervisor::new();
    let mut search = TemplateSearch::for_paths(&paths);
    if let Some(dir) = &cli.templates {
        search = search.with_bundled_dir(dir);
    }
    let manager = CinderVolume::new(&paths, &supervisor).with_renderer(Renderer::new(search));

    let result = match cli.command {
        Commands::Install => {
            info!("Running install hook");
            manager.install_hook(source.as_ref())
        }
        _ => {
            info!("Running configure hook");
            manager.configure_hook(source.as_ref())
        }
    };
    if let Err(e) = result {
        error!("Hook failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}

fn validate_file(file: &Path) -> Result<ExitCode> {
    logging::setup_stderr_logging();
    info!("Validating options file: {}", file.display());

    let options = RawOptions::load_from_file(file)?;
    match config::validate(&options) {
        Ok(config) => {
            let names: Vec<&str> = config.backends().map(|(name, _)| name).collect();
            println!(
                "✓ Configuration is valid: {} backend(s) [{}]",
                names.len(),
                names.join(", ")
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("✗ Configuration is invalid:");
            for issue in &e.issues {
                eprintln!("  - {}", issue);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_service(name: &str) -> Result<ExitCode> {
    let service = services::find(name).ok_or_else(|| anyhow!("Unknown service: {}", name))?;
    let paths = SnapPaths::from_env().context("Snap environment not available")?;
    logging::setup_logging(&service.log_file(&paths)).context("Failed to set up service logging")?;

    let code = service.run(&paths)?;
    // exit codes beyond u8 cannot be reported as-is
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
