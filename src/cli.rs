use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cinder-volume - configuration and lifecycle manager
#[derive(Parser, Debug)]
#[command(name = "cinder-volume")]
#[command(about = "Validates cinder-volume options, renders its configuration and manages the service")]
#[command(version)]
pub struct Cli {
    /// Read options from a JSON file instead of `snapctl get`.
    ///
    /// Nested, dotted (`ceph.ceph1.rbd-pool`) and section-prefixed
    /// (`database-url`) keys are all accepted.
    #[arg(long, global = true)]
    pub options: Option<PathBuf>,

    /// Directory of bundled templates (defaults to `$SNAP/templates`)
    #[arg(long, global = true)]
    pub templates: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Install hook: create directories and render what the options allow
    Install,
    /// Configure hook: validate, render and restart changed services
    Configure,
    /// Validate an options file and print the resulting configuration
    Validate {
        /// Path to the JSON options file
        file: PathBuf,
    },
    /// Run a service in the foreground
    Run {
        /// Service name (e.g. cinder-volume)
        service: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
