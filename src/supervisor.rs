//! Process supervisor seam.
//!
//! The manager never spawns long-running daemons from a hook; it asks the
//! supervisor (snapd, through `snapctl`) to start or restart them.

use std::collections::BTreeMap;
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{CinderError, Result};

/// A service known to the supervisor.
pub trait ServiceHandle {
    /// Start the service; a no-op when it already runs
    fn start(&self) -> Result<()>;

    fn restart(&self) -> Result<()>;
}

pub trait ServiceSupervisor {
    /// Services of this package keyed by their short name
    fn list(&self) -> Result<BTreeMap<String, Box<dyn ServiceHandle>>>;
}

/// Supervisor backed by `snapctl services|start|restart`.
#[derive(Debug, Clone)]
pub struct SnapctlSupervisor {
    program: String,
}

impl SnapctlSupervisor {
    pub fn new() -> Self {
        Self::with_program("snapctl")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SnapctlSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

fn run_snapctl(program: &str, args: &[&str]) -> Result<String> {
    debug!("Running {} {}", program, args.join(" "));
    Command::new(program)
        .args(args)
        .output()
        .map_err(|e| CinderError::service(format!("Failed to run {}: {}", program, e)))
        .and_then(|output| {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                Err(CinderError::service(format!(
                    "{} {} failed: {}",
                    program,
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr).trim()
                )))
            }
        })
}

/// Parse `snapctl services` output into `(short name, full name)` pairs.
///
/// ```text
/// Service                      Startup  Current  Notes
/// cinder-volume.cinder-volume  enabled  active   -
/// ```
pub fn parse_services(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(|full| {
            let short = full.split_once('.').map(|(_, app)| app).unwrap_or(full);
            (short.to_string(), full.to_string())
        })
        .collect()
}

struct SnapctlService {
    program: String,
    name: String,
}

impl ServiceHandle for SnapctlService {
    fn start(&self) -> Result<()> {
        run_snapctl(&self.program, &["start", &self.name]).map(|_| ())
    }

    fn restart(&self) -> Result<()> {
        run_snapctl(&self.program, &["restart", &self.name]).map(|_| ())
    }
}

impl ServiceSupervisor for SnapctlSupervisor {
    fn list(&self) -> Result<BTreeMap<String, Box<dyn ServiceHandle>>> {
        let output = run_snapctl(&self.program, &["services"])?;
        let services = parse_services(&output);
        if services.is_empty() {
            warn!("{} services reported no services", self.program);
        }

        Ok(services
            .into_iter()
            .map(|(short, full)| {
                let handle: Box<dyn ServiceHandle> = Box::new(SnapctlService {
                    program: self.program.clone(),
                    name: full,
                });
                (short, handle)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_services() {
        let output = "Service                        Startup  Current   Notes\n\
                      cinder-volume.cinder-volume    enabled  inactive  -\n\
                      cinder-volume.other            disabled inactive  -\n";
        let services = parse_services(output);
        assert_eq!(
            services,
            vec![
                ("cinder-volume".to_string(), "cinder-volume.cinder-volume".to_string()),
                ("other".to_string(), "cinder-volume.other".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_services_empty() {
        assert!(parse_services("").is_empty());
        assert!(parse_services("Service  Startup  Current  Notes\n").is_empty());
    }

    #[test]
    fn test_missing_program_is_service_error() {
        let supervisor = SnapctlSupervisor::with_program("/nonexistent/snapctl");
        let err = supervisor.list().err().unwrap();
        assert!(matches!(err, CinderError::Service(_)));
    }
}
