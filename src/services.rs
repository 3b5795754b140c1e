//! Daemons shipped in the package and the files they read.

use std::ffi::OsString;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::{CinderError, Result};
use crate::paths::PathProvider;
use crate::types::Location;

/// Static description of one daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Name the supervisor knows the service by
    pub name: &'static str,
    /// Executable relative to the install root
    pub executable: PathBuf,
    /// Files passed with `--config-file`, relative to the common root
    pub configuration_files: Vec<PathBuf>,
    /// Directories passed with `--config-dir`, relative to the common root
    pub configuration_directories: Vec<PathBuf>,
    pub extra_args: Vec<String>,
}

impl ServiceDescriptor {
    /// Returns true if a change to `path` requires a restart of this service
    pub fn watches(&self, path: &Path) -> bool {
        self.configuration_files.iter().any(|file| file == path)
            || self
                .configuration_directories
                .iter()
                .any(|dir| path.starts_with(dir))
    }

    /// Program and arguments used to launch the daemon
    pub fn command_line(&self, paths: &dyn PathProvider) -> (PathBuf, Vec<OsString>) {
        let common = paths.location(Location::Common);
        let mut args: Vec<OsString> = Vec::new();
        for file in &self.configuration_files {
            args.push("--config-file".into());
            args.push(common.join(file).into_os_string());
        }
        for dir in &self.configuration_directories {
            args.push("--config-dir".into());
            args.push(common.join(dir).into_os_string());
        }
        args.extend(self.extra_args.iter().map(OsString::from));

        (paths.install_root().join(&self.executable), args)
    }

    /// `<common>/<executable>-<package>.log`
    pub fn log_file(&self, paths: &dyn PathProvider) -> PathBuf {
        let executable = self
            .executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.to_string());
        paths
            .location(Location::Common)
            .join(format!("{}-{}.log", executable, paths.package_name()))
    }

    /// Run the daemon in the foreground and return its exit code.
    pub fn run(&self, paths: &dyn PathProvider) -> Result<i32> {
        let (program, args) = self.command_line(paths);
        info!("Starting {}", program.display());

        let status = Command::new(&program)
            .args(&args)
            .status()
            .map_err(|e| CinderError::service(format!("Failed to start {}: {}", program.display(), e)))?;

        // killed by a signal: report it the way a shell would
        let code = status.code().unwrap_or(128 + signal_of(&status));
        info!("Exiting with code {}", code);
        Ok(code)
    }
}

fn signal_of(status: &std::process::ExitStatus) -> i32 {
    status.signal().unwrap_or(0)
}

/// The cinder-volume daemon
pub fn cinder_volume() -> ServiceDescriptor {
    ServiceDescriptor {
        name: "cinder-volume",
        executable: PathBuf::from("usr/bin/cinder-volume"),
        configuration_files: vec![
            PathBuf::from("etc/cinder/cinder.conf"),
            PathBuf::from("etc/cinder/rootwrap.conf"),
        ],
        configuration_directories: vec![PathBuf::from("etc/cinder/cinder.conf.d")],
        extra_args: Vec::new(),
    }
}

/// Every service of the package
pub fn services() -> Vec<ServiceDescriptor> {
    vec![cinder_volume()]
}

pub fn find(name: &str) -> Option<ServiceDescriptor> {
    services().into_iter().find(|service| service.name == name)
}
