//! cinder-volume manager library
//!
//! Validates the operator options of a packaged cinder-volume service, renders
//! them into its configuration files and restarts the service only when those
//! files changed.

pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod orchestrator;
pub mod paths;
pub mod render;
pub mod services;
pub mod supervisor;
pub mod template;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendCollection, BackendContext};
pub use config::{ConfigSource, Configuration, RawOptions, SnapctlConfig, validate};
pub use error::{CinderError, Result, ValidationError, ValidationIssue};
pub use lifecycle::{CycleContext, CycleKind, LifecycleStage, LifecycleTransitionError};
pub use orchestrator::{CinderVolume, CycleReport, ServiceAction, ServiceOutcome};
pub use paths::{PathProvider, SnapPaths};
pub use render::{ChangedFiles, Renderer, TemplateSearch};
pub use services::ServiceDescriptor;
pub use supervisor::{ServiceHandle, ServiceSupervisor, SnapctlSupervisor};
pub use template::{Directory, Template};
pub use types::{BackendFamily, Location};
