//! Error handling for the cinder-volume manager
//!
//! Every fallible library operation returns [`CinderError`]. The variants follow
//! the configure cycle: schema problems surface as [`ValidationError`], a
//! structurally valid but unusable configuration as `Config`, and rendering
//! problems as `TemplateNotFound`, `RenderContext` or `Template`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One problem found while validating raw options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted location of the offending value (`ceph.ceph1.rbd_pool`), empty for
    /// problems that concern the document as a whole.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Aggregated schema failure.
///
/// Validation reports every issue it found in a single error so that an
/// operator can fix a configuration in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid configuration: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue::new(path, message)],
        }
    }

    /// Returns true if any issue message or path mentions `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.path.contains(needle) || issue.message.contains(needle))
    }
}

/// Main error type for the cinder-volume manager
#[derive(Error, Debug)]
pub enum CinderError {
    /// Malformed, out-of-range or duplicate configuration
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Structurally valid configuration that cannot be used (no backends, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No template source matched either naming convention
    #[error("Template {name} not found (searched {})", display_paths(.searched))]
    TemplateNotFound { name: String, searched: Vec<PathBuf> },

    /// A context provider failed while the render namespace was assembled
    #[error("Render context error: {0}")]
    RenderContext(String),

    /// Template syntax or substitution failure
    #[error("Template {name} failed to render: {reason}")]
    Template { name: String, reason: String },

    /// Service supervisor failures (snapctl, daemon spawn)
    #[error("Service error: {0}")]
    Service(String),

    /// Lifecycle state machine transition errors
    #[error("Lifecycle transition error: {0}")]
    LifecycleTransition(String),

    /// IO errors (directories, rendered files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for cinder-volume operations
pub type Result<T> = std::result::Result<T, CinderError>;

// Convenient error constructors
impl CinderError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a render context error
    pub fn render_context(msg: impl Into<String>) -> Self {
        Self::RenderContext(msg.into())
    }

    /// Create a service error
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// Create a lifecycle transition error
    pub fn lifecycle_transition(msg: impl Into<String>) -> Self {
        Self::LifecycleTransition(msg.into())
    }

    /// Wrap a tera failure, keeping the whole cause chain in the message
    pub fn template(name: impl Into<String>, err: &tera::Error) -> Self {
        let mut reason = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            reason.push_str(": ");
            reason.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Template {
            name: name.into(),
            reason,
        }
    }

    /// Errors an operator can fix by changing the configuration.
    ///
    /// Hooks log these as incomplete configuration instead of failing.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Config(_))
    }
}
