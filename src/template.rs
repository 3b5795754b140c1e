//! Declarations of rendered files and created directories.

use std::path::{Path, PathBuf};

use crate::types::{BackendFamily, Location};

pub const DEFAULT_DIRECTORY_MODE: u32 = 0o750;
pub const DEFAULT_FILE_MODE: u32 = 0o640;

/// Marker suffix carried by template sources and stripped from outputs
pub const TEMPLATE_SUFFIX: &str = ".j2";

/// A directory to create under one of the writable roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub path: PathBuf,
    pub mode: u32,
    pub location: Location,
}

impl Directory {
    pub fn common(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: DEFAULT_DIRECTORY_MODE,
            location: Location::Common,
        }
    }
}

/// A file rendered from a template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Output filename; a trailing `.j2` is stripped
    pub filename: String,
    /// Destination directory relative to the location root
    pub dest: PathBuf,
    pub mode: u32,
    /// Source name when it differs from `filename`
    pub template_name: Option<String>,
    pub location: Location,
    /// Family whose bundled directory is searched first
    pub family: Option<BackendFamily>,
}

impl Template {
    pub fn common(filename: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            dest: dest.into(),
            mode: DEFAULT_FILE_MODE,
            template_name: None,
            location: Location::Common,
            family: None,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_template_name(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }

    pub fn for_family(mut self, family: BackendFamily) -> Self {
        self.family = Some(family);
        self
    }

    /// Name looked up on the template search path
    pub fn source_name(&self) -> &str {
        self.template_name.as_deref().unwrap_or(&self.filename)
    }

    /// Final filename on disk
    pub fn output_name(&self) -> &str {
        self.filename
            .strip_suffix(TEMPLATE_SUFFIX)
            .unwrap_or(&self.filename)
    }

    /// Output path relative to its location root
    pub fn rel_path(&self) -> PathBuf {
        self.dest.join(self.output_name())
    }

    /// Output path under `root`
    pub fn path_under(&self, root: &Path) -> PathBuf {
        root.join(self.rel_path())
    }
}
