//! Filesystem roots provided by the snap runtime.
//!
//! The manager never discovers these itself: it renders them verbatim into the
//! `snap_paths` namespace and resolves every declared file and directory
//! against them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CinderError, Result};
use crate::types::Location;

/// Source of the named filesystem roots.
pub trait PathProvider {
    /// Every named root, keyed by name
    fn roots(&self) -> BTreeMap<&'static str, PathBuf>;

    /// Root directory backing a location class
    fn location(&self, location: Location) -> &Path;

    /// Install root holding the read-only payload (executables, bundled templates)
    fn install_root(&self) -> &Path;

    /// Name of the package, used to derive log file names
    fn package_name(&self) -> &str;
}

/// Paths exposed to a snap through its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapPaths {
    pub name: String,
    pub snap: PathBuf,
    pub common: PathBuf,
    pub data: PathBuf,
    pub user_common: PathBuf,
    pub user_data: PathBuf,
}

impl SnapPaths {
    /// Read the roots from the `SNAP*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| CinderError::config(format!("{} is not set", key)))
        };
        let optional = |key: &str, fallback: &str| -> PathBuf {
            lookup(key)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(fallback))
        };

        let common = required("SNAP_COMMON")?;
        let data = required("SNAP_DATA")?;
        Ok(Self {
            name: lookup("SNAP_INSTANCE_NAME")
                .or_else(|| lookup("SNAP_NAME"))
                .unwrap_or_else(|| "cinder-volume".to_string()),
            snap: PathBuf::from(required("SNAP")?),
            user_common: optional("SNAP_USER_COMMON", &common),
            user_data: optional("SNAP_USER_DATA", &data),
            common: PathBuf::from(common),
            data: PathBuf::from(data),
        })
    }

    /// Lay every root out under one base directory (tests, local runs).
    pub fn under(base: &Path, install_root: &Path) -> Self {
        Self {
            name: "cinder-volume".to_string(),
            snap: install_root.to_path_buf(),
            common: base.join("common"),
            data: base.join("data"),
            user_common: base.join("user_common"),
            user_data: base.join("user_data"),
        }
    }
}

impl PathProvider for SnapPaths {
    fn roots(&self) -> BTreeMap<&'static str, PathBuf> {
        BTreeMap::from([
            ("snap", self.snap.clone()),
            ("common", self.common.clone()),
            ("data", self.data.clone()),
            ("user_common", self.user_common.clone()),
            ("user_data", self.user_data.clone()),
        ])
    }

    fn location(&self, location: Location) -> &Path {
        match location {
            Location::Common => &self.common,
            Location::Data => &self.data,
        }
    }

    fn install_root(&self) -> &Path {
        &self.snap
    }

    fn package_name(&self) -> &str {
        &self.name
    }
}
