//! Raw option input.
//!
//! Options reach the manager either as a nested JSON document or as flat
//! dotted keys (`ceph.ceph1.rbd-pool`). Core sections additionally accept a
//! section-prefixed key (`database-url`). Everything is folded into one nested
//! tree before schema validation.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result as AnyResult};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CinderError, Result, ValidationError};

use super::naming::to_snake;

/// Sections that may be addressed with a prefixed flat key
const PREFIXED_SECTIONS: &[&str] = &["settings", "database", "rabbitmq", "cinder"];

/// Unvalidated option tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOptions {
    tree: Map<String, Value>,
}

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object whose keys may be nested sections, dotted
    /// paths or prefixed keys, in any mix.
    pub fn from_value(value: Value) -> std::result::Result<Self, ValidationError> {
        let Value::Object(entries) = value else {
            return Err(ValidationError::single("", "options must be a JSON object"));
        };
        Self::from_flat(entries)
    }

    /// Build from `(key, value)` pairs.
    pub fn from_flat<I, K>(entries: I) -> std::result::Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut options = Self::new();
        for (key, value) in entries {
            options.set(key.as_ref(), value)?;
        }
        Ok(options)
    }

    /// Load options from a JSON file.
    pub fn load_from_file(path: &Path) -> AnyResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file: {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse options file: {}", path.display()))?;
        let options = Self::from_value(value)
            .with_context(|| format!("Malformed options file: {}", path.display()))?;
        debug!("Loaded options from {}", path.display());
        Ok(options)
    }

    /// Insert one value at a flat key, merging objects with what is present.
    pub fn set(&mut self, key: &str, value: Value) -> std::result::Result<(), ValidationError> {
        let segments = split_key(key);
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ValidationError::single(key, "empty segment in option key"));
        }

        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => return Err(ValidationError::single(key, "empty option key")),
        };

        let mut node = &mut self.tree;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = node
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match entry {
                Value::Object(inner) => inner,
                _ => {
                    return Err(ValidationError::single(
                        segments[..=depth].join("."),
                        "is a value and cannot also hold nested options",
                    ));
                }
            };
        }

        match node.get_mut(leaf) {
            Some(existing) => merge(existing, value, key),
            None => {
                node.insert(leaf.clone(), value);
                Ok(())
            }
        }
    }

    /// Keep only the given top-level sections, in either spelling.
    pub fn select(&self, sections: &[&str]) -> Self {
        let tree = self
            .tree
            .iter()
            .filter(|(key, _)| sections.contains(&to_snake(key).as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self { tree }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.tree
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.tree)
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

/// Split a flat key into its path segments.
fn split_key(key: &str) -> Vec<String> {
    if key.contains('.') {
        return key.split('.').map(str::to_string).collect();
    }

    for section in PREFIXED_SECTIONS {
        for separator in ['-', '_'] {
            if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix(separator)) {
                if !rest.is_empty() {
                    return vec![section.to_string(), rest.to_string()];
                }
            }
        }
    }

    vec![key.to_string()]
}

fn merge(existing: &mut Value, incoming: Value, key: &str) -> std::result::Result<(), ValidationError> {
    match (existing, incoming) {
        (Value::Object(current), Value::Object(extra)) => {
            for (child, value) in extra {
                match current.get_mut(&child) {
                    Some(slot) => merge(slot, value, &format!("{}.{}", key, child))?,
                    None => {
                        current.insert(child, value);
                    }
                }
            }
            Ok(())
        }
        (current, incoming) if *current == incoming => Ok(()),
        _ => Err(ValidationError::single(key, "given more than once with different values")),
    }
}

/// Source of raw options.
pub trait ConfigSource {
    /// Options restricted to the named top-level sections
    fn options(&self, sections: &[&str]) -> Result<RawOptions>;
}

impl ConfigSource for RawOptions {
    fn options(&self, sections: &[&str]) -> Result<RawOptions> {
        Ok(self.select(sections))
    }
}

/// Reads options from the snap configuration store through `snapctl`.
#[derive(Debug, Clone)]
pub struct SnapctlConfig {
    program: String,
}

impl SnapctlConfig {
    pub fn new() -> Self {
        Self {
            program: "snapctl".to_string(),
        }
    }

    /// Use a different binary (tests, non-snap environments)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SnapctlConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for SnapctlConfig {
    fn options(&self, sections: &[&str]) -> Result<RawOptions> {
        let output = Command::new(&self.program)
            .args(["get", "-d"])
            .output()
            .map_err(|e| CinderError::config(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(CinderError::config(format!(
                "{} get failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let value: Value = if stdout.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(&stdout)?
        };
        Ok(RawOptions::from_value(value)?.select(sections))
    }
}
