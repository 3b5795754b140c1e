//! Render namespace providers.
//!
//! A provider publishes one JSON value under one namespace tag. The
//! orchestrator asks every provider in turn and merges the results into the
//! single namespace templates are rendered against.

use serde_json::{Map, Value};

use crate::config::{self, Configuration};
use crate::error::{CinderError, Result};
use crate::paths::PathProvider;

/// Namespace tag → published value
pub type Namespace = Map<String, Value>;

/// Namespace holding the filesystem roots
pub const SNAP_PATHS_NAMESPACE: &str = "snap_paths";

pub trait ContextProvider {
    fn namespace(&self) -> &str;

    fn context(&self) -> Result<Value>;
}

/// Publishes every named root of a path provider.
pub struct PathContext<'a> {
    paths: &'a dyn PathProvider,
}

impl<'a> PathContext<'a> {
    pub fn new(paths: &'a dyn PathProvider) -> Self {
        Self { paths }
    }
}

impl ContextProvider for PathContext<'_> {
    fn namespace(&self) -> &str {
        SNAP_PATHS_NAMESPACE
    }

    fn context(&self) -> Result<Value> {
        let roots = self
            .paths
            .roots()
            .into_iter()
            .map(|(name, path)| (name.to_string(), Value::String(path.display().to_string())))
            .collect();
        Ok(Value::Object(roots))
    }
}

/// Republishes one validated configuration section under its own name.
#[derive(Debug, Clone)]
pub struct ConfigContext {
    namespace: String,
    config: Value,
}

impl ConfigContext {
    pub fn new(namespace: impl Into<String>, config: Value) -> Self {
        Self {
            namespace: namespace.into(),
            config,
        }
    }

    /// One provider per top-level section of `config`
    pub fn from_configuration(config: &Configuration) -> Result<Vec<Self>> {
        let sections = config::section_views(config)?;
        Ok(sections
            .into_iter()
            .map(|(name, value)| Self::new(name, value))
            .collect())
    }
}

impl ContextProvider for ConfigContext {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn context(&self) -> Result<Value> {
        Ok(self.config.clone())
    }
}

/// Merge every provider into one namespace.
///
/// Any provider failure is reported as a render context error.
pub fn assemble(providers: &[&dyn ContextProvider]) -> Result<Namespace> {
    let mut namespace = Namespace::new();
    for provider in providers {
        tracing::debug!("Adding context: {}", provider.namespace());
        let value = provider.context().map_err(|e| {
            CinderError::render_context(format!("{} context failed: {}", provider.namespace(), e))
        })?;
        namespace.insert(provider.namespace().to_string(), value);
    }
    Ok(namespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::SnapPaths;
    use serde_json::json;
    use std::path::Path;

    struct Failing;

    impl ContextProvider for Failing {
        fn namespace(&self) -> &str {
            "broken"
        }

        fn context(&self) -> Result<Value> {
            Err(CinderError::config("upstream unavailable"))
        }
    }

    #[test]
    fn test_path_context_lists_roots() {
        let paths = SnapPaths::under(Path::new("/base"), Path::new("/snap/cinder-volume/x1"));
        let ctx = PathContext::new(&paths);
        assert_eq!(ctx.namespace(), "snap_paths");
        let value = ctx.context().unwrap();
        assert_eq!(value["common"], json!("/base/common"));
        assert_eq!(value["snap"], json!("/snap/cinder-volume/x1"));
    }

    #[test]
    fn test_assemble_merges_providers() {
        let a = ConfigContext::new("database", json!({"url": "sqlite://"}));
        let b = ConfigContext::new("rabbitmq", json!({"url": "amqp://"}));
        let providers: [&dyn ContextProvider; 2] = [&a, &b];
        let ns = assemble(&providers).unwrap();
        assert_eq!(ns["database"]["url"], json!("sqlite://"));
        assert_eq!(ns.len(), 2);
    }

    #[test]
    fn test_assemble_reports_failing_provider() {
        let a = ConfigContext::new("database", json!({}));
        let providers: [&dyn ContextProvider; 2] = [&a, &Failing];
        let err = assemble(&providers).unwrap_err();
        assert!(matches!(err, CinderError::RenderContext(_)));
        assert!(err.to_string().contains("broken context failed"));
    }
}
