//! Aggregate of every enabled backend for one configure cycle.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::debug;

use super::{BackendContext, CephBackend, DellScBackend, HitachiBackend, PureBackend};
use crate::config::Configuration;
use crate::error::{CinderError, Result};
use crate::paths::PathProvider;
use crate::template::{Directory, Template};

pub struct BackendCollection {
    enabled_backends: Vec<String>,
    contexts: BTreeMap<String, Box<dyn BackendContext>>,
}

impl std::fmt::Debug for BackendCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCollection")
            .field("enabled_backends", &self.enabled_backends)
            .finish()
    }
}

impl BackendCollection {
    /// Fails when nothing is enabled or an enabled backend has no context.
    pub fn new(
        enabled_backends: Vec<String>,
        contexts: BTreeMap<String, Box<dyn BackendContext>>,
    ) -> Result<Self> {
        if enabled_backends.is_empty() {
            return Err(CinderError::config("At least one backend must be enabled"));
        }

        let missing: BTreeSet<&str> = enabled_backends
            .iter()
            .map(String::as_str)
            .filter(|name| !contexts.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(CinderError::config(format!(
                "Context missing configuration for backends: {}",
                missing.into_iter().collect::<Vec<_>>().join(", ")
            )));
        }

        Ok(Self {
            enabled_backends,
            contexts,
        })
    }

    /// One context per configured backend, family by family.
    pub fn build(config: &Configuration) -> Result<Self> {
        let mut enabled = Vec::new();
        let mut contexts: BTreeMap<String, Box<dyn BackendContext>> = BTreeMap::new();

        let mut add = |context: Box<dyn BackendContext>| -> Result<()> {
            let name = context.backend_name().to_string();
            debug!("Enabling {} backend {}", context.family(), name);
            if contexts.insert(name.clone(), context).is_some() {
                return Err(CinderError::config(format!(
                    "Backend {} is configured more than once",
                    name
                )));
            }
            enabled.push(name);
            Ok(())
        };

        for (name, backend) in &config.ceph {
            add(Box::new(CephBackend::new(name.as_str(), backend)?))?;
        }
        for (name, backend) in &config.hitachi {
            add(Box::new(HitachiBackend::new(name.as_str(), backend)?))?;
        }
        for (name, backend) in &config.pure {
            add(Box::new(PureBackend::new(name.as_str(), backend)?))?;
        }
        for (name, backend) in &config.dellsc {
            add(Box::new(DellScBackend::new(name.as_str(), backend)?))?;
        }

        Self::new(enabled, contexts)
    }

    pub fn enabled_backends(&self) -> &[String] {
        &self.enabled_backends
    }

    pub fn get(&self, name: &str) -> Option<&dyn BackendContext> {
        self.contexts.get(name).map(|context| context.as_ref())
    }

    /// Backends in enabled order
    pub fn contexts(&self) -> impl Iterator<Item = &dyn BackendContext> {
        self.enabled_backends.iter().filter_map(|name| self.get(name))
    }

    /// True when every backend can run in a cinder cluster
    pub fn cluster_ok(&self) -> bool {
        self.contexts().all(|context| context.supports_cluster())
    }

    /// Directories every backend declared
    pub fn directories(&self) -> Vec<Directory> {
        self.contexts().flat_map(|c| c.directories()).collect()
    }

    /// Templates every backend declared
    pub fn template_files(&self) -> Vec<Template> {
        self.contexts().flat_map(|c| c.template_files()).collect()
    }

    pub fn setup(&self, paths: &dyn PathProvider) -> Result<()> {
        for context in self.contexts() {
            debug!("Setting up backend {}", context.backend_name());
            context.setup(paths)?;
        }
        Ok(())
    }

    /// View published under `cinder_backends` for the shared file.
    pub fn context(&self) -> Value {
        let contexts: Map<String, Value> = self
            .contexts()
            .map(|c| (c.backend_name().to_string(), Value::Object(c.cinder_context())))
            .collect();

        let mut view = Map::new();
        view.insert(
            "enabled_backends".into(),
            Value::String(self.enabled_backends.join(",")),
        );
        view.insert("cluster_ok".into(), Value::Bool(self.cluster_ok()));
        view.insert("contexts".into(), Value::Object(contexts));
        Value::Object(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate_value;
    use crate::context::Namespace;
    use crate::types::BackendFamily;
    use serde_json::json;

    struct Stub {
        name: String,
        cluster: bool,
    }

    impl BackendContext for Stub {
        fn backend_name(&self) -> &str {
            &self.name
        }

        fn family(&self) -> BackendFamily {
            BackendFamily::Pure
        }

        fn namespace(&self) -> &str {
            "backend_ctx"
        }

        fn supports_cluster(&self) -> bool {
            self.cluster
        }

        fn context(&self) -> Namespace {
            Namespace::new()
        }

        fn cinder_context(&self) -> Namespace {
            Namespace::new()
        }
    }

    fn stub(name: &str, cluster: bool) -> (String, Box<dyn BackendContext>) {
        (
            name.to_string(),
            Box::new(Stub {
                name: name.to_string(),
                cluster,
            }),
        )
    }

    #[test]
    fn test_empty_collection_fails() {
        let err = BackendCollection::new(Vec::new(), BTreeMap::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: At least one backend must be enabled"
        );
    }

    #[test]
    fn test_missing_context_fails() {
        let contexts = BTreeMap::from([stub("a", true)]);
        let err = BackendCollection::new(vec!["a".into(), "b".into()], contexts).unwrap_err();
        assert!(err.to_string().contains("missing configuration for backends: b"));
    }

    #[test]
    fn test_cluster_ok_folds_capabilities() {
        let all = BackendCollection::new(
            vec!["a".into(), "b".into()],
            BTreeMap::from([stub("a", true), stub("b", true)]),
        )
        .unwrap();
        assert!(all.cluster_ok());

        let mixed = BackendCollection::new(
            vec!["a".into(), "b".into()],
            BTreeMap::from([stub("a", true), stub("b", false)]),
        )
        .unwrap();
        assert!(!mixed.cluster_ok());
        assert_eq!(mixed.context()["cluster_ok"], json!(false));
    }

    #[test]
    fn test_build_from_configuration() {
        let config = validate_value(json!({
            "database-url": "sqlite:///x",
            "rabbitmq-url": "amqp://y",
            "cinder-project-id": "p",
            "cinder-user-id": "u",
            "ceph": {"ceph1": {"rbd-pool": "volumes", "rbd-user": "cinder", "rbd-secret-uuid": "abc"}},
            "hitachi": {"vsp": {
                "san-ip": "10.0.0.1", "san-login": "a", "san-password": "b",
                "hitachi-storage-id": "1", "hitachi-pools": "p0"
            }}
        }))
        .unwrap();

        let collection = BackendCollection::build(&config).unwrap();
        assert_eq!(collection.enabled_backends(), ["ceph1", "vsp"]);
        assert!(!collection.cluster_ok());

        let view = collection.context();
        assert_eq!(view["enabled_backends"], json!("ceph1,vsp"));
        assert_eq!(view["contexts"]["vsp"], json!({}));
        assert_eq!(view["contexts"]["ceph1"]["rbd_pool"], json!("volumes"));

        let dirs: Vec<String> = collection
            .directories()
            .iter()
            .map(|d| d.path.display().to_string())
            .collect();
        assert_eq!(dirs, vec!["etc/ceph", "etc/cinder/cinder.conf.d"]);
        assert_eq!(collection.template_files().len(), 3);
    }

    #[test]
    fn test_build_without_backends_fails() {
        let config = validate_value(json!({
            "database-url": "sqlite:///x",
            "rabbitmq-url": "amqp://y",
            "cinder-project-id": "p",
            "cinder-user-id": "u"
        }))
        .unwrap();
        let err = BackendCollection::build(&config).unwrap_err();
        assert!(err.is_configuration_error());
    }
}
