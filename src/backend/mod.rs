//! Backend context providers
//!
//! One implementation per storage family. Each backend publishes two views of
//! its settings: the full context used for its own dedicated files, and a
//! summary embedded in the shared `cinder.conf`.

pub mod ceph;
pub mod collection;
pub mod dellsc;
pub mod hitachi;
pub mod pure;

use serde::Serialize;
use serde_json::Value;

use crate::context::Namespace;
use crate::error::{CinderError, Result};
use crate::paths::PathProvider;
use crate::template::{Directory, Template};
use crate::types::BackendFamily;

pub use ceph::CephBackend;
pub use collection::BackendCollection;
pub use dellsc::DellScBackend;
pub use hitachi::HitachiBackend;
pub use pure::PureBackend;

/// Namespace of the shared backend view
pub const CINDER_BACKENDS_NAMESPACE: &str = "cinder_backends";
/// Namespace of a SAN backend's full context while its files render
pub const BACKEND_NAMESPACE: &str = "backend_ctx";

/// Fragment directory holding one stanza file per SAN backend
pub const CINDER_CONF_D: &str = "etc/cinder/cinder.conf.d";
pub const CINDER_SSL: &str = "etc/cinder/ssl";

/// Context keys whose values are built here and refer to `snap_paths`.
///
/// Only these are rendered as expressions; operator values are published
/// verbatim.
pub const GENERATED_PATH_KEYS: &[&str] = &["rbd_ceph_conf", "driver_ssl_cert_path"];

pub trait BackendContext {
    fn backend_name(&self) -> &str;

    fn family(&self) -> BackendFamily;

    /// Tag the full context is published under while this backend renders
    fn namespace(&self) -> &str;

    /// Whether cinder may run this backend in active/active cluster mode
    fn supports_cluster(&self) -> bool;

    /// Everything, for this backend's dedicated files
    fn context(&self) -> Namespace;

    /// The part of the settings that also belongs in the shared file
    fn cinder_context(&self) -> Namespace;

    fn directories(&self) -> Vec<Directory> {
        Vec::new()
    }

    fn template_files(&self) -> Vec<Template> {
        Vec::new()
    }

    /// Backend specific provisioning, run before templates render
    fn setup(&self, _paths: &dyn PathProvider) -> Result<()> {
        Ok(())
    }
}

/// Flatten a backend schema into template-ready values.
///
/// Null values are dropped and lists are joined with commas, the form cinder
/// expects for list options.
pub(crate) fn settings_bag<T: Serialize>(settings: &T) -> Result<Namespace> {
    let Value::Object(fields) = serde_json::to_value(settings)? else {
        return Err(CinderError::config("backend settings must serialize to a map"));
    };

    Ok(fields
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::Array(items) => Value::String(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                other => other,
            };
            (key, value)
        })
        .collect())
}

/// Full context shared by the SAN families: driver, name, settings and the
/// certificate path when one is configured.
pub(crate) fn stanza_context(
    name: &str,
    volume_driver: &str,
    settings: &Namespace,
    has_ssl_cert: bool,
) -> Namespace {
    let mut context = Namespace::new();
    context.insert("volume_driver".into(), Value::String(volume_driver.to_string()));
    context.insert("backend_name".into(), Value::String(name.to_string()));
    context.extend(settings.clone());
    if has_ssl_cert {
        context.insert(
            "driver_ssl_cert_path".into(),
            Value::String(format!("{{{{ snap_paths.common }}}}/{}/{}.pem", CINDER_SSL, name)),
        );
        context.insert("driver_ssl_cert_verify".into(), Value::Bool(true));
    }
    context
}

/// Stanza file and, with a certificate, the PEM file of a SAN backend.
pub(crate) fn stanza_templates(name: &str, family: BackendFamily, has_ssl_cert: bool) -> Vec<Template> {
    let mut templates = vec![
        Template::common(format!("{}.conf", name), CINDER_CONF_D)
            .with_template_name("backend.conf.j2")
            .for_family(family),
    ];
    if has_ssl_cert {
        templates.push(
            Template::common(format!("{}.pem", name), CINDER_SSL)
                .with_template_name("backend.pem.j2")
                .with_mode(0o600)
                .for_family(family),
        );
    }
    templates
}

pub(crate) fn stanza_directories(has_ssl_cert: bool) -> Vec<Directory> {
    let mut directories = vec![Directory::common(CINDER_CONF_D)];
    if has_ssl_cert {
        directories.push(Directory::common(CINDER_SSL));
    }
    directories
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_bag_drops_nulls_and_joins_lists() {
        let bag = settings_bag(&json!({
            "a": null,
            "b": ["10.0.0.0/24", "10.1.0.0/24"],
            "c": 4096,
            "d": true
        }))
        .unwrap();
        assert!(!bag.contains_key("a"));
        assert_eq!(bag["b"], json!("10.0.0.0/24,10.1.0.0/24"));
        assert_eq!(bag["c"], json!(4096));
        assert_eq!(bag["d"], json!(true));
    }

    #[test]
    fn test_stanza_context_with_certificate() {
        let settings = settings_bag(&json!({"san_ip": "10.0.0.1"})).unwrap();
        let ctx = stanza_context("array1", "x.Driver", &settings, true);
        assert_eq!(ctx["volume_driver"], json!("x.Driver"));
        assert_eq!(ctx["backend_name"], json!("array1"));
        assert_eq!(
            ctx["driver_ssl_cert_path"],
            json!("{{ snap_paths.common }}/etc/cinder/ssl/array1.pem")
        );
        assert_eq!(ctx["driver_ssl_cert_verify"], json!(true));

        let ctx = stanza_context("array1", "x.Driver", &settings, false);
        assert!(!ctx.contains_key("driver_ssl_cert_path"));
    }

    #[test]
    fn test_stanza_templates() {
        let templates = stanza_templates("array1", BackendFamily::Pure, true);
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].rel_path().to_str(), Some("etc/cinder/cinder.conf.d/array1.conf"));
        assert_eq!(templates[1].rel_path().to_str(), Some("etc/cinder/ssl/array1.pem"));
        assert_eq!(templates[1].mode, 0o600);
        assert_eq!(stanza_templates("array1", BackendFamily::Pure, false).len(), 1);
        assert_eq!(stanza_directories(true).len(), 2);
    }
}
