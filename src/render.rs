//! Template rendering with change detection
//!
//! Sources are resolved on a three-tier search path, rendered with tera
//! against the assembled namespace and written only when the content
//! fingerprint differs from what is already on disk. The set of written paths
//! drives service restarts.

use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tera::{Context, Tera};
use tracing::debug;

use crate::backend::{BackendCollection, GENERATED_PATH_KEYS};
use crate::context::Namespace;
use crate::error::{CinderError, Result};
use crate::paths::PathProvider;
use crate::template::{Template, TEMPLATE_SUFFIX};
use crate::types::{BackendFamily, Location};

/// Location-relative paths written during one render pass
pub type ChangedFiles = BTreeSet<PathBuf>;

/// Directory name of operator overrides under the common root
pub const OVERRIDE_DIR: &str = "templates";

/// Where template sources are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSearch {
    override_dir: PathBuf,
    bundled_dir: PathBuf,
}

impl TemplateSearch {
    pub fn new(override_dir: impl Into<PathBuf>, bundled_dir: impl Into<PathBuf>) -> Self {
        Self {
            override_dir: override_dir.into(),
            bundled_dir: bundled_dir.into(),
        }
    }

    /// Overrides under `<common>/templates`, bundled sources under
    /// `<install root>/templates`.
    pub fn for_paths(paths: &dyn PathProvider) -> Self {
        Self::new(
            paths.location(Location::Common).join(OVERRIDE_DIR),
            paths.install_root().join("templates"),
        )
    }

    pub fn with_bundled_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundled_dir = dir.into();
        self
    }

    /// Directories in lookup order
    pub fn search_path(&self, family: Option<BackendFamily>) -> Vec<PathBuf> {
        let mut path = vec![self.override_dir.clone()];
        if let Some(family) = family {
            path.push(self.bundled_dir.join(family.section()));
        }
        path.push(self.bundled_dir.clone());
        path
    }

    /// Find the source of `template`: the primary name across the whole
    /// search path first, then the `.j2` name.
    pub fn resolve(&self, template: &Template) -> Result<PathBuf> {
        let search_path = self.search_path(template.family);
        let primary = template.source_name().to_string();
        let mut names = vec![primary.clone()];
        if !primary.ends_with(TEMPLATE_SUFFIX) {
            names.push(format!("{}{}", primary, TEMPLATE_SUFFIX));
        }

        for name in &names {
            if let Some(found) = search_path.iter().map(|dir| dir.join(name)).find(|p| p.is_file()) {
                return Ok(found);
            }
            debug!("Template {} not found, trying next name", name);
        }

        Err(CinderError::TemplateNotFound {
            name: primary,
            searched: search_path,
        })
    }
}

/// BLAKE3 fingerprint of rendered content
pub fn fingerprint(content: &[u8]) -> blake3::Hash {
    blake3::hash(content)
}

/// Trim trailing newlines down to exactly one; empty output stays empty.
pub fn normalize_newline(mut rendered: String) -> String {
    let trimmed = rendered.trim_end_matches('\n').len();
    rendered.truncate(trimmed);
    if !rendered.is_empty() {
        rendered.push('\n');
    }
    rendered
}

pub(crate) fn tera_context(namespace: &Namespace) -> Result<Context> {
    Context::from_value(Value::Object(namespace.clone()))
        .map_err(|e| CinderError::render_context(e.to_string()))
}

/// Render the expressions held by generated path keys, at any depth.
///
/// Every other string is left as is, so a password containing `{{` is
/// written out untouched.
pub fn render_embedded(value: Value, context: &Context) -> Result<Value> {
    match value {
        Value::Object(map) => Ok(Value::Object(
            map.into_iter()
                .map(|(key, value)| -> Result<(String, Value)> {
                    let value = match value {
                        Value::String(text) if GENERATED_PATH_KEYS.contains(&key.as_str()) => {
                            Value::String(render_expression(&text, context)?)
                        }
                        Value::String(text) => Value::String(text),
                        other => render_embedded(other, context)?,
                    };
                    Ok((key, value))
                })
                .collect::<Result<_>>()?,
        )),
        Value::Array(items) => Ok(Value::Array(
            items
                .into_iter()
                .map(|v| render_embedded(v, context))
                .collect::<Result<_>>()?,
        )),
        other => Ok(other),
    }
}

fn render_expression(text: &str, context: &Context) -> Result<String> {
    if !text.contains("{{") && !text.contains("{%") {
        return Ok(text.to_string());
    }
    Tera::one_off(text, context, false).map_err(|e| CinderError::template(text, &e))
}

pub struct Renderer {
    search: TemplateSearch,
}

impl Renderer {
    pub fn new(search: TemplateSearch) -> Self {
        Self { search }
    }

    /// Render the core templates, then each backend's own templates with its
    /// full context published under its namespace tag.
    pub fn render(
        &self,
        paths: &dyn PathProvider,
        namespace: &Namespace,
        core: &[Template],
        backends: &BackendCollection,
    ) -> Result<ChangedFiles> {
        let mut changed = ChangedFiles::new();
        let context = tera_context(namespace)?;

        for template in core {
            if self.render_template(paths, template, &context)? {
                changed.insert(template.rel_path());
            }
        }

        for backend in backends.contexts() {
            let full = render_embedded(Value::Object(backend.context()), &context)?;
            let mut scoped = namespace.clone();
            scoped.insert(backend.namespace().to_string(), full);
            let scoped = tera_context(&scoped)?;

            for template in backend.template_files() {
                if self.render_template(paths, &template, &scoped)? {
                    changed.insert(template.rel_path());
                }
            }
        }

        Ok(changed)
    }

    /// Render one template; returns true if the file was written.
    pub fn render_template(
        &self,
        paths: &dyn PathProvider,
        template: &Template,
        context: &Context,
    ) -> Result<bool> {
        let source_path = self.search.resolve(template)?;
        let source = fs::read_to_string(&source_path)?;
        let name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| template.source_name().to_string());

        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_template(&name, &source)
            .map_err(|e| CinderError::template(name.as_str(), &e))?;
        let rendered = tera
            .render(&name, context)
            .map_err(|e| CinderError::template(name.as_str(), &e))?;
        let rendered = normalize_newline(rendered);

        let dest = template.path_under(paths.location(template.location));
        write_if_changed(&dest, rendered.as_bytes(), template.mode)
    }
}

/// Write `content` unless `dest` already holds it; returns true on write.
pub fn write_if_changed(dest: &Path, content: &[u8], mode: u32) -> Result<bool> {
    let new_hash = fingerprint(content);
    if let Ok(existing) = fs::read(dest) {
        if fingerprint(&existing) == new_hash {
            debug!("File {} has not changed, skipping", dest.display());
            return Ok(false);
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    debug!("File {} has changed, writing new content", dest.display());
    fs::write(dest, content)?;
    fs::set_permissions(dest, fs::Permissions::from_mode(mode))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_newline() {
        assert_eq!(normalize_newline("a".into()), "a\n");
        assert_eq!(normalize_newline("a\n\n\n".into()), "a\n");
        assert_eq!(normalize_newline("a\n".into()), "a\n");
        assert_eq!(normalize_newline(String::new()), "");
    }

    #[test]
    fn test_search_path_order() {
        let search = TemplateSearch::new("/common/templates", "/snap/templates");
        assert_eq!(
            search.search_path(Some(BackendFamily::Ceph)),
            vec![
                PathBuf::from("/common/templates"),
                PathBuf::from("/snap/templates/ceph"),
                PathBuf::from("/snap/templates"),
            ]
        );
        assert_eq!(search.search_path(None).len(), 2);
    }

    #[test]
    fn test_resolve_prefers_override_then_suffix() {
        let tmp = TempDir::new().unwrap();
        let overrides = tmp.path().join("overrides");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&overrides).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("cinder.conf.j2"), "bundled").unwrap();

        let search = TemplateSearch::new(&overrides, &bundled);
        let tpl = Template::common("cinder.conf", "etc/cinder");
        assert_eq!(search.resolve(&tpl).unwrap(), bundled.join("cinder.conf.j2"));

        // an override with the suffixed name does not beat a primary-name match
        fs::write(bundled.join("cinder.conf"), "bundled plain").unwrap();
        fs::write(overrides.join("cinder.conf.j2"), "override").unwrap();
        assert_eq!(search.resolve(&tpl).unwrap(), bundled.join("cinder.conf"));

        fs::write(overrides.join("cinder.conf"), "override plain").unwrap();
        assert_eq!(search.resolve(&tpl).unwrap(), overrides.join("cinder.conf"));
    }

    #[test]
    fn test_resolve_missing_template() {
        let tmp = TempDir::new().unwrap();
        let search = TemplateSearch::new(tmp.path().join("a"), tmp.path().join("b"));
        let err = search
            .resolve(&Template::common("missing.conf", "etc"))
            .unwrap_err();
        assert!(matches!(err, CinderError::TemplateNotFound { ref name, .. } if name == "missing.conf"));
    }

    #[test]
    fn test_write_if_changed_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("etc/cinder/cinder.conf");

        assert!(write_if_changed(&dest, b"a = 1\n", 0o640).unwrap());
        assert!(!write_if_changed(&dest, b"a = 1\n", 0o640).unwrap());
        assert!(write_if_changed(&dest, b"a = 2\n", 0o640).unwrap());

        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_render_embedded_values() {
        let context = Context::from_value(json!({"snap_paths": {"common": "/var/snap/c/common"}})).unwrap();
        let value = json!({
            "rbd_ceph_conf": "{{ snap_paths.common }}/etc/ceph/ceph1.conf",
            "contexts": {"array1": {"driver_ssl_cert_path": "{{ snap_paths.common }}/etc/cinder/ssl/array1.pem"}},
            "plain": "no expressions",
            "number": 4096
        });
        let rendered = render_embedded(value, &context).unwrap();
        assert_eq!(rendered["rbd_ceph_conf"], json!("/var/snap/c/common/etc/ceph/ceph1.conf"));
        assert_eq!(
            rendered["contexts"]["array1"]["driver_ssl_cert_path"],
            json!("/var/snap/c/common/etc/cinder/ssl/array1.pem")
        );
        assert_eq!(rendered["plain"], json!("no expressions"));
        assert_eq!(rendered["number"], json!(4096));
    }

    #[test]
    fn test_render_embedded_keeps_operator_values() {
        let context = Context::from_value(json!({"snap_paths": {"common": "/var/snap/c/common"}})).unwrap();
        let value = json!({
            "san_password": "pa{{ss",
            "pure_api_token": "{{ snap_paths.common }}",
            "hosts": ["{% if %}"]
        });
        let rendered = render_embedded(value.clone(), &context).unwrap();
        assert_eq!(rendered, value);
    }

    #[test]
    fn test_render_embedded_reports_bad_expression() {
        let context = Context::new();
        let err = render_embedded(json!({"rbd_ceph_conf": "{{ missing.value }}"}), &context).unwrap_err();
        assert!(matches!(err, CinderError::Template { .. }));
    }
}
