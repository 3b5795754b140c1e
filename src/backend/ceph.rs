//! Ceph RBD backend: client config, keyring and the shared stanza.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use serde_json::Value;
use tracing::debug;

use super::BackendContext;
use crate::config::CephConfiguration;
use crate::context::Namespace;
use crate::error::Result;
use crate::paths::PathProvider;
use crate::template::{Directory, Template};
use crate::types::{BackendFamily, Location};

pub const CEPH_NAMESPACE: &str = "ceph_ctx";
pub const ETC_CEPH: &str = "etc/ceph";
pub const RBD_DRIVER: &str = "cinder.volume.drivers.rbd.RBDDriver";

const KEYRING_MODE: u32 = 0o600;

/// Keys that stay out of the shared configuration file
const HIDDEN_KEYS: &[&str] = &["rbd_key", "keyring", "mon_hosts", "auth", "backend_name"];

/// Ceph RBD pool exposed as a cinder backend.
#[derive(Debug, Clone)]
pub struct CephBackend {
    name: String,
    settings: Namespace,
}

impl CephBackend {
    pub fn new(name: impl Into<String>, config: &CephConfiguration) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            settings: super::settings_bag(config)?,
        })
    }

    pub fn keyring(&self) -> String {
        format!("ceph.client.{}.keyring", self.name)
    }

    pub fn ceph_conf(&self) -> String {
        format!("{}.conf", self.name)
    }
}

impl BackendContext for CephBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::Ceph
    }

    fn namespace(&self) -> &str {
        CEPH_NAMESPACE
    }

    fn supports_cluster(&self) -> bool {
        true
    }

    fn context(&self) -> Namespace {
        let mut context = Namespace::new();
        context.insert("volume_driver".into(), Value::String(RBD_DRIVER.to_string()));
        context.insert("backend_name".into(), Value::String(self.name.clone()));
        context.extend(self.settings.clone());
        context.insert(
            "rbd_ceph_conf".into(),
            Value::String(format!("{{{{ snap_paths.common }}}}/{}/{}", ETC_CEPH, self.ceph_conf())),
        );
        context.insert("keyring".into(), Value::String(self.keyring()));
        context
    }

    fn cinder_context(&self) -> Namespace {
        let mut context = self.context();
        for key in HIDDEN_KEYS {
            context.remove(*key);
        }
        context
    }

    fn directories(&self) -> Vec<Directory> {
        vec![Directory::common(ETC_CEPH)]
    }

    fn template_files(&self) -> Vec<Template> {
        vec![
            Template::common(self.ceph_conf(), ETC_CEPH)
                .with_template_name("ceph.conf.j2")
                .for_family(BackendFamily::Ceph),
            Template::common(self.keyring(), ETC_CEPH)
                .with_template_name("ceph.client.keyring.j2")
                .with_mode(KEYRING_MODE)
                .for_family(BackendFamily::Ceph),
        ]
    }

    /// Re-apply the keyring mode in case it was loosened by hand.
    fn setup(&self, paths: &dyn PathProvider) -> Result<()> {
        let keyring = paths
            .location(Location::Common)
            .join(ETC_CEPH)
            .join(self.keyring());
        if keyring.exists() {
            debug!("Restricting permissions of {}", keyring.display());
            fs::set_permissions(&keyring, fs::Permissions::from_mode(KEYRING_MODE))?;
        }
        Ok(())
    }
}
