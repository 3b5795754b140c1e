//! Hitachi VSP backend, rendered as its own stanza file.

use super::BackendContext;
use crate::config::HitachiConfiguration;
use crate::context::Namespace;
use crate::error::Result;
use crate::template::{Directory, Template};
use crate::types::{BackendFamily, HitachiProtocol};

/// Driver class for each transport
pub fn volume_driver(protocol: HitachiProtocol) -> &'static str {
    match protocol {
        HitachiProtocol::Fc => "cinder.volume.drivers.hitachi.hbsd_fc.HBSDFCDriver",
        HitachiProtocol::Iscsi => "cinder.volume.drivers.hitachi.hbsd_iscsi.HBSDISCSIDriver",
    }
}

/// Hitachi VSP array exposed as a cinder backend.
///
/// Its settings only ever appear in its own stanza file.
#[derive(Debug, Clone)]
pub struct HitachiBackend {
    name: String,
    protocol: HitachiProtocol,
    has_ssl_cert: bool,
    settings: Namespace,
}

impl HitachiBackend {
    pub fn new(name: impl Into<String>, config: &HitachiConfiguration) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            protocol: config.protocol,
            has_ssl_cert: config.driver_ssl_cert.is_some(),
            settings: super::settings_bag(config)?,
        })
    }
}

impl BackendContext for HitachiBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::Hitachi
    }

    fn namespace(&self) -> &str {
        super::BACKEND_NAMESPACE
    }

    fn supports_cluster(&self) -> bool {
        false
    }

    fn context(&self) -> Namespace {
        super::stanza_context(
            &self.name,
            volume_driver(self.protocol),
            &self.settings,
            self.has_ssl_cert,
        )
    }

    fn cinder_context(&self) -> Namespace {
        Namespace::new()
    }

    fn directories(&self) -> Vec<Directory> {
        super::stanza_directories(self.has_ssl_cert)
    }

    fn template_files(&self) -> Vec<Template> {
        super::stanza_templates(&self.name, BackendFamily::Hitachi, self.has_ssl_cert)
    }
}
