//! Dell SC backend, rendered as its own stanza file.

use super::BackendContext;
use crate::config::DellScConfiguration;
use crate::context::Namespace;
use crate::error::Result;
use crate::template::{Directory, Template};
use crate::types::{BackendFamily, DellScProtocol};

pub fn volume_driver(protocol: DellScProtocol) -> &'static str {
    match protocol {
        DellScProtocol::Iscsi => {
            "cinder.volume.drivers.dell_emc.sc.storagecenter_iscsi.SCISCSIDriver"
        }
        DellScProtocol::Fc => "cinder.volume.drivers.dell_emc.sc.storagecenter_fc.SCFCDriver",
    }
}

/// Dell Storage Center exposed as a cinder backend.
#[derive(Debug, Clone)]
pub struct DellScBackend {
    name: String,
    protocol: DellScProtocol,
    has_ssl_cert: bool,
    settings: Namespace,
}

impl DellScBackend {
    pub fn new(name: impl Into<String>, config: &DellScConfiguration) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            protocol: config.protocol,
            has_ssl_cert: config.driver_ssl_cert.is_some(),
            settings: super::settings_bag(config)?,
        })
    }
}

impl BackendContext for DellScBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::DellSc
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
        super::stanza_templates(&self.name, BackendFamily::DellSc, self.has_ssl_cert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context() {
        let config: DellScConfiguration = serde_json::from_value(json!({
            "volume_backend_name": "sc",
            "san_ip": "10.0.0.3",
            "san_login": "Admin",
            "san_password": "secret",
            "protocol": "ISCSI",
            "excluded_domain_ips": "10.0.0.9, 10.0.0.10"
        }))
        .unwrap();
        let backend = DellScBackend::new("sc", &config).unwrap();
        let ctx = backend.context();

        assert_eq!(
            ctx["volume_driver"],
            json!("cinder.volume.drivers.dell_emc.sc.storagecenter_iscsi.SCISCSIDriver")
        );
        assert_eq!(ctx["dell_sc_ssn"], json!(64702));
        assert_eq!(ctx["excluded_domain_ips"], json!("10.0.0.9,10.0.0.10"));
        assert!(!ctx.contains_key("secondary_san_ip"));
        assert!(!backend.supports_cluster());
    }
}
