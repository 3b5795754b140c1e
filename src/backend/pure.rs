//! Pure Storage FlashArray backend, rendered as its own stanza file.

use super::BackendContext;
use crate::config::PureConfiguration;
use crate::context::Namespace;
use crate::error::Result;
use crate::template::{Directory, Template};
use crate::types::{BackendFamily, PureProtocol};

pub fn volume_driver(protocol: PureProtocol) -> &'static str {
    match protocol {
        PureProtocol::Iscsi => "cinder.volume.drivers.pure.PureISCSIDriver",
        PureProtocol::Fc => "cinder.volume.drivers.pure.PureFCDriver",
        PureProtocol::Nvme => "cinder.volume.drivers.pure.PureNVMEDriver",
    }
}

/// Pure Storage FlashArray exposed as a cinder backend.
#[derive(Debug, Clone)]
pub struct PureBackend {
    name: String,
    protocol: PureProtocol,
    has_ssl_cert: bool,
    settings: Namespace,
}

impl PureBackend {
    pub fn new(name: impl Into<String>, config: &PureConfiguration) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            protocol: config.protocol,
            has_ssl_cert: config.driver_ssl_cert.is_some(),
            settings: super::settings_bag(config)?,
        })
    }
}

impl BackendContext for PureBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::Pure
    }

    fn namespace(&self) -> &str {
        super::BACKEND_NAMESPACE
    }

    fn supports_cluster(&self) -> bool {
        true
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
        super::stanza_templates(&self.name, BackendFamily::Pure, self.has_ssl_cert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_certificate_adds_pem_file() {
        let config: PureConfiguration = serde_json::from_value(json!({
            "volume_backend_name": "flash",
            "san_ip": "10.0.0.2",
            "pure_api_token": "token",
            "protocol": "iscsi",
            "driver_ssl_cert": "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----",
            "pure_iscsi_cidr_list": ["10.0.0.0/24", "10.1.0.0/24"]
        }))
        .unwrap();
        let backend = PureBackend::new("flash", &config).unwrap();

        let ctx = backend.context();
        assert_eq!(ctx["volume_driver"], json!("cinder.volume.drivers.pure.PureISCSIDriver"));
        assert_eq!(ctx["driver_ssl_cert_verify"], json!(true));
        assert_eq!(ctx["pure_iscsi_cidr_list"], json!("10.0.0.0/24,10.1.0.0/24"));

        let files: Vec<String> = backend
            .template_files()
            .iter()
            .map(|t| t.rel_path().display().to_string())
            .collect();
        assert_eq!(
            files,
            vec!["etc/cinder/cinder.conf.d/flash.conf", "etc/cinder/ssl/flash.pem"]
        );
        assert!(backend.supports_cluster());
        assert!(backend.cinder_context().is_empty());
    }

    #[test]
    fn test_default_protocol_is_fc() {
        let config: PureConfiguration = serde_json::from_value(json!({
            "san_ip": "10.0.0.2", "pure_api_token": "token"
        }))
        .unwrap();
        let backend = PureBackend::new("flash", &config).unwrap();
        assert_eq!(backend.context()["volume_driver"], json!("cinder.volume.drivers.pure.PureFCDriver"));
        assert_eq!(backend.directories().len(), 1);
    }
}
