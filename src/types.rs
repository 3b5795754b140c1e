//! Type-safe enumerations used by the configuration schema
//!
//! Protocol and option tokens are parsed case-insensitively and always
//! rendered in their canonical spelling, so `iscsi`, `ISCSI` and `iSCSI` all
//! validate to the same Hitachi protocol.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Backend families the manager knows how to configure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum BackendFamily {
    #[strum(serialize = "ceph")]
    Ceph,
    #[strum(serialize = "hitachi")]
    Hitachi,
    #[strum(serialize = "pure")]
    Pure,
    #[strum(serialize = "dellsc")]
    DellSc,
}

impl BackendFamily {
    /// Configuration section holding this family's backends
    pub fn section(self) -> &'static str {
        match self {
            Self::Ceph => "ceph",
            Self::Hitachi => "hitachi",
            Self::Pure => "pure",
            Self::DellSc => "dellsc",
        }
    }

    /// Returns true if `section` names a backend family
    pub fn is_family_section(section: &str) -> bool {
        Self::iter().any(|family| family.section() == section)
    }
}

/// Location class of a rendered file or created directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Display, EnumString, EnumIter)]
pub enum Location {
    /// Writable area shared across revisions
    #[default]
    #[strum(serialize = "common")]
    Common,
    /// Revision-specific writable area
    #[strum(serialize = "data")]
    Data,
}

/// Hitachi VSP transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(try_from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum HitachiProtocol {
    #[default]
    #[strum(serialize = "FC")]
    Fc,
    #[strum(serialize = "iSCSI")]
    Iscsi,
}

/// Pure Storage FlashArray transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(try_from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum PureProtocol {
    #[strum(serialize = "iscsi")]
    Iscsi,
    #[default]
    #[strum(serialize = "fc")]
    Fc,
    #[strum(serialize = "nvme")]
    Nvme,
}

/// Dell Storage Center transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(try_from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum DellScProtocol {
    #[strum(serialize = "iscsi")]
    Iscsi,
    #[default]
    #[strum(serialize = "fc")]
    Fc,
}

/// NVMe-oF transport used by Pure when `protocol = nvme`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(try_from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum NvmeTransport {
    #[default]
    #[strum(serialize = "roce")]
    Roce,
    #[strum(serialize = "tcp")]
    Tcp,
}

/// Host personality the FlashArray applies to created hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(try_from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum HostPersonality {
    #[strum(serialize = "aix")]
    Aix,
    #[strum(serialize = "esxi")]
    Esxi,
    #[strum(serialize = "hitachi-vsp")]
    HitachiVsp,
    #[strum(serialize = "hpux")]
    Hpux,
    #[strum(serialize = "oracle-vm-server")]
    OracleVmServer,
    #[strum(serialize = "solaris")]
    Solaris,
    #[strum(serialize = "vms")]
    Vms,
}

/// Hitachi volume copy method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(try_from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum CopyMethod {
    #[default]
    #[strum(serialize = "FULL")]
    Full,
    #[strum(serialize = "THIN")]
    Thin,
}

/// Implements the `String` conversions serde uses for token enums.
macro_rules! token_conversions {
    ($($ty:ty),+ $(,)?) => {$(
        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.trim().parse().map_err(|_| {
                    let allowed: Vec<String> = <$ty>::iter().map(|v| v.to_string()).collect();
                    format!("'{}' is not one of: {}", value, allowed.join(", "))
                })
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.to_string()
            }
        }
    )+};
}

token_conversions!(
    HitachiProtocol,
    PureProtocol,
    DellScProtocol,
    NvmeTransport,
    HostPersonality,
    CopyMethod,
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_protocol_parsing_is_case_insensitive() {
        assert_eq!(HitachiProtocol::from_str("iscsi").unwrap(), HitachiProtocol::Iscsi);
        assert_eq!(HitachiProtocol::from_str("ISCSI").unwrap(), HitachiProtocol::Iscsi);
        assert_eq!(HitachiProtocol::from_str("fc").unwrap(), HitachiProtocol::Fc);
        assert_eq!(PureProtocol::from_str("NVMe").unwrap(), PureProtocol::Nvme);
        assert!(DellScProtocol::from_str("nvme").is_err());
    }

    #[test]
    fn test_protocol_display_is_canonical() {
        assert_eq!(HitachiProtocol::Iscsi.to_string(), "iSCSI");
        assert_eq!(HitachiProtocol::Fc.to_string(), "FC");
        assert_eq!(PureProtocol::Fc.to_string(), "fc");
        assert_eq!(HostPersonality::OracleVmServer.to_string(), "oracle-vm-server");
    }

    #[test]
    fn test_serde_normalizes_case() {
        let parsed: HitachiProtocol = serde_json::from_str("\"Iscsi\"").unwrap();
        assert_eq!(parsed, HitachiProtocol::Iscsi);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"iSCSI\"");
    }

    #[test]
    fn test_serde_rejection_lists_allowed_tokens() {
        let err = serde_json::from_str::<PureProtocol>("\"sas\"").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'sas' is not one of"));
        assert!(msg.contains("iscsi, fc, nvme"));
    }

    #[test]
    fn test_family_sections() {
        assert_eq!(BackendFamily::DellSc.section(), "dellsc");
        assert!(BackendFamily::is_family_section("hitachi"));
        assert!(!BackendFamily::is_family_section("cinder"));
        let sections: Vec<&str> = BackendFamily::iter().map(|f| f.section()).collect();
        assert_eq!(sections, vec!["ceph", "hitachi", "pure", "dellsc"]);
    }

    #[test]
    fn test_all_enums_have_default() {
        assert_eq!(HitachiProtocol::default(), HitachiProtocol::Fc);
        assert_eq!(PureProtocol::default(), PureProtocol::Fc);
        assert_eq!(DellScProtocol::default(), DellScProtocol::Fc);
        assert_eq!(NvmeTransport::default(), NvmeTransport::Roce);
        assert_eq!(CopyMethod::default(), CopyMethod::Full);
        assert_eq!(Location::default(), Location::Common);
    }
}
