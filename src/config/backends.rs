//! Per-family backend schemas.
//!
//! Every family shares the image cache and block size knobs, declares its own
//! driver options with bounds, and keeps any undeclared key in `extra` so new
//! driver options can be passed through without a schema change.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationErrors};

use super::lenient;
use crate::types::{
    BackendFamily, CopyMethod, DellScProtocol, HitachiProtocol, HostPersonality, NvmeTransport,
    PureProtocol,
};

/// Behaviour shared by every backend family schema.
pub trait BackendSettings {
    fn family(&self) -> BackendFamily;

    /// Name cinder uses to schedule volumes onto this backend
    fn volume_backend_name(&self) -> &str;

    /// Use `key` as the volume backend name when none was given
    fn default_backend_name(&mut self, key: &str);

    /// Identifiers of the physical pools this backend stores volumes in.
    ///
    /// Two backends of one family may not share any of them.
    fn pool_identities(&self) -> Vec<String> {
        Vec::new()
    }

    /// Constraints spanning several fields, as `(field, message)` pairs
    fn relational_issues(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Per-field bounds
    fn check_fields(&self) -> Result<(), ValidationErrors>;
}

pub(crate) mod defaults {
    pub fn int<const N: u32>() -> u32 {
        N
    }

    pub fn port<const N: u16>() -> u16 {
        N
    }

    pub fn flag<const B: bool>() -> bool {
        B
    }

    pub fn cephx() -> String {
        "cephx".to_string()
    }

    pub fn any_cidr() -> String {
        "0.0.0.0/0".to_string()
    }

    pub fn replication_pg_name() -> String {
        "cinder-group".to_string()
    }

    pub fn replication_pod_name() -> String {
        "cinder-pod".to_string()
    }

    pub fn trisync_pg_name() -> String {
        "cinder-trisync".to_string()
    }

    pub fn openstack_folder() -> String {
        "openstack".to_string()
    }

    pub fn dell_server_os() -> String {
        "Red Hat Linux 6.x".to_string()
    }

    pub fn secondary_san_login() -> String {
        "Admin".to_string()
    }
}

/// Ceph RBD backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CephConfiguration {
    #[serde(default)]
    pub volume_backend_name: String,
    #[serde(default, deserialize_with = "lenient::option_boolean")]
    pub image_volume_cache_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub image_volume_cache_max_size_gb: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub image_volume_cache_max_count: Option<u32>,
    #[serde(default = "defaults::int::<4096>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 512))]
    pub volume_dd_blocksize: u32,

    #[serde(default = "defaults::flag::<true>", deserialize_with = "lenient::boolean")]
    pub rbd_exclusive_cinder_pool: bool,
    #[serde(default = "defaults::flag::<true>", deserialize_with = "lenient::boolean")]
    pub report_discard_supported: bool,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub rbd_flatten_volume_from_snapshot: bool,
    #[serde(default = "defaults::cephx")]
    pub auth: String,
    #[serde(default)]
    pub mon_hosts: Option<String>,
    #[validate(length(min = 1))]
    pub rbd_pool: String,
    #[validate(length(min = 1))]
    pub rbd_user: String,
    pub rbd_secret_uuid: String,
    #[serde(default)]
    pub rbd_key: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Hitachi VSP backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HitachiConfiguration {
    #[serde(default)]
    pub volume_backend_name: String,
    #[serde(default, deserialize_with = "lenient::option_boolean")]
    pub image_volume_cache_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub image_volume_cache_max_size_gb: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub image_volume_cache_max_count: Option<u32>,
    #[serde(default = "defaults::int::<4096>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 512))]
    pub volume_dd_blocksize: u32,

    pub san_ip: String,
    pub san_login: String,
    pub san_password: String,
    /// Array serial; operators often type it as a number
    #[serde(deserialize_with = "lenient::string")]
    #[validate(length(min = 1))]
    pub hitachi_storage_id: String,
    /// Comma separated pool names or ids
    #[serde(deserialize_with = "lenient::string")]
    #[validate(length(min = 1))]
    pub hitachi_pools: String,
    #[serde(default)]
    pub protocol: HitachiProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_ssl_cert: Option<String>,

    #[serde(default)]
    pub hitachi_default_copy_method: CopyMethod,
    #[serde(default = "defaults::int::<3>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1, max = 15))]
    pub hitachi_copy_speed: u32,
    #[serde(default = "defaults::int::<3>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1, max = 600))]
    pub hitachi_copy_check_interval: u32,
    #[serde(default = "defaults::int::<10>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1, max = 600))]
    pub hitachi_async_copy_check_interval: u32,
    #[serde(default = "defaults::int::<5>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub hitachi_exec_retry_interval: u32,
    #[serde(default = "defaults::int::<600>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub hitachi_extend_timeout: u32,

    // CHAP, iSCSI only
    #[serde(default)]
    pub hitachi_auth_method: Option<String>,
    #[serde(default)]
    pub hitachi_auth_user: Option<String>,
    #[serde(default)]
    pub hitachi_auth_password: Option<String>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub hitachi_add_chap_user: bool,

    #[serde(default, deserialize_with = "lenient::boolean")]
    pub hitachi_group_request: bool,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub hitachi_group_delete: bool,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub hitachi_group_create: bool,
    #[serde(default)]
    pub hitachi_group_range: Option<String>,
    #[serde(default)]
    pub hitachi_group_name_format: Option<String>,
    #[serde(default)]
    pub hitachi_target_ports: Option<String>,
    #[serde(default)]
    pub hitachi_compute_target_ports: Option<String>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub hitachi_zoning_request: bool,

    #[serde(default = "defaults::int::<600>", deserialize_with = "lenient::integer")]
    #[validate(range(max = 7200))]
    pub hitachi_horcm_resource_lock_timeout: u32,
    #[serde(default)]
    pub hitachi_ldev_range: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub hitachi_pool_id: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub hitachi_thin_pool_id: Option<u32>,

    #[serde(default = "defaults::flag::<true>", deserialize_with = "lenient::boolean")]
    pub hitachi_discard_zero_page: bool,
    #[serde(default = "defaults::int::<7200>", deserialize_with = "lenient::integer")]
    pub hitachi_lock_timeout: u32,
    #[serde(default = "defaults::int::<1>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub hitachi_lun_retry_interval: u32,
    #[serde(default = "defaults::int::<50>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub hitachi_lun_timeout: u32,
    #[serde(default, deserialize_with = "lenient::integer")]
    #[validate(range(max = 255))]
    pub hitachi_path_group_id: u32,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub hitachi_port_scheduler: bool,
    #[serde(default, deserialize_with = "lenient::integer")]
    #[validate(range(max = 99))]
    pub hitachi_pair_target_number: u32,

    #[serde(default = "defaults::int::<3>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1, max = 15))]
    pub hitachi_replication_copy_speed: u32,
    #[serde(default, deserialize_with = "lenient::integer")]
    #[validate(range(max = 255))]
    pub hitachi_replication_number: u32,

    #[serde(default = "defaults::int::<30>", deserialize_with = "lenient::integer")]
    pub hitachi_rest_timeout: u32,
    #[serde(default = "defaults::flag::<true>", deserialize_with = "lenient::boolean")]
    pub hitachi_rest_tcp_keepalive: bool,

    // Global-Active Device mirror
    #[serde(default)]
    pub hitachi_mirror_storage_id: Option<String>,
    #[serde(default)]
    pub hitachi_mirror_rest_api_ip: Option<String>,
    #[serde(default = "defaults::port::<443>", deserialize_with = "lenient::integer")]
    pub hitachi_mirror_rest_api_port: u16,
    #[serde(default, deserialize_with = "lenient::integer")]
    #[validate(range(max = 99))]
    pub hitachi_mirror_pair_target_number: u32,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub hitachi_mirror_ssl_cert_verify: bool,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub hitachi_mirror_use_chap_auth: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Pure Storage FlashArray backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PureConfiguration {
    #[serde(default)]
    pub volume_backend_name: String,
    #[serde(default, deserialize_with = "lenient::option_boolean")]
    pub image_volume_cache_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub image_volume_cache_max_size_gb: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub image_volume_cache_max_count: Option<u32>,
    #[serde(default = "defaults::int::<4096>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 512))]
    pub volume_dd_blocksize: u32,

    pub san_ip: String,
    pub pure_api_token: String,
    #[serde(default)]
    pub protocol: PureProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_ssl_cert: Option<String>,

    #[serde(default = "defaults::any_cidr")]
    pub pure_iscsi_cidr: String,
    #[serde(default, deserialize_with = "lenient::option_list")]
    pub pure_iscsi_cidr_list: Option<Vec<String>>,
    #[serde(default = "defaults::any_cidr")]
    pub pure_nvme_cidr: String,
    #[serde(default, deserialize_with = "lenient::option_list")]
    pub pure_nvme_cidr_list: Option<Vec<String>>,
    #[serde(default)]
    pub pure_nvme_transport: NvmeTransport,

    #[serde(default)]
    pub pure_host_personality: Option<HostPersonality>,
    #[serde(default = "defaults::flag::<true>", deserialize_with = "lenient::boolean")]
    pub pure_automatic_max_oversubscription_ratio: bool,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub pure_eradicate_on_delete: bool,

    #[serde(default = "defaults::int::<3600>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub pure_replica_interval_default: u32,
    #[serde(default = "defaults::int::<14400>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub pure_replica_retention_short_term_default: u32,
    #[serde(default = "defaults::int::<3>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub pure_replica_retention_long_term_per_day_default: u32,
    #[serde(default = "defaults::int::<7>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub pure_replica_retention_long_term_default: u32,
    #[serde(default = "defaults::replication_pg_name")]
    pub pure_replication_pg_name: String,
    #[serde(default = "defaults::replication_pod_name")]
    pub pure_replication_pod_name: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub pure_trisync_enabled: bool,
    #[serde(default = "defaults::trisync_pg_name")]
    pub pure_trisync_pg_name: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Dell Storage Center backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DellScConfiguration {
    #[serde(default)]
    pub volume_backend_name: String,
    #[serde(default, deserialize_with = "lenient::option_boolean")]
    pub image_volume_cache_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub image_volume_cache_max_size_gb: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option_integer")]
    pub image_volume_cache_max_count: Option<u32>,
    #[serde(default = "defaults::int::<4096>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 512))]
    pub volume_dd_blocksize: u32,

    pub san_ip: String,
    pub san_login: String,
    pub san_password: String,
    /// Storage Center system serial number
    #[serde(default = "defaults::int::<64702>", deserialize_with = "lenient::integer")]
    pub dell_sc_ssn: u32,
    #[serde(default)]
    pub protocol: DellScProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_ssl_cert: Option<String>,

    #[serde(default = "defaults::port::<3033>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub dell_sc_api_port: u16,
    #[serde(default = "defaults::openstack_folder")]
    pub dell_sc_server_folder: String,
    #[serde(default = "defaults::openstack_folder")]
    pub dell_sc_volume_folder: String,
    #[serde(default = "defaults::dell_server_os")]
    pub dell_server_os: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub dell_sc_verify_cert: bool,

    #[serde(default, deserialize_with = "lenient::option_list")]
    pub excluded_domain_ips: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::option_list")]
    pub included_domain_ips: Option<Vec<String>>,
    #[serde(default = "defaults::flag::<true>", deserialize_with = "lenient::boolean")]
    pub san_thin_provision: bool,

    // Dual DSM
    #[serde(default)]
    pub secondary_san_ip: Option<String>,
    #[serde(default = "defaults::secondary_san_login")]
    pub secondary_san_login: String,
    #[serde(default)]
    pub secondary_san_password: Option<String>,
    #[serde(default = "defaults::port::<3033>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub secondary_sc_api_port: u16,

    #[serde(default = "defaults::int::<15>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub dell_api_async_rest_timeout: u32,
    #[serde(default = "defaults::int::<30>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub dell_api_sync_rest_timeout: u32,

    #[serde(default = "defaults::int::<30>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub ssh_conn_timeout: u32,
    #[serde(default = "defaults::int::<5>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub ssh_max_pool_conn: u32,
    #[serde(default = "defaults::int::<1>", deserialize_with = "lenient::integer")]
    #[validate(range(min = 1))]
    pub ssh_min_pool_conn: u32,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Implements the accessors every family shares.
macro_rules! backend_settings_common {
    ($family:expr) => {
        fn family(&self) -> BackendFamily {
            $family
        }

        fn volume_backend_name(&self) -> &str {
            &self.volume_backend_name
        }

        fn default_backend_name(&mut self, key: &str) {
            if self.volume_backend_name.trim().is_empty() {
                self.volume_backend_name = key.to_string();
            }
        }

        fn check_fields(&self) -> Result<(), ValidationErrors> {
            self.validate()
        }
    };
}

impl BackendSettings for CephConfiguration {
    backend_settings_common!(BackendFamily::Ceph);

    fn pool_identities(&self) -> Vec<String> {
        vec![self.rbd_pool.clone()]
    }
}

impl BackendSettings for HitachiConfiguration {
    backend_settings_common!(BackendFamily::Hitachi);

    /// One `storage-id:pool` pair per listed pool
    fn pool_identities(&self) -> Vec<String> {
        let storage_id = self.hitachi_storage_id.trim();
        let pools: BTreeSet<&str> = self
            .hitachi_pools
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        pools
            .into_iter()
            .map(|pool| format!("{}:{}", storage_id, pool))
            .collect()
    }
}

impl BackendSettings for PureConfiguration {
    backend_settings_common!(BackendFamily::Pure);
}

impl BackendSettings for DellScConfiguration {
    backend_settings_common!(BackendFamily::DellSc);

    fn relational_issues(&self) -> Vec<(&'static str, String)> {
        if self.ssh_min_pool_conn > self.ssh_max_pool_conn {
            vec![(
                "ssh_min_pool_conn",
                format!(
                    "{} is greater than ssh_max_pool_conn ({})",
                    self.ssh_min_pool_conn, self.ssh_max_pool_conn
                ),
            )]
        } else {
            Vec::new()
        }
    }
}
