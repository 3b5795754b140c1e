//! Core configuration sections shared by every deployment.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::lenient;

/// Feature toggles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub debug: bool,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub enable_telemetry_notifications: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfiguration {
    #[validate(length(min = 1))]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RabbitMqConfiguration {
    #[validate(length(min = 1))]
    pub url: String,
}

/// Service identity and image cache tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CinderConfiguration {
    #[serde(deserialize_with = "lenient::string")]
    #[validate(length(min = 1))]
    pub project_id: String,
    #[serde(deserialize_with = "lenient::string")]
    #[validate(length(min = 1))]
    pub user_id: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub image_volume_cache_enabled: bool,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub image_volume_cache_max_size_gb: u32,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub image_volume_cache_max_count: u32,
    #[serde(default)]
    pub default_volume_type: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
}
