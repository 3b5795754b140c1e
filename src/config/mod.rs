//! Typed configuration schema
//!
//! [`validate`] turns a [`RawOptions`] tree into an immutable
//! [`Configuration`]: keys are normalized to their internal spelling, values
//! are coerced and bounded, and cross-backend uniqueness is enforced. All
//! problems are reported together in one [`ValidationError`].

pub mod backends;
mod checks;
pub mod lenient;
pub mod naming;
pub mod raw;
pub mod sections;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use validator::Validate;

use crate::error::{ValidationError, ValidationIssue};

pub use backends::{
    BackendSettings, CephConfiguration, DellScConfiguration, HitachiConfiguration,
    PureConfiguration,
};
pub use raw::{ConfigSource, RawOptions, SnapctlConfig};
pub use sections::{CinderConfiguration, DatabaseConfiguration, RabbitMqConfiguration, Settings};

/// Validated configuration for one configure cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    #[serde(default)]
    pub settings: Settings,
    pub database: DatabaseConfiguration,
    pub rabbitmq: RabbitMqConfiguration,
    pub cinder: CinderConfiguration,
    #[serde(default)]
    pub ceph: BTreeMap<String, CephConfiguration>,
    #[serde(default)]
    pub hitachi: BTreeMap<String, HitachiConfiguration>,
    #[serde(default)]
    pub pure: BTreeMap<String, PureConfiguration>,
    #[serde(default)]
    pub dellsc: BTreeMap<String, DellScConfiguration>,
}

impl Configuration {
    /// Every top-level section, in internal spelling
    pub const SECTIONS: &'static [&'static str] = &[
        "settings", "database", "rabbitmq", "cinder", "ceph", "hitachi", "pure", "dellsc",
    ];

    /// Every configured backend as `(name, settings)`, family by family.
    pub fn backends(&self) -> impl Iterator<Item = (&str, &dyn BackendSettings)> {
        fn erase<'a, T: BackendSettings>(
            (name, settings): (&'a String, &'a T),
        ) -> (&'a str, &'a dyn BackendSettings) {
            (name.as_str(), settings)
        }

        self.ceph
            .iter()
            .map(erase)
            .chain(self.hitachi.iter().map(erase))
            .chain(self.pure.iter().map(erase))
            .chain(self.dellsc.iter().map(erase))
    }

    /// Options in their external spelling; validating them again yields an
    /// identical configuration.
    pub fn to_options(&self) -> Result<Value, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(tree) => Ok(Value::Object(naming::externalize_tree(&tree))),
            other => Ok(other),
        }
    }

    fn fill_backend_names(&mut self) {
        fn fill<T: BackendSettings>(backends: &mut BTreeMap<String, T>) {
            for (name, backend) in backends.iter_mut() {
                backend.default_backend_name(name);
            }
        }

        fill(&mut self.ceph);
        fill(&mut self.hitachi);
        fill(&mut self.pure);
        fill(&mut self.dellsc);
    }

    fn field_issues(&self) -> Vec<ValidationIssue> {
        let sections: [(&str, Result<(), validator::ValidationErrors>); 4] = [
            ("settings", self.settings.validate()),
            ("database", self.database.validate()),
            ("rabbitmq", self.rabbitmq.validate()),
            ("cinder", self.cinder.validate()),
        ];

        let mut issues: Vec<ValidationIssue> = sections
            .iter()
            .filter_map(|(name, result)| result.as_ref().err().map(|e| checks::field_issues(name, e)))
            .flatten()
            .collect();

        for (name, backend) in self.backends() {
            if let Err(errors) = backend.check_fields() {
                let prefix = format!("{}.{}", backend.family().section(), name);
                issues.extend(checks::field_issues(&prefix, &errors));
            }
        }

        issues
    }
}

/// Validate raw options into a [`Configuration`].
///
/// Side-effect free: the same input always produces the same result.
pub fn validate(raw: &RawOptions) -> Result<Configuration, ValidationError> {
    let tree = naming::normalize_tree(raw.as_map())?;

    let mut config: Configuration =
        serde_path_to_error::deserialize(Value::Object(tree)).map_err(|err| {
            let path = err.path().to_string();
            let path = if path == "." { String::new() } else { path };
            ValidationError::single(path, err.inner().to_string())
        })?;
    config.fill_backend_names();

    let mut issues = config.field_issues();
    issues.extend(checks::instance_name_issues(&config));
    issues.extend(checks::uniqueness_issues(&config));
    if !issues.is_empty() {
        return Err(ValidationError { issues });
    }

    debug!(
        "Validated configuration with {} backend(s)",
        config.backends().count()
    );
    Ok(config)
}

/// Validate a JSON document of options (nested, dotted or prefixed keys).
pub fn validate_value(value: Value) -> Result<Configuration, ValidationError> {
    validate(&RawOptions::from_value(value)?)
}

/// Section views published to templates, keyed by section name.
pub fn section_views(config: &Configuration) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(config)? {
        Value::Object(sections) => Ok(sections),
        _ => Ok(Map::new()),
    }
}
