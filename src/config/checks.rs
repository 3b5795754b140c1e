//! Validation that spans fields, backends or families.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use validator::ValidationErrors;

use super::Configuration;
use crate::error::ValidationIssue;
use crate::types::BackendFamily;

/// Turn validator output into issues rooted at `prefix`, ordered by field.
pub(crate) fn field_issues(prefix: &str, errors: &ValidationErrors) -> Vec<ValidationIssue> {
    let mut fields: Vec<(String, Vec<String>)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| (field.to_string(), errs.iter().map(describe).collect()))
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, messages)| {
            let path = format!("{}.{}", prefix, field);
            messages
                .into_iter()
                .map(move |message| ValidationIssue::new(path.clone(), message))
        })
        .collect()
}

fn describe(error: &validator::ValidationError) -> String {
    let param = |name: &str| error.params.get(name).map(format_param);
    match error.code.as_ref() {
        "range" => {
            let value = param("value").unwrap_or_default();
            match (param("min"), param("max")) {
                (Some(min), Some(max)) => format!("{} is outside the range [{}, {}]", value, min, max),
                (Some(min), None) => format!("{} is below the minimum of {}", value, min),
                (None, Some(max)) => format!("{} is above the maximum of {}", value, max),
                (None, None) => format!("{} is out of range", value),
            }
        }
        "length" => "must not be empty".to_string(),
        code => format!("failed check '{}'", code),
    }
}

fn format_param(value: &Value) -> String {
    match value.as_f64() {
        Some(number) if number.fract() == 0.0 => format!("{}", number as i64),
        _ => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

static INSTANCE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").ok());

/// Whether `name` can be used as a file name and an INI section header.
pub fn is_valid_instance_name(name: &str) -> bool {
    INSTANCE_NAME
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(name))
}

/// Backend instance names that would escape their directory or break a
/// section header.
pub(crate) fn instance_name_issues(config: &Configuration) -> Vec<ValidationIssue> {
    config
        .backends()
        .filter(|(key, _)| !is_valid_instance_name(key))
        .map(|(key, backend)| {
            ValidationIssue::new(
                format!("{}.{}", backend.family().section(), key),
                format!(
                    "invalid backend name '{}': use letters, digits, '-' and '_', starting with a letter or digit",
                    key
                ),
            )
        })
        .collect()
}

/// Uniqueness rules across every configured backend.
///
/// Every violation is reported, not just the first one.
pub(crate) fn uniqueness_issues(config: &Configuration) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut backend_names: HashMap<&str, BackendFamily> = HashMap::new();
    let mut volume_backend_names: HashMap<&str, String> = HashMap::new();
    let mut pools: BTreeMap<(BackendFamily, String), &str> = BTreeMap::new();

    for (key, backend) in config.backends() {
        let family = backend.family();
        let path = format!("{}.{}", family.section(), key);

        if let Some(first) = backend_names.insert(key, family) {
            issues.push(ValidationIssue::new(
                path.clone(),
                format!("duplicate backend name '{}' (also configured under {})", key, first.section()),
            ));
        }

        let volume_backend_name = backend.volume_backend_name();
        match volume_backend_names.get(volume_backend_name) {
            Some(first) => issues.push(ValidationIssue::new(
                format!("{}.volume_backend_name", path),
                format!(
                    "duplicate volume backend name '{}' (already used by {})",
                    volume_backend_name, first
                ),
            )),
            None => {
                volume_backend_names.insert(volume_backend_name, path.clone());
            }
        }

        for pool in backend.pool_identities() {
            match pools.get(&(family, pool.clone())) {
                Some(first) => issues.push(ValidationIssue::new(
                    path.clone(),
                    format!("duplicate {} pool '{}' (already used by backend '{}')", family, pool, first),
                )),
                None => {
                    pools.insert((family, pool), key);
                }
            }
        }

        for (field, message) in backend.relational_issues() {
            issues.push(ValidationIssue::new(format!("{}.{}", path, field), message));
        }
    }

    issues
}
