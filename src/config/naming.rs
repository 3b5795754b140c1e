//! Bidirectional mapping between external and internal option names.
//!
//! Operators spell options with hyphens (`rbd-pool`), the schema stores them
//! with underscores (`rbd_pool`). Conversion happens once, at the schema
//! boundary, and is aware of where backend instance names sit in the tree so
//! those identifiers are never rewritten.

use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationIssue};
use crate::types::BackendFamily;

/// Convert any of `camelCase`, `PascalCase`, `kebab-case` or `snake_case`
/// into `snake_case`.
pub fn to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' {
            out.push('_');
        } else if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                // end of an acronym: "HTTPServer" -> "http_server"
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Convert any supported spelling into `kebab-case`.
pub fn to_kebab(name: &str) -> String {
    to_snake(name).replace('_', "-")
}

/// Where in the option tree a map sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    /// Top-level section names
    Sections,
    /// Fields of a core section or of one backend
    Fields,
    /// Backend instance names inside a family section
    Instances,
}

/// Rewrite every schema key of `tree` to `snake_case`.
///
/// Fails if one object carries two spellings of the same key with different
/// values; identical duplicates collapse silently.
pub fn normalize_tree(tree: &Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
    let mut issues = Vec::new();
    let normalized = rename_map(tree, Level::Sections, "", to_snake, &mut issues);
    if issues.is_empty() {
        Ok(normalized)
    } else {
        Err(ValidationError { issues })
    }
}

/// Rewrite every schema key of `tree` to `kebab-case` (the external spelling).
pub fn externalize_tree(tree: &Map<String, Value>) -> Map<String, Value> {
    let mut issues = Vec::new();
    // internal names are already unique, so no collision can be reported
    rename_map(tree, Level::Sections, "", to_kebab, &mut issues)
}

fn rename_map(
    map: &Map<String, Value>,
    level: Level,
    path: &str,
    convert: fn(&str) -> String,
    issues: &mut Vec<ValidationIssue>,
) -> Map<String, Value> {
    let mut out = Map::new();
    // (original spelling, converted name) for collision messages
    let mut spellings: Vec<(String, String)> = Vec::new();

    for (key, value) in map {
        let name = match level {
            Level::Instances => key.clone(),
            Level::Sections | Level::Fields => convert(key),
        };
        let child_path = join_path(path, &name);

        let child = match (level, value) {
            (Level::Sections, Value::Object(inner)) => {
                let next = if BackendFamily::is_family_section(&to_snake(key)) {
                    Level::Instances
                } else {
                    Level::Fields
                };
                Value::Object(rename_map(inner, next, &child_path, convert, issues))
            }
            (Level::Instances, Value::Object(inner)) => {
                Value::Object(rename_map(inner, Level::Fields, &child_path, convert, issues))
            }
            // field values are surfaced unmodified, including nested objects
            _ => value.clone(),
        };

        match out.get(&name) {
            Some(existing) if *existing != child => {
                let first = spellings
                    .iter()
                    .find(|(_, converted)| *converted == name)
                    .map(|(original, _)| original.clone())
                    .unwrap_or_else(|| name.clone());
                issues.push(ValidationIssue::new(
                    child_path,
                    format!(
                        "given as both '{}' and '{}' with different values",
                        first, key
                    ),
                ));
            }
            Some(_) => {}
            None => {
                spellings.push((key.clone(), name.clone()));
                out.insert(name, child);
            }
        }
    }

    out
}

fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_kebab_conversion() {
        let cases = [
            ("camelCase", "camel-case"),
            ("PascalCase", "pascal-case"),
            ("snake_case", "snake-case"),
            ("kebab-case", "kebab-case"),
            ("simple", "simple"),
            ("", ""),
        ];
        for (input, expected) in cases {
            assert_eq!(to_kebab(input), expected, "to_kebab({:?})", input);
        }
    }

    #[test]
    fn test_to_snake_conversion() {
        assert_eq!(to_snake("image-volume-cache-max-size-gb"), "image_volume_cache_max_size_gb");
        assert_eq!(to_snake("rbd_pool"), "rbd_pool");
        assert_eq!(to_snake("HTTPServer"), "http_server");
        assert_eq!(to_snake("volumeDdBlocksize"), "volume_dd_blocksize");
    }

    #[test]
    fn test_normalize_keeps_instance_names() {
        let tree = json!({
            "ceph": {"ceph-rbd": {"rbd-pool": "volumes"}},
            "cinder": {"project-id": "p"}
        });
        let normalized = normalize_tree(tree.as_object().unwrap()).unwrap();
        assert_eq!(
            Value::Object(normalized),
            json!({
                "ceph": {"ceph-rbd": {"rbd_pool": "volumes"}},
                "cinder": {"project_id": "p"}
            })
        );
    }

    #[test]
    fn test_normalize_accepts_identical_duplicate_spellings() {
        let tree = json!({"cinder": {"project-id": "p", "project_id": "p"}});
        let normalized = normalize_tree(tree.as_object().unwrap()).unwrap();
        assert_eq!(normalized["cinder"]["project_id"], json!("p"));
    }

    #[test]
    fn test_normalize_rejects_conflicting_spellings() {
        let tree = json!({"ceph": {"a": {"rbd-pool": "one", "rbd_pool": "two"}}});
        let err = normalize_tree(tree.as_object().unwrap()).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "ceph.a.rbd_pool");
        assert!(err.issues[0].message.contains("'rbd-pool' and 'rbd_pool'"));
    }

    #[test]
    fn test_externalize_round_trips() {
        let tree = json!({
            "hitachi": {"array_1": {"hitachi_storage_id": "1", "san_ip": "10.0.0.1"}},
            "settings": {"enable_telemetry_notifications": true}
        });
        let external = externalize_tree(tree.as_object().unwrap());
        assert!(external["hitachi"]["array_1"].get("hitachi-storage-id").is_some());
        assert!(external["settings"].get("enable-telemetry-notifications").is_some());
        assert_eq!(normalize_tree(&external).unwrap(), *tree.as_object().unwrap());
    }
}
