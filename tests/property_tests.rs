//! Property-Based Tests for cinder-volume
//!
//! Uses proptest for laws that must hold for every input:
//! - Option name spelling round-trips
//! - Validation purity
//! - Spelling independence of validation
//! - Write-if-changed idempotence

mod common;

use common::*;
use proptest::prelude::*;
use serde_json::{Map, Value, json};

use cinder_volume::config::naming::{to_kebab, to_snake};
use cinder_volume::config::validate_value;
use cinder_volume::render::write_if_changed;

// =============================================================================
// Naming
// =============================================================================

proptest! {
    /// kebab → snake → kebab is identity
    #[test]
    fn kebab_roundtrip(name in "[a-z][a-z0-9]*(-[a-z0-9]+)*") {
        prop_assert_eq!(to_kebab(&to_snake(&name)), name);
    }

    /// snake → kebab → snake is identity
    #[test]
    fn snake_roundtrip(name in "[a-z][a-z0-9]*(_[a-z0-9]+)*") {
        prop_assert_eq!(to_snake(&to_kebab(&name)), name);
    }

    /// Both spellings map to the same internal name
    #[test]
    fn spellings_converge(name in "[a-z][a-z0-9]*([_-][a-z0-9]+)*") {
        prop_assert_eq!(to_snake(&name), to_snake(&to_kebab(&name)));
        prop_assert!(!to_snake(&name).contains('-'));
    }
}

// =============================================================================
// Validation
// =============================================================================

fn ceph_fields(pool: &str, blocksize: u32, flatten: bool) -> Map<String, Value> {
    let doc = json!({
        "rbd-pool": pool,
        "rbd-user": "cinder",
        "rbd-secret-uuid": "abc",
        "volume-dd-blocksize": blocksize,
        "rbd-flatten-volume-from-snapshot": flatten,
        "rbd-store-chunk-size": 4
    });
    match doc {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn respell(fields: Map<String, Value>, snake: &[bool]) -> Map<String, Value> {
    fields
        .into_iter()
        .zip(snake.iter().cycle())
        .map(|((key, value), &snake)| {
            let key = if snake { to_snake(&key) } else { key };
            (key, value)
        })
        .collect()
}

proptest! {
    /// validate is pure: identical input, identical serialized output
    #[test]
    fn validate_is_pure(
        pool in "[a-z][a-z0-9-]{0,15}",
        blocksize in 512u32..65536,
        flatten in any::<bool>(),
        debug in any::<bool>(),
    ) {
        let doc = with(
            base_options(),
            json!({
                "settings": {"debug": debug},
                "ceph": {"c1": Value::Object(ceph_fields(&pool, blocksize, flatten))}
            }),
        );
        let first = validate_value(doc.clone()).unwrap();
        let second = validate_value(doc).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    /// Any mix of hyphenated and underscored keys validates identically
    #[test]
    fn spelling_does_not_change_configuration(
        blocksize in 512u32..65536,
        flatten in any::<bool>(),
        snake in proptest::collection::vec(any::<bool>(), 1..8),
    ) {
        let kebab = ceph_fields("volumes", blocksize, flatten);
        let mixed = respell(kebab.clone(), &snake);

        let a = validate_value(with(base_options(), json!({"ceph": {"c1": Value::Object(kebab)}}))).unwrap();
        let b = validate_value(with(base_options(), json!({"ceph": {"c1": Value::Object(mixed)}}))).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Pools only need to be unique within their own family
    #[test]
    fn pool_shared_across_families_is_valid(pool in "[a-z][a-z0-9]{0,10}") {
        let doc = with(
            base_options(),
            json!({
                "ceph": {"c1": Value::Object(ceph_fields(&pool, 4096, false))},
                "hitachi": {"h1": hitachi_backend("886000123456", &pool)}
            }),
        );
        prop_assert!(validate_value(doc).is_ok());
    }

    /// Two backends of one family on the same pool never validate
    #[test]
    fn pool_shared_within_family_is_invalid(pool in "[a-z][a-z0-9]{0,10}") {
        let doc = with(
            base_options(),
            json!({"ceph": {
                "c1": Value::Object(ceph_fields(&pool, 4096, false)),
                "c2": Value::Object(ceph_fields(&pool, 4096, false))
            }}),
        );
        let err = validate_value(doc).unwrap_err();
        prop_assert!(err.mentions(&pool));
    }
}

// =============================================================================
// Change detection
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The second identical write is always skipped
    #[test]
    fn write_if_changed_is_idempotent(content in proptest::collection::vec(any::<u8>(), 0..512)) {
        let tmp = tempfile::TempDir::new().unwrap();
        let dest = tmp.path().join("etc/cinder/cinder.conf");

        prop_assert!(write_if_changed(&dest, &content, 0o640).unwrap());
        prop_assert!(!write_if_changed(&dest, &content, 0o640).unwrap());
        prop_assert_eq!(std::fs::read(&dest).unwrap(), content);
    }
}
