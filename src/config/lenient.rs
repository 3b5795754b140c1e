//! Coercing deserializers for option values.
//!
//! The snap configuration store hands most values over as strings, so
//! booleans and integers are accepted both natively and in string form.

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;

struct BoolVisitor;

impl<'de> Visitor<'de> for BoolVisitor {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::custom(format!("{} is not a boolean", v))),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::custom(format!("{} is not a boolean", v))),
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
        match v.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(E::custom(format!("'{}' is not a boolean", v))),
        }
    }
}

struct IntVisitor;

impl<'de> Visitor<'de> for IntVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v).map_err(|_| E::custom(format!("{} is too large", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            Ok(v as i64)
        } else {
            Err(E::custom(format!("{} is not an integer", v)))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        v.trim()
            .parse()
            .map_err(|_| E::custom(format!("'{}' is not an integer", v)))
    }
}

struct StringVisitor;

impl<'de> Visitor<'de> for StringVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

struct ListVisitor;

impl<'de> Visitor<'de> for ListVisitor {
    type Value = Vec<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of strings or a comma separated string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Vec<String>, E> {
        Ok(v.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<String>, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<LenientString>()? {
            items.push(item.0);
        }
        Ok(items)
    }
}

struct LenientBool(bool);
struct LenientInt(i64);
struct LenientString(String);
struct LenientList(Vec<String>);

impl<'de> Deserialize<'de> for LenientBool {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(BoolVisitor).map(LenientBool)
    }
}

impl<'de> Deserialize<'de> for LenientInt {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(IntVisitor).map(LenientInt)
    }
}

impl<'de> Deserialize<'de> for LenientString {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(StringVisitor).map(LenientString)
    }
}

impl<'de> Deserialize<'de> for LenientList {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(ListVisitor).map(LenientList)
    }
}

fn narrow<T, E>(value: i64) -> Result<T, E>
where
    T: TryFrom<i64>,
    E: de::Error,
{
    T::try_from(value).map_err(|_| E::custom(format!("{} is out of range", value)))
}

pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    LenientBool::deserialize(d).map(|b| b.0)
}

pub fn option_boolean<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<LenientBool>::deserialize(d)?.map(|b| b.0))
}

pub fn integer<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    narrow(LenientInt::deserialize(d)?.0)
}

pub fn option_integer<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    Option::<LenientInt>::deserialize(d)?
        .map(|v| narrow(v.0))
        .transpose()
}

/// Strings, with bare numbers accepted as their decimal text
pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    LenientString::deserialize(d).map(|s| s.0)
}

pub fn option_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(Option::<LenientList>::deserialize(d)?.map(|l| l.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "boolean")]
        flag: bool,
        #[serde(deserialize_with = "integer")]
        count: u32,
        #[serde(default, deserialize_with = "option_integer")]
        limit: Option<u16>,
        #[serde(deserialize_with = "string")]
        id: String,
        #[serde(default, deserialize_with = "option_list")]
        items: Option<Vec<String>>,
    }

    #[test]
    fn test_strings_are_coerced() {
        let sample: Sample = serde_json::from_value(json!({
            "flag": "True",
            "count": "42",
            "limit": "7",
            "id": 12345,
            "items": "a, b,,c"
        }))
        .unwrap();
        assert!(sample.flag);
        assert_eq!(sample.count, 42);
        assert_eq!(sample.limit, Some(7));
        assert_eq!(sample.id, "12345");
        assert_eq!(sample.items.unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_native_values_pass_through() {
        let sample: Sample = serde_json::from_value(json!({
            "flag": false,
            "count": 3,
            "id": "x",
            "items": ["p", 1]
        }))
        .unwrap();
        assert!(!sample.flag);
        assert_eq!(sample.limit, None);
        assert_eq!(sample.items.unwrap(), vec!["p", "1"]);
    }

    #[test]
    fn test_null_optional_is_none() {
        let sample: Sample = serde_json::from_value(json!({
            "flag": 1, "count": 0, "id": "x", "limit": null
        }))
        .unwrap();
        assert!(sample.flag);
        assert_eq!(sample.limit, None);
    }

    #[test]
    fn test_rejections() {
        let bad_bool = json!({"flag": "maybe", "count": 1, "id": "x"});
        assert!(serde_json::from_value::<Sample>(bad_bool).is_err());

        let negative = json!({"flag": true, "count": -1, "id": "x"});
        let err = serde_json::from_value::<Sample>(negative).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let not_a_number = json!({"flag": true, "count": "lots", "id": "x"});
        assert!(serde_json::from_value::<Sample>(not_a_number).is_err());
    }
}
