//! Canonicalization of decoded config trees.
//!
//! Every decoder produces its own value type: `serde_json::Value`,
//! `serde_yaml::Value` (whose mapping keys may be any scalar) or
//! `toml::Value`. [`normalize`] turns any of them into a [`ConfigMap`]:
//! string keys all the way down, nested maps recursively canonicalized,
//! scalars left alone. Normalizing an already-canonical map returns an
//! equal map.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use serde_json::{Number, Value};

use crate::error::FlagError;

/// The canonical configuration map: string keys, scalar or nested-map values.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Conversion of a decoded value into a canonical `serde_json::Value`.
pub trait Normalize {
    fn into_canonical(self) -> Value;
}

/// Canonicalize `input`, which must be map-shaped at the top level.
pub fn normalize<V: Normalize>(input: V) -> Result<ConfigMap, FlagError> {
    match input.into_canonical() {
        Value::Object(map) => Ok(map),
        other => Err(FlagError::TypeError(kind_name(&other))),
    }
}

/// Default string form of a canonical value.
///
/// Strings are returned bare, `null` becomes the empty string, and arrays or
/// maps are rendered as compact JSON.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}

fn float(f: f64) -> Value {
    // NaN and infinities have no JSON number form.
    Number::from_f64(f).map_or_else(|| Value::String(f.to_string()), Value::Number)
}

impl Normalize for Value {
    fn into_canonical(self) -> Value {
        match self {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_canonical()))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(Normalize::into_canonical).collect())
            }
            scalar => scalar,
        }
    }
}

impl Normalize for ConfigMap {
    fn into_canonical(self) -> Value {
        Value::Object(self).into_canonical()
    }
}

impl Normalize for serde_yaml::Value {
    fn into_canonical(self) -> Value {
        use serde_yaml::Value as Yaml;
        match self {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(b),
            Yaml::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::from(i)
                } else if let Some(u) = n.as_u64() {
                    Value::from(u)
                } else {
                    float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Yaml::String(s) => Value::String(s),
            Yaml::Sequence(items) => {
                Value::Array(items.into_iter().map(Normalize::into_canonical).collect())
            }
            Yaml::Mapping(mapping) => Value::Object(
                mapping
                    .into_iter()
                    .map(|(k, v)| (scalar_text(&k.into_canonical()), v.into_canonical()))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => tagged.value.into_canonical(),
        }
    }
}

impl Normalize for toml::Value {
    fn into_canonical(self) -> Value {
        match self {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::from(i),
            toml::Value::Float(f) => float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => {
                Value::Array(items.into_iter().map(Normalize::into_canonical).collect())
            }
            toml::Value::Table(table) => table.into_canonical(),
        }
    }
}

impl Normalize for toml::Table {
    fn into_canonical(self) -> Value {
        Value::Object(
            self.into_iter()
                .map(|(k, v)| (k, v.into_canonical()))
                .collect(),
        )
    }
}

impl<K: Display, V: Normalize> Normalize for BTreeMap<K, V> {
    fn into_canonical(self) -> Value {
        Value::Object(
            self.into_iter()
                .map(|(k, v)| (k.to_string(), v.into_canonical()))
                .collect(),
        )
    }
}

impl<K: Display, V: Normalize, S> Normalize for HashMap<K, V, S> {
    fn into_canonical(self) -> Value {
        Value::Object(
            self.into_iter()
                .map(|(k, v)| (k.to_string(), v.into_canonical()))
                .collect(),
        )
    }
}

impl Normalize for String {
    fn into_canonical(self) -> Value {
        Value::String(self)
    }
}

impl Normalize for &str {
    fn into_canonical(self) -> Value {
        Value::String(self.to_string())
    }
}

impl Normalize for bool {
    fn into_canonical(self) -> Value {
        Value::Bool(self)
    }
}

impl Normalize for i64 {
    fn into_canonical(self) -> Value {
        Value::from(self)
    }
}

impl Normalize for u64 {
    fn into_canonical(self) -> Value {
        Value::from(self)
    }
}

impl Normalize for f64 {
    fn into_canonical(self) -> Value {
        float(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_is_unchanged() {
        let input = json!({"database": {"password": "12345", "port": 5432}, "debug": true});
        let map = normalize(input.clone()).unwrap();
        assert_eq!(Value::Object(map), input);
    }

    #[test]
    fn normalizing_twice_is_idempotent() {
        let once = normalize(json!({"a": {"b": {"c": [1, 2]}}})).unwrap();
        let twice = normalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn yaml_non_string_keys_are_stringified() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: one\ntrue: yes\nnested:\n  2: two\n").unwrap();
        let map = normalize(yaml).unwrap();
        assert_eq!(map["1"], json!("one"));
        assert_eq!(map["true"], json!("yes"));
        assert_eq!(map["nested"]["2"], json!("two"));
    }

    #[test]
    fn toml_tables_become_nested_maps() {
        let table: toml::Table = "[server]\naddress = \"localhost\"\nport = 8080\n"
            .parse()
            .unwrap();
        let map = normalize(table).unwrap();
        assert_eq!(map["server"]["address"], json!("localhost"));
        assert_eq!(map["server"]["port"], json!(8080));
    }

    #[test]
    fn display_keyed_maps_are_accepted() {
        let mut inner = BTreeMap::new();
        inner.insert(7u8, "seven");
        let mut outer = HashMap::new();
        outer.insert("numbers", inner);
        let map = normalize(outer).unwrap();
        assert_eq!(map["numbers"]["7"], json!("seven"));
    }

    #[test]
    fn non_map_top_level_is_type_error() {
        let err = normalize(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, FlagError::TypeError("an array")));
        let err = normalize("plain").unwrap_err();
        assert!(matches!(err, FlagError::TypeError("a string")));
    }

    #[test]
    fn scalar_text_formats() {
        assert_eq!(scalar_text(&json!(true)), "true");
        assert_eq!(scalar_text(&json!(42)), "42");
        assert_eq!(scalar_text(&json!(1.5)), "1.5");
        assert_eq!(scalar_text(&json!("hi")), "hi");
        assert_eq!(scalar_text(&Value::Null), "");
        assert_eq!(scalar_text(&json!({"yadu": true})), r#"{"yadu":true}"#);
    }
}
