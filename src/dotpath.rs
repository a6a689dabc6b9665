//! Dotted-path access into a [`ConfigMap`] (e.g. `"database.password"`).

use serde_json::Value;

use crate::error::FlagError;
use crate::normalize::{ConfigMap, scalar_text};

/// Navigate a map by dotted path. `None` if any segment is absent or an
/// intermediate segment is not a map.
pub fn lookup<'a>(map: &'a ConfigMap, dotted_key: &str) -> Option<&'a Value> {
    let (path, leaf) = match dotted_key.rsplit_once('.') {
        Some((p, l)) => (Some(p), l),
        None => (None, dotted_key),
    };

    let tbl = match path {
        Some(path) => {
            let mut current = map;
            for segment in path.split('.') {
                current = current.get(segment)?.as_object()?;
            }
            current
        }
        None => map,
    };

    tbl.get(leaf)
}

/// Read the value at `dotted_key` as text.
///
/// Scalars use their default formatting; a nested map comes back as compact
/// JSON so a flag bound to a whole sub-tree still receives a single string.
/// Fails with [`FlagError::NotFound`] when the path does not exist.
pub fn get(map: &ConfigMap, dotted_key: &str) -> Result<String, FlagError> {
    lookup(map, dotted_key)
        .map(scalar_text)
        .ok_or_else(|| FlagError::NotFound(dotted_key.to_string()))
}

/// Store `value` as a string at `dotted_key`, creating intermediate maps as
/// needed. A scalar sitting where an intermediate map is required is
/// replaced by an empty map.
pub fn set(map: &mut ConfigMap, dotted_key: &str, value: impl ToString) {
    set_value(map, dotted_key, Value::String(value.to_string()));
}

/// Like [`set`], but stores an arbitrary canonical value.
pub fn set_value(map: &mut ConfigMap, dotted_key: &str, value: Value) {
    let (path, leaf) = match dotted_key.rsplit_once('.') {
        Some((p, l)) => (Some(p), l),
        None => (None, dotted_key),
    };

    let mut current = map;
    if let Some(path) = path {
        for segment in path.split('.') {
            let slot = current
                .entry(segment)
                .or_insert_with(|| Value::Object(ConfigMap::new()));
            if !slot.is_object() {
                *slot = Value::Object(ConfigMap::new());
            }
            let Value::Object(next) = slot else {
                return;
            };
            current = next;
        }
    }

    current.insert(leaf.to_string(), value);
}

/// Flatten a map into `(dotted_key, value)` leaf pairs in key order.
///
/// Empty nested maps produce no entries.
pub fn leaves(map: &ConfigMap) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    collect_leaves(map, "", &mut out);
    out
}

fn collect_leaves<'a>(map: &'a ConfigMap, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
    for (key, value) in map {
        let dotted = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => collect_leaves(nested, &dotted, out),
            leaf => out.push((dotted, leaf)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;

    fn demo() -> ConfigMap {
        normalize(json!({"database": {"password": "12345", "port": 5432}, "debug": true})).unwrap()
    }

    #[test]
    fn get_leaf_scalar() {
        let map = demo();
        assert_eq!(get(&map, "database.password").unwrap(), "12345");
        assert_eq!(get(&map, "database.port").unwrap(), "5432");
        assert_eq!(get(&map, "debug").unwrap(), "true");
    }

    #[test]
    fn get_nested_map_as_compact_json() {
        let map = normalize(json!({"database": {"password": "12345"}})).unwrap();
        assert_eq!(get(&map, "database").unwrap(), r#"{"password":"12345"}"#);
    }

    #[test]
    fn get_missing_leaf_is_not_found() {
        let err = get(&demo(), "database.user").unwrap_err();
        assert!(matches!(err, FlagError::NotFound(ref k) if k == "database.user"));
    }

    #[test]
    fn get_missing_intermediate_is_not_found() {
        assert!(get(&demo(), "cache.size").is_err());
    }

    #[test]
    fn get_through_scalar_is_not_found() {
        assert!(get(&demo(), "debug.level").is_err());
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut map = demo();
        for (path, value) in [("database.password", "s3cret"), ("a.b.c", "deep"), ("top", "1")] {
            set(&mut map, path, value);
            assert_eq!(get(&map, path).unwrap(), value);
        }
    }

    #[test]
    fn set_creates_missing_intermediates() {
        let mut map = ConfigMap::new();
        set(&mut map, "server.tls.port", 443);
        assert_eq!(Value::Object(map), json!({"server": {"tls": {"port": "443"}}}));
    }

    #[test]
    fn set_replaces_scalar_intermediate() {
        let mut map = demo();
        set(&mut map, "debug.level", "trace");
        assert_eq!(map["debug"], json!({"level": "trace"}));
    }

    #[test]
    fn set_keeps_siblings() {
        let mut map = demo();
        set(&mut map, "database.user", "admin");
        assert_eq!(map["database"]["password"], json!("12345"));
        assert_eq!(map["database"]["user"], json!("admin"));
    }

    #[test]
    fn leaves_are_dotted_and_sorted() {
        let map = demo();
        let keys: Vec<String> = leaves(&map).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["database.password", "database.port", "debug"]);
    }
}
