//! Decoding config text into a [`ConfigMap`] and encoding it back.
//!
//! JSON, YAML and TOML go through their serde libraries and then the
//! normalizer. Properties files use a small line reader; their dotted keys
//! are expanded into nested maps so the same dotted paths work for every
//! format.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::dotpath;
use crate::error::FlagError;
use crate::normalize::{ConfigMap, normalize, scalar_text};
use crate::types::ConfigFormat;

/// Decode `content` in the given format.
pub fn decode(format: ConfigFormat, content: &str) -> Result<ConfigMap, FlagError> {
    let decode_err = |reason: String| FlagError::Decode { format, reason };

    match format {
        ConfigFormat::Json => {
            let value: Value = serde_json::from_str(content).map_err(|e| decode_err(e.to_string()))?;
            normalize(value)
        }
        ConfigFormat::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| decode_err(e.to_string()))?;
            // An empty document decodes to null.
            if value.is_null() {
                return Ok(ConfigMap::new());
            }
            normalize(value)
        }
        ConfigFormat::Toml => {
            let table: toml::Table = toml::from_str(content).map_err(|e| decode_err(e.to_string()))?;
            normalize(table)
        }
        ConfigFormat::Properties => {
            let props = parse_properties(content);
            if let Some((table, key)) = table_conflict(&props) {
                return Err(decode_err(format!(
                    "key '{table}' holds a value and is also the table of '{key}'"
                )));
            }
            let mut map = ConfigMap::new();
            for (key, value) in props {
                dotpath::set(&mut map, &key, value);
            }
            Ok(map)
        }
    }
}

/// A key that is also a dotted prefix of another key, e.g. `a` and `a.b`.
/// Expanding both into nested maps would drop one of them.
fn table_conflict(props: &BTreeMap<String, String>) -> Option<(&str, &str)> {
    props.keys().find_map(|key| {
        let mut rest = key.as_str();
        while let Some((head, _)) = rest.rsplit_once('.') {
            if props.contains_key(head) {
                return Some((head, key.as_str()));
            }
            rest = head;
        }
        None
    })
}

/// Encode `map` as text in the given format.
pub fn encode(format: ConfigFormat, map: &ConfigMap) -> Result<String, FlagError> {
    let encode_err = |reason: String| FlagError::Encode { format, reason };

    match format {
        ConfigFormat::Json => {
            let mut text = serde_json::to_string_pretty(map).map_err(|e| encode_err(e.to_string()))?;
            text.push('\n');
            Ok(text)
        }
        ConfigFormat::Yaml => serde_yaml::to_string(map).map_err(|e| encode_err(e.to_string())),
        ConfigFormat::Toml => toml::to_string(map).map_err(|e| encode_err(e.to_string())),
        ConfigFormat::Properties => Ok(dotpath::leaves(map)
            .into_iter()
            .map(|(key, value)| format!("{key}={}\n", scalar_text(value)))
            .collect()),
    }
}

/// Parse properties content: `key=value` lines, `#` comments (whole-line or
/// trailing), whitespace trimmed. Lines without `=` are ignored.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                props.insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    props
}
