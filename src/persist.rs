//! Writing a config map back to disk.
//!
//! Existing TOML files are patched with `toml_edit` so comments and
//! formatting survive; every other case is a full re-encode in the format
//! chosen by extension. Parent directories are created as needed.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::dotpath;
use crate::error::FlagError;
use crate::file::format_for;
use crate::format;
use crate::normalize::ConfigMap;
use crate::types::ConfigFormat;

/// Pure function: patch every leaf of `map` into a TOML document string.
pub fn set_in_document(content: &str, map: &ConfigMap) -> Result<String, FlagError> {
    let mut doc: toml_edit::DocumentMut =
        content
            .parse()
            .map_err(|e: toml_edit::TomlError| FlagError::Decode {
                format: ConfigFormat::Toml,
                reason: e.to_string(),
            })?;

    for (key, value) in dotpath::leaves(map) {
        let Some(value) = edit_value(value) else {
            continue;
        };
        let (path, leaf) = match key.rsplit_once('.') {
            Some((p, l)) => (Some(p), l),
            None => (None, key.as_str()),
        };

        // Navigate to the key, creating intermediate tables as needed.
        let mut current: &mut toml_edit::Item = doc.as_item_mut();
        for segment in path.into_iter().flat_map(|p| p.split('.')) {
            if !current.get(segment).is_some_and(toml_edit::Item::is_table_like) {
                current[segment] = toml_edit::Item::Table(toml_edit::Table::new());
            }
            current = &mut current[segment];
        }
        current[leaf] = toml_edit::value(value);
    }

    Ok(doc.to_string())
}

/// Convert a canonical value for `toml_edit`. `null` has no TOML form.
fn edit_value(value: &Value) -> Option<toml_edit::Value> {
    Some(match value {
        Value::Null => return None,
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64()?.into(),
        },
        Value::String(s) => s.as_str().into(),
        Value::Array(items) => toml_edit::Value::Array(items.iter().filter_map(edit_value).collect()),
        Value::Object(map) => toml_edit::Value::InlineTable(
            map.iter()
                .filter_map(|(k, v)| Some((k.as_str(), edit_value(v)?)))
                .collect(),
        ),
    })
}

/// I/O wrapper: writes `map` to `path`, patching an existing TOML file in
/// place.
pub fn write_config(path: &Path, map: &ConfigMap) -> Result<(), FlagError> {
    if path.as_os_str().is_empty() {
        return Err(FlagError::EmptyPath);
    }
    let format = format_for(path)?;

    let existing = match std::fs::read_to_string(path) {
        Ok(c) => Some(c),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(FlagError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let content = match (format, existing) {
        (ConfigFormat::Toml, Some(existing)) => set_in_document(&existing, map)?,
        _ => format::encode(format, map)?,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FlagError::WriteError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::write(path, &content).map_err(|e| FlagError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    debug!(path = %path.display(), %format, "config written");
    Ok(())
}
