//! Config file loading.
//!
//! The format comes from the file extension (case-insensitive). Decoding is
//! delegated to [`format::decode`](crate::format::decode); the result is a
//! canonical [`ConfigMap`].

use std::path::Path;

use tracing::debug;

use crate::error::FlagError;
use crate::format;
use crate::normalize::ConfigMap;
use crate::types::ConfigFormat;

/// Resolve the format for `path`, or fail with
/// [`FlagError::UnsupportedFormat`].
pub fn format_for(path: &Path) -> Result<ConfigFormat, FlagError> {
    ConfigFormat::from_path(path).ok_or_else(|| FlagError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })
}

/// Read and decode the config file at `path`.
pub fn load_config(path: &Path) -> Result<ConfigMap, FlagError> {
    if path.as_os_str().is_empty() {
        return Err(FlagError::EmptyPath);
    }
    let format = format_for(path)?;

    let content = std::fs::read_to_string(path).map_err(|e| FlagError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let map = format::decode(format, &content).map_err(|e| match e {
        FlagError::Decode { reason, .. } => FlagError::ParseError {
            path: path.to_path_buf(),
            reason,
        },
        other => FlagError::ParseError {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    debug!(path = %path.display(), %format, keys = map.len(), "config loaded");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dotpath;
    use crate::fixtures::test::{DEMO_JSON, DEMO_TOML, DEMO_YAML, write_file};
    use tempfile::TempDir;

    #[test]
    fn loads_json_yaml_yml_toml() {
        let dir = TempDir::new().unwrap();
        for (name, content) in [
            ("demo.json", DEMO_JSON),
            ("demo.yaml", DEMO_YAML),
            ("demo.yml", DEMO_YAML),
            ("demo.TOML", DEMO_TOML),
        ] {
            let path = write_file(&dir, name, content);
            let map = load_config(&path).unwrap();
            assert_eq!(dotpath::get(&map, "database.password").unwrap(), "12345", "{name}");
        }
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(load_config(Path::new("")), Err(FlagError::EmptyPath)));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(&dir.path().join("cfgxyzsdfc.json")).unwrap_err();
        assert!(matches!(err, FlagError::ReadError { .. }));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "demo.abc", DEMO_JSON);
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, FlagError::UnsupportedFormat { ref extension, .. } if extension == "abc"));
    }

    #[test]
    fn missing_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "demo", DEMO_JSON);
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, FlagError::UnsupportedFormat { ref extension, .. } if extension.is_empty()));
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "broken.json", "{");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, FlagError::ParseError { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
