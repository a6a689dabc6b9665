use std::fmt;
use std::path::Path;

/// What a [`FlagSet`](crate::FlagSet) does when parsing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Return the error to the caller.
    #[default]
    Continue,
    /// Print the error and usage to stderr, then exit with
    /// [`FlagError::exit_code`](crate::FlagError::exit_code).
    Exit,
    /// Panic with the error message.
    Panic,
}

/// Config file formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
    /// Line-oriented `key=value` files with `#` comments.
    Properties,
}

impl ConfigFormat {
    /// Pick the format from a path's extension, case-insensitively.
    ///
    /// Returns `None` for a missing or unrecognized extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "toml" => Some(ConfigFormat::Toml),
            "properties" => Some(ConfigFormat::Properties),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigFormat::Json => "JSON",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Properties => "properties",
        };
        f.write_str(name)
    }
}
