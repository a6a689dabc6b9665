use std::path::PathBuf;
use thiserror::Error;

use crate::types::ConfigFormat;

/// Error type returned by custom [`Value`](crate::Value) setters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("invalid flag name '{0}': must not begin with '-' or contain '='")]
    InvalidName(String),

    #[error("flag redefined: {0}")]
    Redefined(String),

    #[error("no such flag -{0}")]
    NoSuchFlag(String),

    #[error("you are trying to run subcommand with name {0} but it doesn't exist")]
    UnknownSubCommand(String),

    #[error("bad flag syntax: {0}")]
    BadSyntax(String),

    #[error("flag provided but not defined: -{0}")]
    UndefinedFlag(String),

    #[error("flag needs an argument: -{0}")]
    MissingArgument(String),

    #[error("invalid value \"{value}\" for flag -{flag}: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },

    #[error("invalid value \"{value}\" for flag -{flag}: must be one of [{}]", .allowed.join(", "))]
    EnumViolation {
        flag: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("cannot alias flag -{0} to itself")]
    SelfAlias(String),

    #[error("help requested")]
    HelpRequested,

    #[error("config file path is empty")]
    EmptyPath,

    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported config format '{extension}' for {path} (expected json, yaml, yml, toml or properties)")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to decode {format} config: {reason}")]
    Decode {
        format: ConfigFormat,
        reason: String,
    },

    #[error("Failed to encode config as {format}: {reason}")]
    Encode {
        format: ConfigFormat,
        reason: String,
    },

    #[error("expected a map at the top level, found {0}")]
    TypeError(&'static str),

    #[error("config does not match the requested type: {0}")]
    ConfigShape(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("malformed line {line}: {content}")]
    MalformedLine { line: usize, content: String },
}

impl FlagError {
    /// Process status used by [`ErrorHandling::Exit`](crate::ErrorHandling::Exit).
    pub fn exit_code(&self) -> i32 {
        match self {
            FlagError::HelpRequested => 0,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_formats_correctly() {
        let err = FlagError::InvalidValue {
            flag: "port".into(),
            value: "abc".into(),
            reason: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("-port"));
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn enum_violation_lists_allowed_values() {
        let err = FlagError::EnumViolation {
            flag: "mode".into(),
            value: "slow".into(),
            allowed: vec!["fast".into(), "medium".into()],
        };
        assert!(err.to_string().contains("[fast, medium]"));
    }

    #[test]
    fn unknown_sub_command_names_the_command() {
        let err = FlagError::UnknownSubCommand("yadu".into());
        assert_eq!(
            err.to_string(),
            "you are trying to run subcommand with name yadu but it doesn't exist"
        );
    }

    #[test]
    fn help_exits_zero_everything_else_two() {
        assert_eq!(FlagError::HelpRequested.exit_code(), 0);
        assert_eq!(FlagError::UndefinedFlag("x".into()).exit_code(), 2);
        assert_eq!(FlagError::EmptyPath.exit_code(), 2);
    }
}
