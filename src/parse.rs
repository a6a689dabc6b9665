//! Command-line token scanning.
//!
//! [`split_sub_command`] decides whether the arguments start with a
//! sub-command name. [`ArgScanner`] walks `-name`, `--name`, `-name=value`
//! tokens from the front; the flag set decides how many tokens each flag
//! consumes, since only it knows which flags are boolean.

use std::collections::VecDeque;

use crate::error::FlagError;

/// A flag token: name plus the inline `=value`, if one was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlagToken {
    pub name: String,
    pub value: Option<String>,
}

/// Split off a leading sub-command: the first argument, when it does not
/// start with `-`.
pub(crate) fn split_sub_command(args: &[String]) -> Option<(&str, &[String])> {
    let (first, rest) = args.split_first()?;
    if first.starts_with('-') {
        return None;
    }
    Some((first.as_str(), rest))
}

pub(crate) struct ArgScanner {
    args: VecDeque<String>,
}

impl ArgScanner {
    pub fn new(args: Vec<String>) -> Self {
        Self { args: args.into() }
    }

    /// Next flag token, or `None` once flag parsing is over: no arguments
    /// left, a non-flag argument, or a `--` terminator (which is consumed).
    pub fn next_flag(&mut self) -> Result<Option<FlagToken>, FlagError> {
        let Some(front) = self.args.front() else {
            return Ok(None);
        };
        if !front.starts_with('-') {
            return Ok(None);
        }
        let Some(arg) = self.args.pop_front() else {
            return Ok(None);
        };
        if arg == "--" {
            return Ok(None);
        }

        let stripped = arg
            .strip_prefix("--")
            .or_else(|| arg.strip_prefix('-'))
            .unwrap_or(&arg);
        if stripped.is_empty() || stripped.starts_with(['-', '=']) {
            return Err(FlagError::BadSyntax(arg));
        }

        let token = match stripped.split_once('=') {
            Some((name, value)) => FlagToken {
                name: name.to_string(),
                value: Some(value.to_string()),
            },
            None => FlagToken {
                name: stripped.to_string(),
                value: None,
            },
        };
        Ok(Some(token))
    }

    /// Consume the next argument as a flag value.
    pub fn take_value(&mut self) -> Option<String> {
        self.args.pop_front()
    }

    /// Whatever was not consumed: the positional arguments.
    pub fn into_remaining(self) -> Vec<String> {
        self.args.into()
    }
}
