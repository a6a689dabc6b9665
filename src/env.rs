use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::FlagError;

/// Environment variable lookup used by the env feature.
///
/// Swappable so tests can pass synthetic data instead of touching the
/// process environment.
pub type EnvLookup = Rc<dyn Fn(&str) -> Option<String>>;

/// Lookup backed by the process environment.
pub fn process_env() -> EnvLookup {
    Rc::new(|name: &str| std::env::var(name).ok())
}

/// Lookup backed by a fixed set of variables.
pub fn vars_env(vars: impl IntoIterator<Item = (String, String)>) -> EnvLookup {
    let vars: BTreeMap<String, String> = vars.into_iter().collect();
    Rc::new(move |name: &str| vars.get(name).cloned())
}

/// Consult `primary` first, then `fallback`.
pub fn layered(primary: EnvLookup, fallback: EnvLookup) -> EnvLookup {
    Rc::new(move |name: &str| primary(name).or_else(|| fallback(name)))
}

/// Parse `.env`-style content into variables.
///
/// Blank lines and lines starting with `#` are skipped. Keys and values are
/// trimmed; everything after the first `=` is the value, so values may
/// contain `=` themselves. A line without `=` is an error.
pub fn parse_env(content: &str) -> Result<BTreeMap<String, String>, FlagError> {
    let mut vars = BTreeMap::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(FlagError::MalformedLine {
                line: index + 1,
                content: line.to_string(),
            });
        };
        vars.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(vars)
}
