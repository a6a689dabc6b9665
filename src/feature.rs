//! Binding features attached to a flag at definition time.
//!
//! Features run in a fixed priority order no matter how the caller listed
//! them: env (7), config (8), enum (10), alias (11). Enum validation sees
//! the value env and config produced; aliases copy the fully bound flag.

use tracing::debug;

use crate::dotpath;
use crate::error::FlagError;
use crate::flag::Flag;
use crate::normalize::ConfigMap;

/// Execution order of a feature; lower runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Env = 7,
    Config = 8,
    Enum = 10,
    Alias = 11,
}

/// A deferred binding requested while defining a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    /// Environment variables; the last non-empty one wins.
    Env(Vec<String>),
    /// Dotted config paths; the last one found wins.
    Config(Vec<String>),
    /// The only values the flag may hold.
    Enum(Vec<String>),
    /// Extra names sharing the flag's value.
    Alias(Vec<String>),
}

impl Feature {
    pub fn priority(&self) -> Priority {
        match self {
            Feature::Env(_) => Priority::Env,
            Feature::Config(_) => Priority::Config,
            Feature::Enum(_) => Priority::Enum,
            Feature::Alias(_) => Priority::Alias,
        }
    }
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// Bind environment variables to the flag. A value passed on the command
/// line still overrides them.
pub fn env<I, S>(names: I) -> Feature
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Feature::Env(strings(names))
}

/// Bind dotted config paths (e.g. `"database.password"`) to the flag.
pub fn cfg<I, S>(paths: I) -> Feature
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Feature::Config(strings(paths))
}

/// Restrict the flag to `options`. The flag's value when the feature runs
/// must already be one of them.
pub fn enums<I, S>(options: I) -> Feature
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Feature::Enum(strings(options))
}

/// Define extra flag names that share this flag's value and bindings.
pub fn alias<I, S>(names: I) -> Feature
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Feature::Alias(strings(names))
}

/// Shorthand for a single alias, typically a one-letter name.
pub fn short(name: &str) -> Feature {
    alias([name])
}

/// Sort features by priority, keeping caller order among equals.
pub(crate) fn ordered(features: impl IntoIterator<Item = Feature>) -> Vec<Feature> {
    let mut features: Vec<Feature> = features.into_iter().collect();
    features.sort_by_key(Feature::priority);
    features
}

/// Record `names` on the flag and apply every non-empty value found by
/// `lookup`. Returns whether the flag was assigned.
pub(crate) fn bind_env(
    flag: &Flag,
    names: &[String],
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<bool, FlagError> {
    let mut assigned = false;
    for name in names {
        flag.bindings_mut().envs.insert(name.clone());
        let Some(value) = lookup(name).filter(|v| !v.is_empty()) else {
            continue;
        };
        flag.set(&value)?;
        debug!(flag = flag.name(), env = %name, "flag set from environment");
        assigned = true;
    }
    Ok(assigned)
}

/// Record `paths` on the flag and resolve them against `config`.
///
/// A path holding a non-empty value assigns the flag. A missing path is
/// back-filled with the flag's current value. A path that exists but is
/// empty is left alone on both sides. Without a loaded config the paths are
/// only recorded; loading a config later re-runs this binding.
pub(crate) fn bind_config(
    flag: &Flag,
    paths: &[String],
    config: Option<&mut ConfigMap>,
) -> Result<bool, FlagError> {
    flag.bindings_mut().cfgs.extend(paths.iter().cloned());
    let Some(config) = config else {
        return Ok(false);
    };

    let mut assigned = false;
    for path in paths {
        match dotpath::get(config, path) {
            Ok(value) if value.is_empty() => {}
            Ok(value) => {
                flag.set(&value)?;
                debug!(flag = flag.name(), path = %path, "flag set from config");
                assigned = true;
            }
            Err(FlagError::NotFound(_)) => {
                let current = flag.text();
                debug!(flag = flag.name(), path = %path, value = %current, "config path back-filled");
                dotpath::set(config, path, current);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(assigned)
}

/// Check the flag's current value against `options`, then record them.
pub(crate) fn bind_enum(flag: &Flag, options: &[String]) -> Result<(), FlagError> {
    let current = flag.text();
    if !options.contains(&current) {
        return Err(FlagError::EnumViolation {
            flag: flag.name().to_string(),
            value: current,
            allowed: options.to_vec(),
        });
    }
    flag.bindings_mut().enums.extend(options.iter().cloned());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::{Handle, Typed};
    use crate::normalize::normalize;
    use crate::value::Scalar;
    use serde_json::json;

    fn string_flag(default: &str) -> Typed<String> {
        Handle::new("password", "", Scalar::new(default.to_string()))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn features_sort_by_priority_regardless_of_order() {
        let sorted = ordered([alias(["p"]), enums(["a"]), cfg(["x"]), env(["E"])]);
        let priorities: Vec<Priority> = sorted.iter().map(Feature::priority).collect();
        assert_eq!(
            priorities,
            vec![Priority::Env, Priority::Config, Priority::Enum, Priority::Alias]
        );
    }

    #[test]
    fn sort_is_stable_within_a_priority() {
        let sorted = ordered([env(["A"]), alias(["p"]), env(["B"])]);
        assert_eq!(sorted[0], env(["A"]));
        assert_eq!(sorted[1], env(["B"]));
    }

    #[test]
    fn short_is_single_alias() {
        assert_eq!(short("h"), Feature::Alias(vec!["h".into()]));
    }

    #[test]
    fn env_last_non_empty_wins() {
        let h = string_flag("");
        let lookup = |name: &str| match name {
            "FIRST" => Some("one".to_string()),
            "EMPTY" => Some(String::new()),
            "SECOND" => Some("two".to_string()),
            _ => None,
        };
        let names = strings(["FIRST", "SECOND", "EMPTY", "MISSING"]);
        assert!(bind_env(h.flag(), &names, &lookup).unwrap());
        assert_eq!(h.get(), "two");
        assert_eq!(h.flag().envs().len(), 4);
    }

    #[test]
    fn env_without_values_only_records() {
        let h = string_flag("dflt");
        assert!(!bind_env(h.flag(), &strings(["PASSWORD"]), &no_env).unwrap());
        assert_eq!(h.get(), "dflt");
        assert_eq!(h.flag().envs(), vec!["PASSWORD"]);
    }

    #[test]
    fn env_value_that_fails_to_parse_is_an_error() {
        let h: Typed<i64> = Handle::new("port", "", Scalar::new(0));
        let lookup = |_: &str| Some("eighty".to_string());
        assert!(bind_env(h.flag(), &strings(["PORT"]), &lookup).is_err());
    }

    #[test]
    fn config_value_assigns_flag() {
        let h = string_flag("");
        let mut config = normalize(json!({"database": {"password": "12345"}})).unwrap();
        let assigned = bind_config(h.flag(), &strings(["database.password"]), Some(&mut config)).unwrap();
        assert!(assigned);
        assert_eq!(h.get(), "12345");
    }

    #[test]
    fn config_sub_tree_is_compact_json() {
        let h = string_flag("");
        let mut config = normalize(json!({"database": {"password": "12345"}})).unwrap();
        bind_config(h.flag(), &strings(["database"]), Some(&mut config)).unwrap();
        assert_eq!(h.get(), r#"{"password":"12345"}"#);
    }

    #[test]
    fn missing_config_path_is_back_filled() {
        let h = string_flag("12345");
        let mut config = normalize(json!({"database": {"user": "admin"}})).unwrap();
        let assigned = bind_config(h.flag(), &strings(["database.password"]), Some(&mut config)).unwrap();
        assert!(!assigned);
        assert_eq!(dotpath::get(&config, "database.password").unwrap(), "12345");
        assert_eq!(dotpath::get(&config, "database.user").unwrap(), "admin");
    }

    #[test]
    fn empty_config_value_is_left_alone() {
        let h = string_flag("dflt");
        let mut config = normalize(json!({"database": {"password": ""}})).unwrap();
        bind_config(h.flag(), &strings(["database.password"]), Some(&mut config)).unwrap();
        assert_eq!(h.get(), "dflt");
        assert_eq!(config["database"]["password"], json!(""));
    }

    #[test]
    fn config_without_map_only_records() {
        let h = string_flag("dflt");
        assert!(!bind_config(h.flag(), &strings(["database.password"]), None).unwrap());
        assert_eq!(h.flag().cfgs(), vec!["database.password"]);
    }

    #[test]
    fn enum_rejects_current_value_outside_options() {
        let h = string_flag("");
        let err = bind_enum(h.flag(), &strings(["value", "value2"])).unwrap_err();
        assert!(matches!(err, FlagError::EnumViolation { .. }));
        assert!(h.flag().enums().is_empty());
    }

    #[test]
    fn enum_guards_later_sets() {
        let h = string_flag("value2");
        bind_enum(h.flag(), &strings(["value", "value2"])).unwrap();
        assert!(h.flag().set("d").is_err());
        assert_eq!(h.get(), "value2");
        h.flag().set("value").unwrap();
        assert_eq!(h.get(), "value");
    }
}
