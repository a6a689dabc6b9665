//! The flag-set scope: registry, binding features, parsing and sub-commands.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::dotpath;
use crate::env::{self, EnvLookup};
use crate::error::{BoxError, FlagError};
use crate::feature::{self, Feature};
use crate::file;
use crate::flag::{Flag, Handle, Typed};
use crate::normalize::ConfigMap;
use crate::parse::{self, ArgScanner};
use crate::persist;
use crate::types::ErrorHandling;
use crate::usage;
use crate::value::{Func, Scalar, Text, Value};

/// Config state shared by a scope and every sub-command scope spawned
/// from it. A write through any scope (a back-fill, a reload) is visible to
/// all of them.
#[derive(Debug, Default)]
struct ConfigState {
    path: Option<PathBuf>,
    map: Option<ConfigMap>,
}

/// Sub-command handler: receives the sub-command's own scope and the
/// arguments after the sub-command name.
pub type Handler = Box<dyn FnMut(&mut FlagSet, &[String]) -> Result<(), FlagError>>;

struct SubCommand {
    scope: FlagSet,
    description: String,
    handler: Handler,
}

/// One flag-set scope.
///
/// Flags are defined with the typed methods ([`string`](Self::string),
/// [`int`](Self::int), ...), each taking binding [`Feature`]s. Values from
/// the environment and a loaded config file are applied at definition time;
/// [`parse`](Self::parse) runs last and therefore has the final say.
pub struct FlagSet {
    name: String,
    error_handling: ErrorHandling,
    flags: BTreeMap<String, Flag>,
    actual: BTreeMap<String, Flag>,
    // Names assigned by `parse` or `set`; a config reload leaves them alone.
    explicit: BTreeMap<String, Flag>,
    args: Vec<String>,
    parsed: bool,
    config: Rc<RefCell<ConfigState>>,
    env: EnvLookup,
    sub_commands: BTreeMap<String, SubCommand>,
}

impl FlagSet {
    pub fn new(name: impl Into<String>, error_handling: ErrorHandling) -> Self {
        Self {
            name: name.into(),
            error_handling,
            flags: BTreeMap::new(),
            actual: BTreeMap::new(),
            explicit: BTreeMap::new(),
            args: Vec::new(),
            parsed: false,
            config: Rc::new(RefCell::new(ConfigState::default())),
            env: env::process_env(),
            sub_commands: BTreeMap::new(),
        }
    }

    /// A sub-command scope sharing this scope's config and environment.
    fn child(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            error_handling: self.error_handling,
            flags: BTreeMap::new(),
            actual: BTreeMap::new(),
            explicit: BTreeMap::new(),
            args: Vec::new(),
            parsed: false,
            config: Rc::clone(&self.config),
            env: Rc::clone(&self.env),
            sub_commands: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    /// Change the parse error policy of this scope and its sub-commands.
    pub fn set_error_handling(&mut self, error_handling: ErrorHandling) {
        for sub in self.sub_commands.values_mut() {
            sub.scope.set_error_handling(error_handling);
        }
        self.error_handling = error_handling;
    }

    /// Replace the environment lookup for this scope and its sub-commands.
    ///
    /// Only flags defined afterwards are affected.
    pub fn set_env_lookup(&mut self, lookup: EnvLookup) {
        for sub in self.sub_commands.values_mut() {
            sub.scope.set_env_lookup(Rc::clone(&lookup));
        }
        self.env = lookup;
    }

    /// Read a `.env` file and consult it after the current environment
    /// lookup for flags defined afterwards.
    pub fn load_env_file(&mut self, path: impl AsRef<Path>) -> Result<(), FlagError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| FlagError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let vars = env::parse_env(&content)?;
        debug!(path = %path.display(), vars = vars.len(), "env file loaded");
        let lookup = env::layered(Rc::clone(&self.env), env::vars_env(vars));
        self.set_env_lookup(lookup);
        Ok(())
    }

    // -- Definition -----------------------------------------------------------

    /// Define a flag backed by any [`Value`].
    ///
    /// If a feature fails, the flag, any aliases it gained and any config
    /// back-fills it made are removed again before the error is returned.
    pub fn var<V: Value + 'static>(
        &mut self,
        name: &str,
        value: V,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Handle<V>, FlagError> {
        let handle = Handle::new(name, usage, value);
        self.insert(handle.flag().clone())?;

        let snapshot = self.config.borrow().map.clone();
        if let Err(err) = self.apply_features(handle.flag(), features) {
            self.discard(handle.flag());
            self.config.borrow_mut().map = snapshot;
            return Err(err);
        }
        // Aliases are added last; mark them too if a binding set the value.
        if self.actual.contains_key(name) {
            self.mark_set(handle.flag());
        }
        Ok(handle)
    }

    pub fn bool(
        &mut self,
        name: &str,
        value: bool,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Typed<bool>, FlagError> {
        self.var(name, Scalar::new(value), usage, features)
    }

    pub fn int(
        &mut self,
        name: &str,
        value: isize,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Typed<isize>, FlagError> {
        self.var(name, Scalar::new(value), usage, features)
    }

    pub fn int64(
        &mut self,
        name: &str,
        value: i64,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Typed<i64>, FlagError> {
        self.var(name, Scalar::new(value), usage, features)
    }

    pub fn uint(
        &mut self,
        name: &str,
        value: usize,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Typed<usize>, FlagError> {
        self.var(name, Scalar::new(value), usage, features)
    }

    pub fn uint64(
        &mut self,
        name: &str,
        value: u64,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Typed<u64>, FlagError> {
        self.var(name, Scalar::new(value), usage, features)
    }

    pub fn string(
        &mut self,
        name: &str,
        value: impl Into<String>,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Typed<String>, FlagError> {
        self.var(name, Scalar::new(value.into()), usage, features)
    }

    pub fn float64(
        &mut self,
        name: &str,
        value: f64,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Typed<f64>, FlagError> {
        self.var(name, Scalar::new(value), usage, features)
    }

    pub fn duration(
        &mut self,
        name: &str,
        value: Duration,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Typed<Duration>, FlagError> {
        self.var(name, Scalar::new(value), usage, features)
    }

    /// Define a flag of any type that parses from and prints to text.
    pub fn text<T>(
        &mut self,
        name: &str,
        value: T,
        usage: &str,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Handle<Text<T>>, FlagError>
    where
        T: FromStr + Display + Clone + 'static,
        T::Err: Display,
    {
        self.var(name, Text::new(value), usage, features)
    }

    /// Define a flag that calls `callback` with every value it is given.
    pub fn func(
        &mut self,
        name: &str,
        usage: &str,
        callback: impl FnMut(&str) -> Result<(), BoxError> + 'static,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Flag, FlagError> {
        let handle = self.var(name, Func::new(callback), usage, features)?;
        Ok(handle.flag().clone())
    }

    fn insert(&mut self, flag: Flag) -> Result<(), FlagError> {
        let name = flag.name();
        if name.is_empty() || name.starts_with('-') || name.contains('=') {
            return Err(FlagError::InvalidName(name.to_string()));
        }
        if self.flags.contains_key(name) {
            return Err(FlagError::Redefined(name.to_string()));
        }
        self.flags.insert(name.to_string(), flag);
        Ok(())
    }

    /// Every registered name reading and writing `flag`'s value cell.
    fn alias_group(&self, flag: &Flag) -> Vec<Flag> {
        self.flags
            .values()
            .filter(|f| f.shares_value_with(flag))
            .cloned()
            .collect()
    }

    /// Record `flag` and all of its aliases as set.
    fn mark_set(&mut self, flag: &Flag) {
        for member in self.alias_group(flag) {
            self.actual.insert(member.name().to_string(), member);
        }
    }

    fn mark_explicit(&mut self, flag: &Flag) {
        self.mark_set(flag);
        for member in self.alias_group(flag) {
            self.explicit.insert(member.name().to_string(), member);
        }
    }

    fn discard(&mut self, flag: &Flag) {
        for member in self.alias_group(flag) {
            self.flags.remove(member.name());
            self.actual.remove(member.name());
        }
    }

    fn apply_features(
        &mut self,
        flag: &Flag,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<(), FlagError> {
        for feature in feature::ordered(features) {
            match feature {
                Feature::Env(names) => {
                    if feature::bind_env(flag, &names, &*self.env)? {
                        self.mark_set(flag);
                    }
                }
                Feature::Config(paths) => {
                    let assigned = {
                        let mut state = self.config.borrow_mut();
                        feature::bind_config(flag, &paths, state.map.as_mut())?
                    };
                    if assigned {
                        self.mark_set(flag);
                    }
                }
                Feature::Enum(options) => feature::bind_enum(flag, &options)?,
                Feature::Alias(names) => {
                    for name in names {
                        self.alias(flag, &name)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn alias(&mut self, flag: &Flag, name: &str) -> Result<(), FlagError> {
        if name == flag.name() {
            return Err(FlagError::SelfAlias(name.to_string()));
        }
        let alias = flag.alias_as(name);
        self.insert(alias.clone())?;
        flag.link_alias(name);
        alias.link_alias(flag.name());
        Ok(())
    }

    // -- Registry -------------------------------------------------------------

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }

    /// Assign `value` to the named flag and record it as set.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), FlagError> {
        let flag = self
            .flags
            .get(name)
            .cloned()
            .ok_or_else(|| FlagError::NoSuchFlag(name.to_string()))?;
        flag.set(value)?;
        self.mark_explicit(&flag);
        Ok(())
    }

    /// Visit every flag in name order.
    pub fn visit_all(&self, mut f: impl FnMut(&Flag)) {
        for flag in self.flags.values() {
            f(flag);
        }
    }

    /// Visit, in name order, only the flags that have been set by an
    /// argument, [`set`](Self::set) or a binding feature.
    pub fn visit(&self, mut f: impl FnMut(&Flag)) {
        for flag in self.actual.values() {
            f(flag);
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.actual.contains_key(name)
    }

    /// Number of flags that have been set.
    pub fn nflag(&self) -> usize {
        self.actual.len()
    }

    /// Positional arguments left after parsing.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn narg(&self) -> usize {
        self.args.len()
    }

    pub fn parsed(&self) -> bool {
        self.parsed
    }

    // -- Sub-commands ---------------------------------------------------------

    /// Register a sub-command. When the first argument given to
    /// [`parse`](Self::parse) is `name`, `handler` runs with the
    /// sub-command's own scope and the remaining arguments, and this scope
    /// parses nothing itself.
    pub fn sub_cmd<F>(&mut self, name: &str, handler: F) -> Result<(), FlagError>
    where
        F: FnMut(&mut FlagSet, &[String]) -> Result<(), FlagError> + 'static,
    {
        self.sub_cmd_with_description(name, "", handler)
    }

    /// Like [`sub_cmd`](Self::sub_cmd), with a one-line description shown
    /// next to the name in [`usage`](Self::usage).
    pub fn sub_cmd_with_description<F>(
        &mut self,
        name: &str,
        description: &str,
        handler: F,
    ) -> Result<(), FlagError>
    where
        F: FnMut(&mut FlagSet, &[String]) -> Result<(), FlagError> + 'static,
    {
        if name.is_empty() || name.starts_with('-') {
            return Err(FlagError::InvalidName(name.to_string()));
        }
        if self.sub_commands.contains_key(name) {
            return Err(FlagError::Redefined(name.to_string()));
        }
        let scope = self.child(name);
        self.sub_commands.insert(
            name.to_string(),
            SubCommand {
                scope,
                description: description.to_string(),
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    pub fn sub_command(&self, name: &str) -> Option<&FlagSet> {
        self.sub_commands.get(name).map(|sub| &sub.scope)
    }

    pub fn sub_command_mut(&mut self, name: &str) -> Option<&mut FlagSet> {
        self.sub_commands.get_mut(name).map(|sub| &mut sub.scope)
    }

    /// Registered sub-command names, sorted.
    pub fn sub_command_names(&self) -> Vec<&str> {
        self.sub_commands.keys().map(String::as_str).collect()
    }

    // -- Configuration --------------------------------------------------------

    /// Load a config file and share it with every scope in this tree.
    ///
    /// Flags already bound to config paths are re-evaluated against the new
    /// map, in this scope and all of its sub-command scopes.
    pub fn load_cfg(&mut self, path: impl AsRef<Path>) -> Result<(), FlagError> {
        let path = path.as_ref();
        let map = file::load_config(path)?;
        {
            let mut state = self.config.borrow_mut();
            state.path = Some(path.to_path_buf());
            state.map = Some(map);
        }
        self.rebind_config()
    }

    fn rebind_config(&mut self) -> Result<(), FlagError> {
        let mut done: Vec<Flag> = Vec::new();
        let flags: Vec<Flag> = self.flags.values().cloned().collect();
        for flag in flags {
            let paths = flag.cfgs();
            // Aliases share bindings; resolve each value cell once. Values
            // given on the command line outrank the config.
            if paths.is_empty()
                || self.explicit.contains_key(flag.name())
                || done.iter().any(|d| d.shares_value_with(&flag))
            {
                continue;
            }
            let assigned = {
                let mut state = self.config.borrow_mut();
                feature::bind_config(&flag, &paths, state.map.as_mut())?
            };
            if assigned {
                self.mark_set(&flag);
            }
            done.push(flag);
        }

        for sub in self.sub_commands.values_mut() {
            sub.scope.rebind_config()?;
        }
        Ok(())
    }

    /// Path of the loaded config file.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.borrow().path.clone()
    }

    /// Snapshot of the loaded config, including back-filled defaults.
    pub fn config(&self) -> Option<ConfigMap> {
        self.config.borrow().map.clone()
    }

    /// Text at a dotted path of the loaded config.
    pub fn config_value(&self, dotted_key: &str) -> Option<String> {
        let state = self.config.borrow();
        dotpath::get(state.map.as_ref()?, dotted_key).ok()
    }

    /// Deserialize the loaded config (or an empty map) into `T`.
    pub fn config_as<T: DeserializeOwned>(&self) -> Result<T, FlagError> {
        let map = self.config().unwrap_or_default();
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| FlagError::ConfigShape(e.to_string()))
    }

    /// The loaded config with every bound path in this tree filled in with
    /// its flag's current value where the map lacks it.
    pub fn effective_config(&self) -> ConfigMap {
        let mut map = self.config().unwrap_or_default();
        self.fill_defaults(&mut map);
        map
    }

    fn fill_defaults(&self, map: &mut ConfigMap) {
        for flag in self.flags.values() {
            for path in flag.cfgs() {
                if dotpath::lookup(map, &path).is_none() {
                    dotpath::set(map, &path, flag.text());
                }
            }
        }
        for sub in self.sub_commands.values() {
            sub.scope.fill_defaults(map);
        }
    }

    /// Write [`effective_config`](Self::effective_config) back to the
    /// loaded config file and return its path.
    pub fn save_cfg(&self) -> Result<PathBuf, FlagError> {
        let path = self.config_path().ok_or(FlagError::EmptyPath)?;
        self.save_cfg_to(&path)?;
        Ok(path)
    }

    /// Write [`effective_config`](Self::effective_config) to `path`, in the
    /// format its extension names.
    pub fn save_cfg_to(&self, path: impl AsRef<Path>) -> Result<(), FlagError> {
        persist::write_config(path.as_ref(), &self.effective_config())
    }

    // -- Parsing --------------------------------------------------------------

    /// Parse command-line arguments (without the program name).
    ///
    /// Failures go through this scope's [`ErrorHandling`].
    pub fn parse<I, S>(&mut self, args: I) -> Result<(), FlagError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        match self.parse_args(args) {
            Ok(()) => Ok(()),
            Err(err) => self.handle_error(err),
        }
    }

    fn parse_args(&mut self, args: Vec<String>) -> Result<(), FlagError> {
        self.parsed = true;
        self.args.clear();

        if let Some((name, rest)) = parse::split_sub_command(&args) {
            let sub = self
                .sub_commands
                .get_mut(name)
                .ok_or_else(|| FlagError::UnknownSubCommand(name.to_string()))?;
            debug!(scope = %self.name, sub_command = name, "dispatching sub-command");
            return (sub.handler)(&mut sub.scope, rest);
        }

        let mut scanner = ArgScanner::new(args);
        while let Some(token) = scanner.next_flag()? {
            let flag = match self.flags.get(&token.name) {
                Some(flag) => flag.clone(),
                None if token.name == "help" || token.name == "h" => {
                    return Err(FlagError::HelpRequested);
                }
                None => return Err(FlagError::UndefinedFlag(token.name)),
            };

            let value = if flag.is_bool_flag() {
                token.value.unwrap_or_else(|| "true".to_string())
            } else {
                match token.value.or_else(|| scanner.take_value()) {
                    Some(value) => value,
                    None => return Err(FlagError::MissingArgument(token.name)),
                }
            };

            flag.set(&value)?;
            trace!(scope = %self.name, flag = %token.name, %value, "flag set from argument");
            self.mark_explicit(&flag);
        }

        self.args = scanner.into_remaining();
        Ok(())
    }

    fn handle_error(&self, err: FlagError) -> Result<(), FlagError> {
        match self.error_handling {
            ErrorHandling::Continue => Err(err),
            ErrorHandling::Exit => {
                if !matches!(err, FlagError::HelpRequested) {
                    eprintln!("{err}");
                }
                eprint!("{}", self.usage());
                std::process::exit(err.exit_code());
            }
            ErrorHandling::Panic => panic!("{err}"),
        }
    }

    // -- Usage ----------------------------------------------------------------

    /// Usage entries for every flag, in name order.
    pub fn default_usage(&self) -> String {
        usage::defaults(self.flags.values())
    }

    /// Header, flag entries and sub-commands with their descriptions.
    pub fn usage(&self) -> String {
        let subs = self
            .sub_commands
            .iter()
            .map(|(name, sub)| (name.as_str(), sub.description.as_str()));
        usage::render(&self.name, self.flags.values(), subs)
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSet")
            .field("name", &self.name)
            .field("error_handling", &self.error_handling)
            .field("flags", &self.flags.keys().collect::<Vec<_>>())
            .field("args", &self.args)
            .field("sub_commands", &self.sub_commands.keys().collect::<Vec<_>>())
            .finish()
    }
}
