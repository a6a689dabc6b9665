//! Command-line flags that can also be fed from environment variables and
//! config files, with enum constraints, aliases and git-style sub-commands.
//!
//! Each flag is defined once, with its type, default and usage text, plus an
//! optional list of binding [`Feature`]s:
//!
//! ```ignore
//! let mut fs = FlagSet::new("app", ErrorHandling::Exit);
//! fs.load_cfg("app.json")?;
//! let password = fs.string(
//!     "password",
//!     "",
//!     "database password",
//!     [env(["PASSWORD"]), cfg(["database.password"]), short("p")],
//! )?;
//! fs.parse(std::env::args().skip(1))?;
//! println!("{}", password.get());
//! ```
//!
//! # Value precedence
//!
//! Features run when the flag is defined, in a fixed order no matter how
//! they were listed. Command-line parsing runs afterwards:
//!
//! ```text
//! Default value         fs.string("password", "", ...)
//!        ↑ overridden by
//! Environment           env(["PASSWORD"])       last non-empty variable wins
//!        ↑ overridden by
//! Config file           cfg(["database.password"])
//!        ↑ overridden by
//! Command line          -password=...
//! ```
//!
//! Enum validation ([`enums`]) runs after env and config, so the value they
//! produce must already be allowed. Aliases ([`alias`], [`short`]) run last
//! and share the flag's value cell: setting `-p` is the same as setting
//! `-password`.
//!
//! # Config files
//!
//! [`FlagSet::load_cfg`] reads JSON, YAML, TOML or Java-style properties,
//! chosen by extension. Nested tables are addressed with dotted paths. A
//! bound path that the file lacks is back-filled with the flag's value, so
//! [`FlagSet::save_cfg`] can write a complete config. A bound path pointing
//! at a table yields its compact JSON text.
//!
//! Flags defined before the config is loaded are re-evaluated by
//! `load_cfg`; the config is shared with every sub-command scope.
//!
//! # Sub-commands
//!
//! [`FlagSet::sub_cmd`] registers a handler with its own isolated scope.
//! When the first argument names a sub-command, the handler receives that
//! scope and the remaining arguments; the parent parses nothing itself.
//!
//! # Errors
//!
//! Definition mistakes (bad names, redefinitions, enum violations on the
//! default) are returned directly. Parse failures go through the scope's
//! [`ErrorHandling`]: returned, printed with usage before exiting, or
//! raised as a panic.
//!
//! # Logging
//!
//! The crate emits `tracing` events (`debug` for bindings and file I/O,
//! `trace` for each parsed flag) and installs no subscriber.

pub mod dotpath;
pub mod env;
pub mod error;
pub mod format;
pub mod types;

mod duration;
mod feature;
mod file;
mod flag;
mod flagset;
mod normalize;
mod parse;
mod persist;
mod usage;
mod value;

#[cfg(test)]
mod fixtures;

use std::cell::RefCell;

pub use env::EnvLookup;
pub use error::{BoxError, FlagError};
pub use feature::{Feature, Priority, alias, cfg, enums, env, short};
pub use flag::{Flag, Handle, Typed};
pub use flagset::{FlagSet, Handler};
pub use normalize::{ConfigMap, Normalize, normalize};
pub use types::{ConfigFormat, ErrorHandling};
pub use value::{Func, Scalar, Text, Value, ValueKind};

thread_local! {
    static COMMAND_LINE: RefCell<FlagSet> = RefCell::new(FlagSet::new(program_name(), ErrorHandling::Exit));
}

fn program_name() -> String {
    std::env::args().next().unwrap_or_default()
}

/// Run `f` against the default scope for this thread, named after the
/// program and exiting on parse errors.
pub fn with_command_line<R>(f: impl FnOnce(&mut FlagSet) -> R) -> R {
    COMMAND_LINE.with(|fs| f(&mut fs.borrow_mut()))
}

/// Parse the process arguments into the default scope.
pub fn parse() -> Result<(), FlagError> {
    with_command_line(|fs| fs.parse(std::env::args().skip(1)))
}
