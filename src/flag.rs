//! Flags and typed handles.
//!
//! A [`Flag`] is a cheap, clonable handle onto shared state: aliases created
//! by the alias feature are separate `Flag`s that point at the same value
//! cell and the same binding sets, so setting either one is observably
//! equivalent to setting the other.

use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::error::FlagError;
use crate::value::{Primitive, Scalar, Text, Value, ValueKind};

/// Env, config and enum bindings. Shared between a flag and its aliases.
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    pub envs: BTreeSet<String>,
    pub cfgs: BTreeSet<String>,
    pub enums: BTreeSet<String>,
}

struct FlagInner {
    name: String,
    usage: String,
    default_text: String,
    value: Rc<RefCell<dyn Value>>,
    bindings: Rc<RefCell<Bindings>>,
    aliases: RefCell<BTreeSet<String>>,
}

/// A named, typed, mutable flag.
#[derive(Clone)]
pub struct Flag {
    inner: Rc<FlagInner>,
}

impl Flag {
    pub(crate) fn new(name: &str, usage: &str, value: Rc<RefCell<dyn Value>>) -> Self {
        let default_text = value.borrow().text();
        Self {
            inner: Rc::new(FlagInner {
                name: name.to_string(),
                usage: usage.to_string(),
                default_text,
                value,
                bindings: Rc::new(RefCell::new(Bindings::default())),
                aliases: RefCell::new(BTreeSet::new()),
            }),
        }
    }

    /// A new flag named `name` sharing this flag's value cell and bindings.
    pub(crate) fn alias_as(&self, name: &str) -> Self {
        Self {
            inner: Rc::new(FlagInner {
                name: name.to_string(),
                usage: self.inner.usage.clone(),
                default_text: self.inner.default_text.clone(),
                value: Rc::clone(&self.inner.value),
                bindings: Rc::clone(&self.inner.bindings),
                aliases: RefCell::new(BTreeSet::new()),
            }),
        }
    }

    pub(crate) fn link_alias(&self, other: &str) {
        self.inner.aliases.borrow_mut().insert(other.to_string());
    }

    pub(crate) fn bindings(&self) -> Ref<'_, Bindings> {
        self.inner.bindings.borrow()
    }

    pub(crate) fn bindings_mut(&self) -> std::cell::RefMut<'_, Bindings> {
        self.inner.bindings.borrow_mut()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn usage(&self) -> &str {
        &self.inner.usage
    }

    /// Text of the value at definition time.
    pub fn default_text(&self) -> &str {
        &self.inner.default_text
    }

    /// Current value as text.
    pub fn text(&self) -> String {
        self.inner.value.borrow().text()
    }

    pub fn kind(&self) -> ValueKind {
        self.inner.value.borrow().kind()
    }

    pub fn is_bool_flag(&self) -> bool {
        self.inner.value.borrow().is_bool_flag()
    }

    /// Environment variables bound to this flag.
    pub fn envs(&self) -> Vec<String> {
        self.bindings().envs.iter().cloned().collect()
    }

    /// Dotted config paths bound to this flag.
    pub fn cfgs(&self) -> Vec<String> {
        self.bindings().cfgs.iter().cloned().collect()
    }

    /// Permitted values; empty means unconstrained.
    pub fn enums(&self) -> Vec<String> {
        self.bindings().enums.iter().cloned().collect()
    }

    /// Names of flags linked to this one by the alias feature.
    pub fn aliases(&self) -> Vec<String> {
        self.inner.aliases.borrow().iter().cloned().collect()
    }

    /// Whether `other` reads and writes the same value cell.
    pub fn shares_value_with(&self, other: &Flag) -> bool {
        Rc::ptr_eq(&self.inner.value, &other.inner.value)
    }

    /// Check `text` against the enum set, then parse it into the value.
    ///
    /// A rejected value never reaches the value cell.
    pub fn set(&self, text: &str) -> Result<(), FlagError> {
        {
            let bindings = self.bindings();
            if !bindings.enums.is_empty() && !bindings.enums.contains(text) {
                return Err(FlagError::EnumViolation {
                    flag: self.name().to_string(),
                    value: text.to_string(),
                    allowed: bindings.enums.iter().cloned().collect(),
                });
            }
        }

        self.inner
            .value
            .borrow_mut()
            .set(text)
            .map_err(|e| FlagError::InvalidValue {
                flag: self.name().to_string(),
                value: text.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.inner.name)
            .field("value", &self.text())
            .field("default", &self.inner.default_text)
            .field("aliases", &self.inner.aliases.borrow())
            .finish()
    }
}

/// Typed access to a flag returned by a define call.
pub struct Handle<V> {
    flag: Flag,
    cell: Rc<RefCell<V>>,
}

impl<V: Value + 'static> Handle<V> {
    pub(crate) fn new(name: &str, usage: &str, value: V) -> Self {
        let cell = Rc::new(RefCell::new(value));
        let shared: Rc<RefCell<dyn Value>> = cell.clone();
        Self {
            flag: Flag::new(name, usage, shared),
            cell,
        }
    }
}

impl<V> Handle<V> {
    pub fn flag(&self) -> &Flag {
        &self.flag
    }

    pub fn name(&self) -> &str {
        self.flag.name()
    }

    /// Borrow the underlying value.
    pub fn borrow(&self) -> Ref<'_, V> {
        self.cell.borrow()
    }
}

impl<V> Clone for Handle<V> {
    fn clone(&self) -> Self {
        Self {
            flag: self.flag.clone(),
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<V> fmt::Debug for Handle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.flag).finish()
    }
}

/// Handle to one of the primitive flag kinds.
pub type Typed<T> = Handle<Scalar<T>>;

impl<T: Primitive> Handle<Scalar<T>> {
    /// Current value.
    pub fn get(&self) -> T {
        self.cell.borrow().value.clone()
    }

    /// Value the flag was defined with.
    pub fn default_value(&self) -> T {
        self.cell.borrow().default.clone()
    }
}

impl<T: Clone> Handle<Text<T>> {
    pub fn get(&self) -> T {
        self.cell.borrow().value.clone()
    }

    pub fn default_value(&self) -> T {
        self.cell.borrow().default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_flag(name: &str, default: &str) -> Typed<String> {
        Handle::new(name, "usage", Scalar::new(default.to_string()))
    }

    #[test]
    fn default_text_is_captured_at_creation() {
        let h = string_flag("name", "anon");
        h.flag().set("bob").unwrap();
        assert_eq!(h.flag().default_text(), "anon");
        assert_eq!(h.get(), "bob");
        assert_eq!(h.default_value(), "anon");
    }

    #[test]
    fn invalid_text_is_invalid_value() {
        let h: Typed<u64> = Handle::new("port", "", Scalar::new(80));
        let err = h.flag().set("eighty").unwrap_err();
        assert!(matches!(err, FlagError::InvalidValue { ref flag, .. } if flag == "port"));
        assert_eq!(h.get(), 80);
    }

    #[test]
    fn enum_violation_keeps_previous_value() {
        let h = string_flag("mode", "fast");
        h.flag().bindings_mut().enums.extend(["fast".to_string(), "slow".to_string()]);

        h.flag().set("slow").unwrap();
        let err = h.flag().set("medium").unwrap_err();
        assert!(matches!(err, FlagError::EnumViolation { .. }));
        assert_eq!(h.get(), "slow");
    }

    /// Stores lower case, reports upper case: its text does not parse back
    /// to the same value.
    struct Shouty(String);

    impl Value for Shouty {
        fn set(&mut self, text: &str) -> Result<(), crate::error::BoxError> {
            self.0 = text.to_lowercase();
            Ok(())
        }

        fn text(&self) -> String {
            self.0.to_uppercase()
        }
    }

    #[test]
    fn enum_rejects_before_touching_custom_value() {
        let h = Handle::new("mode", "", Shouty("a".into()));
        h.flag().bindings_mut().enums.extend(["A".to_string(), "B".to_string()]);

        let err = h.flag().set("z").unwrap_err();
        assert!(matches!(err, FlagError::EnumViolation { ref value, .. } if value == "z"));
        assert_eq!(h.flag().text(), "A");
        assert_eq!(h.borrow().0, "a");

        h.flag().set("B").unwrap();
        assert_eq!(h.flag().text(), "B");
    }

    #[test]
    fn enum_guards_func_callbacks() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let h = Handle::new(
            "tag",
            "",
            crate::value::Func::new(move |v| {
                sink.borrow_mut().push(v.to_string());
                Ok(())
            }),
        );
        h.flag().bindings_mut().enums.extend(["x".to_string()]);

        assert!(h.flag().set("y").is_err());
        h.flag().set("x").unwrap();
        assert_eq!(*calls.borrow(), ["x"]);
    }

    #[test]
    fn alias_shares_value_and_bindings() {
        let h = string_flag("password", "");
        let alias = h.flag().alias_as("p");
        alias.set("xyz").unwrap();
        assert_eq!(h.get(), "xyz");
        assert!(alias.shares_value_with(h.flag()));

        alias.bindings_mut().envs.insert("PASSWORD".into());
        assert_eq!(h.flag().envs(), vec!["PASSWORD"]);
        assert_eq!(alias.usage(), "usage");
    }
}
