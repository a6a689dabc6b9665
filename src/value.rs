//! Flag value storage.
//!
//! Every flag owns one value cell implementing [`Value`]. The eight primitive
//! kinds share [`Scalar<T>`]; [`Text<T>`] adapts any `FromStr + Display`
//! type; [`Func`] runs a callback; anything else implements [`Value`]
//! directly and is reported as [`ValueKind::Custom`].

use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use crate::duration;
use crate::error::BoxError;

/// The settable/stringable capability behind every flag.
pub trait Value {
    /// Parse `text` and store it.
    fn set(&mut self, text: &str) -> Result<(), BoxError>;

    /// Current value as text.
    fn text(&self) -> String;

    fn kind(&self) -> ValueKind {
        ValueKind::Custom
    }

    /// Boolean-like flags take no argument on the command line: `-v` means
    /// `-v=true`.
    fn is_bool_flag(&self) -> bool {
        self.kind() == ValueKind::Bool
    }
}

/// Closed set of value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Int64,
    Uint,
    Uint64,
    String,
    Float64,
    Duration,
    Text,
    Func,
    Custom,
}

impl ValueKind {
    /// Placeholder shown after the flag name in usage output.
    pub fn type_name(self) -> &'static str {
        match self {
            ValueKind::Bool => "",
            ValueKind::Int | ValueKind::Int64 => "int",
            ValueKind::Uint | ValueKind::Uint64 => "uint",
            ValueKind::String => "string",
            ValueKind::Float64 => "float",
            ValueKind::Duration => "duration",
            ValueKind::Text | ValueKind::Func | ValueKind::Custom => "value",
        }
    }

    /// Text of the zero value, when the kind has one.
    pub fn zero_text(self) -> Option<&'static str> {
        match self {
            ValueKind::Bool => Some("false"),
            ValueKind::Int
            | ValueKind::Int64
            | ValueKind::Uint
            | ValueKind::Uint64
            | ValueKind::Float64 => Some("0"),
            ValueKind::String | ValueKind::Func => Some(""),
            ValueKind::Duration => Some("0s"),
            ValueKind::Text | ValueKind::Custom => None,
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for isize {}
    impl Sealed for i64 {}
    impl Sealed for usize {}
    impl Sealed for u64 {}
    impl Sealed for String {}
    impl Sealed for f64 {}
    impl Sealed for std::time::Duration {}
}

/// The primitive flag types.
pub trait Primitive: Clone + 'static + sealed::Sealed {
    const KIND: ValueKind;

    fn parse_text(text: &str) -> Result<Self, BoxError>;

    fn format_text(&self) -> String;
}

/// A primitive value together with the default it was defined with.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar<T> {
    pub(crate) value: T,
    pub(crate) default: T,
}

impl<T: Clone> Scalar<T> {
    pub fn new(default: T) -> Self {
        Self {
            value: default.clone(),
            default,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }
}

impl<T: Primitive> Value for Scalar<T> {
    fn set(&mut self, text: &str) -> Result<(), BoxError> {
        self.value = T::parse_text(text)?;
        Ok(())
    }

    fn text(&self) -> String {
        self.value.format_text()
    }

    fn kind(&self) -> ValueKind {
        T::KIND
    }
}

/// Adapter for any `FromStr + Display` type.
#[derive(Debug, Clone, PartialEq)]
pub struct Text<T> {
    pub(crate) value: T,
    pub(crate) default: T,
}

impl<T: Clone> Text<T> {
    pub fn new(default: T) -> Self {
        Self {
            value: default.clone(),
            default,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }
}

impl<T> Value for Text<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    fn set(&mut self, text: &str) -> Result<(), BoxError> {
        self.value = text.parse().map_err(|e: T::Err| e.to_string())?;
        Ok(())
    }

    fn text(&self) -> String {
        self.value.to_string()
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }
}

type Callback = Box<dyn FnMut(&str) -> Result<(), BoxError>>;

/// A value that hands every assignment to a callback and stores nothing.
pub struct Func {
    callback: Callback,
}

impl Func {
    pub fn new(callback: impl FnMut(&str) -> Result<(), BoxError> + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func").finish_non_exhaustive()
    }
}

impl Value for Func {
    fn set(&mut self, text: &str) -> Result<(), BoxError> {
        (self.callback)(text)
    }

    fn text(&self) -> String {
        String::new()
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Func
    }
}

/// Parse a boolean: `1 t T TRUE true True` or `0 f F FALSE false False`.
pub fn parse_bool(text: &str) -> Result<bool, BoxError> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(format!("parsing \"{text}\": invalid syntax").into()),
    }
}

/// Split a base prefix off an unsigned literal: `0x`, `0o`, `0b`, or a
/// leading `0` for octal. Underscore separators are only legal after a
/// prefix.
fn split_radix(text: &str) -> Result<(u32, String), BoxError> {
    let lower = text.get(..2).map(str::to_ascii_lowercase);
    let (radix, digits) = match lower.as_deref() {
        Some("0x") => (16, &text[2..]),
        Some("0o") => (8, &text[2..]),
        Some("0b") => (2, &text[2..]),
        _ if text.len() > 1 && text.starts_with('0') => (8, &text[1..]),
        _ => (10, text),
    };
    if radix == 10 && digits.contains('_') {
        return Err(syntax_error(text));
    }
    let digits = digits.replace('_', "");
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(syntax_error(text));
    }
    Ok((radix, digits))
}

fn syntax_error(text: &str) -> BoxError {
    format!("parsing \"{text}\": invalid syntax").into()
}

fn range_error(text: &str) -> BoxError {
    format!("parsing \"{text}\": value out of range").into()
}

fn parse_magnitude(text: &str, unsigned: &str) -> Result<u64, BoxError> {
    let (radix, digits) = split_radix(unsigned)?;
    u64::from_str_radix(&digits, radix).map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => range_error(text),
        _ => syntax_error(text),
    })
}

/// Parse a signed integer literal with optional base prefix.
pub fn parse_int(text: &str) -> Result<i64, BoxError> {
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = i128::from(parse_magnitude(text, unsigned)?);
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).map_err(|_| range_error(text))
}

/// Parse an unsigned integer literal with optional base prefix.
pub fn parse_uint(text: &str) -> Result<u64, BoxError> {
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    parse_magnitude(text, unsigned)
}

/// Render a float, switching to exponent form for very large or very small
/// magnitudes.
pub fn format_float(value: f64) -> String {
    let magnitude = value.abs();
    if value != 0.0 && value.is_finite() && !(1e-4..1e21).contains(&magnitude) {
        format!("{value:e}")
    } else {
        value.to_string()
    }
}

impl Primitive for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        parse_bool(text)
    }

    fn format_text(&self) -> String {
        self.to_string()
    }
}

impl Primitive for isize {
    const KIND: ValueKind = ValueKind::Int;

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        isize::try_from(parse_int(text)?).map_err(|_| range_error(text))
    }

    fn format_text(&self) -> String {
        self.to_string()
    }
}

impl Primitive for i64 {
    const KIND: ValueKind = ValueKind::Int64;

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        parse_int(text)
    }

    fn format_text(&self) -> String {
        self.to_string()
    }
}

impl Primitive for usize {
    const KIND: ValueKind = ValueKind::Uint;

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        usize::try_from(parse_uint(text)?).map_err(|_| range_error(text))
    }

    fn format_text(&self) -> String {
        self.to_string()
    }
}

impl Primitive for u64 {
    const KIND: ValueKind = ValueKind::Uint64;

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        parse_uint(text)
    }

    fn format_text(&self) -> String {
        self.to_string()
    }
}

impl Primitive for String {
    const KIND: ValueKind = ValueKind::String;

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        Ok(text.to_string())
    }

    fn format_text(&self) -> String {
        self.clone()
    }
}

impl Primitive for f64 {
    const KIND: ValueKind = ValueKind::Float64;

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        text.parse().map_err(|_| syntax_error(text))
    }

    fn format_text(&self) -> String {
        format_float(*self)
    }
}

impl Primitive for Duration {
    const KIND: ValueKind = ValueKind::Duration;

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        duration::parse(text).map_err(BoxError::from)
    }

    fn format_text(&self) -> String {
        duration::format(*self)
    }
}
