//! Parameter validation.
//!
//! Every declared parameter carries a [`Validator`]. It can be given as a
//! ready instance or as a factory that builds one when the parameter is
//! resolved (useful when the validator depends on state that only exists at
//! run time).
//!
//! ```rust
//! use tasklane::validator::{ArrayList, Text, ValidatorSource};
//!
//! let direct: ValidatorSource = Text::new(0).into();
//! let lazy = ValidatorSource::factory(|| Ok(Box::new(ArrayList::new(Text::new(256), 0))));
//! # let _ = (direct, lazy);
//! ```

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// The capability every parameter validator implements.
pub trait Validator {
    /// Returns true if `value` is acceptable.
    fn is_valid(&self, value: &Value) -> bool;

    /// Human-readable description of what is accepted.
    fn description(&self) -> String;
}

impl<V: Validator + ?Sized> Validator for Box<V> {
    fn is_valid(&self, value: &Value) -> bool {
        (**self).is_valid(value)
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

type ValidatorFactory = Rc<dyn Fn() -> anyhow::Result<Box<dyn Validator>>>;

/// Where a parameter's validator comes from.
#[derive(Clone)]
pub enum ValidatorSource {
    /// A ready validator instance.
    Instance(Rc<dyn Validator>),
    /// A factory invoked at resolution time.
    Factory(ValidatorFactory),
}

impl ValidatorSource {
    /// Wraps a factory closure.
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn Validator>> + 'static,
    {
        ValidatorSource::Factory(Rc::new(f))
    }

    /// Produces the validator, invoking the factory if there is one.
    pub fn instantiate(&self) -> anyhow::Result<Rc<dyn Validator>> {
        match self {
            ValidatorSource::Instance(v) => Ok(v.clone()),
            ValidatorSource::Factory(f) => Ok(Rc::from(f()?)),
        }
    }
}

impl<V: Validator + 'static> From<V> for ValidatorSource {
    fn from(validator: V) -> Self {
        ValidatorSource::Instance(Rc::new(validator))
    }
}

impl fmt::Debug for ValidatorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorSource::Instance(v) => write!(f, "Instance({:?})", v.description()),
            ValidatorSource::Factory(_) => write!(f, "Factory"),
        }
    }
}

/// Accepts strings up to `max_length` characters. A length of 0 means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Text {
    max_length: usize,
}

impl Text {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Validator for Text {
    fn is_valid(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.max_length == 0 || s.chars().count() <= self.max_length,
            _ => false,
        }
    }

    fn description(&self) -> String {
        if self.max_length == 0 {
            "Value must be a valid string".to_string()
        } else {
            format!(
                "Value must be a valid string and no longer than {} chars",
                self.max_length
            )
        }
    }
}

/// Accepts a list whose items all pass `inner`. A single value counts as a
/// one-item list. A `max_length` of 0 means no limit on the item count.
pub struct ArrayList {
    inner: Box<dyn Validator>,
    max_length: usize,
}

impl ArrayList {
    pub fn new(inner: impl Validator + 'static, max_length: usize) -> Self {
        Self {
            inner: Box::new(inner),
            max_length,
        }
    }
}

impl Validator for ArrayList {
    fn is_valid(&self, value: &Value) -> bool {
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Null => return false,
            other => vec![other],
        };
        if self.max_length > 0 && items.len() > self.max_length {
            return false;
        }
        items.into_iter().all(|item| self.inner.is_valid(item))
    }

    fn description(&self) -> String {
        let mut description = format!(
            "Value must be a valid array and {}",
            lowercase_first(&self.inner.description())
        );
        if self.max_length > 0 {
            description.push_str(&format!(
                " (at most {} items)",
                self.max_length
            ));
        }
        description
    }
}

impl fmt::Debug for ArrayList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayList")
            .field("inner", &self.inner.description())
            .field("max_length", &self.max_length)
            .finish()
    }
}

/// Accepts one of a fixed set of strings. Non-strict matching ignores case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhiteList {
    allowed: Vec<String>,
    strict: bool,
}

impl WhiteList {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            strict: true,
        }
    }

    /// Compare case-insensitively.
    pub fn case_insensitive(mut self) -> Self {
        self.strict = false;
        self
    }
}

impl Validator for WhiteList {
    fn is_valid(&self, value: &Value) -> bool {
        let Value::String(s) = value else {
            return false;
        };
        self.allowed.iter().any(|allowed| {
            if self.strict {
                allowed == s
            } else {
                allowed.eq_ignore_ascii_case(s)
            }
        })
    }

    fn description(&self) -> String {
        format!("Value must be one of ({})", self.allowed.join(", "))
    }
}

/// Accepts numbers, or strings that parse as numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Numeric;

impl Validator for Numeric {
    fn is_valid(&self, value: &Value) -> bool {
        match value {
            Value::Number(_) => true,
            Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
            _ => false,
        }
    }

    fn description(&self) -> String {
        "Value must be a valid number".to_string()
    }
}

/// Accepts booleans and the strings `true`, `false`, `1`, `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Boolean;

impl Validator for Boolean {
    fn is_valid(&self, value: &Value) -> bool {
        match value {
            Value::Bool(_) => true,
            Value::String(s) => matches!(s.as_str(), "true" | "false" | "1" | "0"),
            _ => false,
        }
    }

    fn description(&self) -> String {
        "Value must be a valid boolean".to_string()
    }
}

/// Accepts `null` in addition to whatever `inner` accepts.
pub struct Nullable {
    inner: Box<dyn Validator>,
}

impl Nullable {
    pub fn new(inner: impl Validator + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Validator for Nullable {
    fn is_valid(&self, value: &Value) -> bool {
        value.is_null() || self.inner.is_valid(value)
    }

    fn description(&self) -> String {
        self.inner.description()
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
