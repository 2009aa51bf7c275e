//! Action callbacks and the arguments they receive.
//!
//! An action is any `Fn(&Arguments) -> anyhow::Result<()>`. The [`Arguments`]
//! it receives hold one entry per declared parameter or injection, in the
//! order they were declared on the task or hook. Entries can be read by name
//! or by position:
//!
//! ```rust
//! use tasklane::{Dispatcher, validator::{ArrayList, Text}};
//! use serde_json::Value;
//!
//! let mut cli = Dispatcher::new(["prog", "build", "--email=me@example.com"])?;
//! cli.task("build")
//!     .param("email", Value::Null, Text::new(0), "Valid email address", false)
//!     .action(|args| {
//!         let email: String = args.param("email")?;
//!         assert_eq!(email, "me@example.com");
//!         Ok(())
//!     });
//! cli.run()?;
//! # Ok::<(), tasklane::DispatchError>(())
//! ```

use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::resource::{downcast, Resource};

/// Shared action callback type.
pub type ActionFn = Rc<dyn Fn(&Arguments) -> anyhow::Result<()>>;

/// One resolved argument.
#[derive(Clone)]
pub enum Argument {
    /// A parameter value from the command line or its default.
    Param { name: String, value: Value },
    /// An injected resource.
    Resource { name: String, value: Resource },
}

impl Argument {
    pub fn name(&self) -> &str {
        match self {
            Argument::Param { name, .. } | Argument::Resource { name, .. } => name,
        }
    }

    /// The parameter value, if this is a parameter.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Argument::Param { value, .. } => Some(value),
            Argument::Resource { .. } => None,
        }
    }
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Param { name, value } => f
                .debug_struct("Param")
                .field("name", name)
                .field("value", value)
                .finish(),
            Argument::Resource { name, .. } => f
                .debug_struct("Resource")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

/// The ordered argument list passed to an action.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    entries: Vec<Argument>,
}

impl Arguments {
    pub(crate) fn new(entries: Vec<Argument>) -> Self {
        Self { entries }
    }

    /// Gets an argument by declaration position.
    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.entries.get(index)
    }

    /// Gets an argument by name.
    pub fn find(&self, name: &str) -> Option<&Argument> {
        self.entries.iter().find(|a| a.name() == name)
    }

    /// Raw value of a parameter.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.find(name).and_then(Argument::as_value)
    }

    /// Deserializes a parameter into `T`.
    ///
    /// A single value and a repeated flag arrive as a JSON string and a JSON
    /// array of strings respectively, so `String` and `Vec<String>` are the
    /// usual targets. Use `Option<T>` for optional parameters without default.
    pub fn param<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .value(name)
            .ok_or_else(|| anyhow::anyhow!("Param \"{}\" was not declared", name))?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("Param \"{}\" has an unexpected shape: {}", name, e))
    }

    /// Parameter as a string slice, if it holds a single string.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    /// Gets an injected resource downcast to `T`.
    pub fn resource<T: 'static>(&self, name: &str) -> anyhow::Result<Rc<T>> {
        match self.find(name) {
            Some(Argument::Resource { name, value }) => Ok(downcast(name, value)?),
            _ => Err(anyhow::anyhow!("Resource \"{}\" was not injected", name)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.entries.iter()
    }

    /// Argument names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(Argument::name).collect()
    }
}
