//! Tasks and hooks.
//!
//! A [`Hook`] is an action plus the parameters and resources it declares. A
//! [`Task`] is a named hook with a description and labels. Both are
//! configured through chained builder calls:
//!
//! ```rust
//! use tasklane::{Task, validator::Text};
//! use serde_json::Value;
//!
//! let mut task = Task::new("build");
//! task.desc("Build the project")
//!     .label("group", "ci")
//!     .inject("config")?
//!     .param("target", "debug", Text::new(0), "Build profile", true)
//!     .action(|_args| Ok(()));
//!
//! assert_eq!(task.hook().declarations().len(), 2);
//! # Ok::<(), tasklane::DispatchError>(())
//! ```
//!
//! Parameters and injections share one declaration list, so the action's
//! [`Arguments`](crate::Arguments) follow the exact order of the `.param()`
//! and `.inject()` calls.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{DispatchError, Result};
use crate::handler::{ActionFn, Arguments};
use crate::validator::ValidatorSource;

/// A declared parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub key: String,
    pub default: Value,
    pub validator: ValidatorSource,
    pub description: String,
    pub optional: bool,
}

/// One entry of a hook's declaration list.
#[derive(Debug, Clone)]
pub enum Declaration {
    Param(ParameterSpec),
    Injection(String),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Param(spec) => &spec.key,
            Declaration::Injection(resource) => resource,
        }
    }
}

/// An action with declared parameters and injections.
///
/// Init, shutdown and error hooks are plain `Hook`s; tasks wrap one.
#[derive(Clone)]
pub struct Hook {
    action: ActionFn,
    declarations: Vec<Declaration>,
}

impl Default for Hook {
    fn default() -> Self {
        Self {
            action: Rc::new(|_: &Arguments| -> anyhow::Result<()> { Ok(()) }),
            declarations: Vec::new(),
        }
    }
}

impl Hook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the action callback.
    pub fn action<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Arguments) -> anyhow::Result<()> + 'static,
    {
        self.action = Rc::new(f);
        self
    }

    /// Declares a parameter.
    ///
    /// The value comes from the matching `--key=value` flag, falling back to
    /// `default`. Declaring the same key again replaces the earlier spec in
    /// place.
    pub fn param(
        &mut self,
        key: &str,
        default: impl Into<Value>,
        validator: impl Into<ValidatorSource>,
        description: &str,
        optional: bool,
    ) -> &mut Self {
        let spec = ParameterSpec {
            key: key.to_string(),
            default: default.into(),
            validator: validator.into(),
            description: description.to_string(),
            optional,
        };
        let existing = self
            .declarations
            .iter_mut()
            .find(|d| matches!(d, Declaration::Param(p) if p.key == key));
        match existing {
            Some(slot) => *slot = Declaration::Param(spec),
            None => self.declarations.push(Declaration::Param(spec)),
        }
        self
    }

    /// Declares a resource injection.
    ///
    /// Fails with [`DispatchError::DuplicateInjection`] if `resource` is
    /// already injected here.
    pub fn inject(&mut self, resource: &str) -> Result<&mut Self> {
        let duplicate = self
            .declarations
            .iter()
            .any(|d| matches!(d, Declaration::Injection(r) if r == resource));
        if duplicate {
            return Err(DispatchError::DuplicateInjection(resource.to_string()));
        }
        self.declarations
            .push(Declaration::Injection(resource.to_string()));
        Ok(self)
    }

    pub fn get_action(&self) -> ActionFn {
        self.action.clone()
    }

    /// Every declaration, in call order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Declared parameters, in call order.
    pub fn params(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Param(spec) => Some(spec),
            Declaration::Injection(_) => None,
        })
    }

    /// Injected resource names, in call order.
    pub fn injections(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Injection(name) => Some(name.as_str()),
            Declaration::Param(_) => None,
        })
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("declarations", &self.declarations)
            .finish_non_exhaustive()
    }
}

/// A named command.
#[derive(Debug, Clone)]
pub struct Task {
    name: String,
    description: String,
    labels: HashMap<String, Value>,
    hook: Hook,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            labels: HashMap::new(),
            hook: Hook::new(),
        }
    }

    pub fn desc(&mut self, description: &str) -> &mut Self {
        self.description = description.to_string();
        self
    }

    pub fn label(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.labels.insert(key.to_string(), value.into());
        self
    }

    /// See [`Hook::action`].
    pub fn action<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Arguments) -> anyhow::Result<()> + 'static,
    {
        self.hook.action(f);
        self
    }

    /// See [`Hook::param`].
    pub fn param(
        &mut self,
        key: &str,
        default: impl Into<Value>,
        validator: impl Into<ValidatorSource>,
        description: &str,
        optional: bool,
    ) -> &mut Self {
        self.hook
            .param(key, default, validator, description, optional);
        self
    }

    /// See [`Hook::inject`].
    pub fn inject(&mut self, resource: &str) -> Result<&mut Self> {
        self.hook.inject(resource)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the label value, or `default` when the label is absent.
    pub fn get_label(&self, key: &str, default: impl Into<Value>) -> Value {
        self.labels
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.into())
    }

    pub fn get_action(&self) -> ActionFn {
        self.hook.get_action()
    }

    pub fn params(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.hook.params()
    }

    pub fn injections(&self) -> impl Iterator<Item = &str> {
        self.hook.injections()
    }

    /// The underlying hook (action and declarations).
    pub fn hook(&self) -> &Hook {
        &self.hook
    }
}
