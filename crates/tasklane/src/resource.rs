//! Named, lazily computed resources for injection into tasks and hooks.
//!
//! A [`ResourceRegistry`] maps names to factories. Each factory declares the
//! names of the resources it depends on; resolving a resource resolves those
//! first (depth-first, in declaration order), hands them to the factory and
//! caches the result. A cached value is reused until the resource is
//! re-registered or the registry is [`reset`](ResourceRegistry::reset).
//!
//! # Example
//!
//! ```rust
//! use tasklane::ResourceRegistry;
//!
//! let mut registry = ResourceRegistry::new();
//! registry.register("second", &[], |_| Ok("second".to_string()))?;
//! registry.register("first", &["second"], |deps| {
//!     let second = deps.get::<String>("second")?;
//!     Ok(format!("first-{}", second))
//! })?;
//!
//! let first = registry.resolve_as::<String>("first")?;
//! assert_eq!(first.as_str(), "first-second");
//! # Ok::<(), tasklane::DispatchError>(())
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{DispatchError, Result};

/// A resolved resource value.
pub type Resource = Rc<dyn Any>;

/// Names the registry owns. User code cannot register these.
pub const RESERVED_NAMES: &[&str] = &[CLI_RESOURCE, ERROR_RESOURCE];

/// Resource holding the dispatcher's [`CliContext`](crate::CliContext).
pub const CLI_RESOURCE: &str = "cli";

/// Resource bound to the caught failure while error hooks run.
pub const ERROR_RESOURCE: &str = "error";

type Factory = Rc<dyn Fn(&Dependencies) -> anyhow::Result<Resource>>;

/// Downcasts a resource to a concrete type.
pub(crate) fn downcast<T: 'static>(name: &str, value: &Resource) -> Result<Rc<T>> {
    value
        .clone()
        .downcast::<T>()
        .map_err(|_| DispatchError::ResourceType {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

/// The resolved dependencies handed to a resource factory.
#[derive(Default)]
pub struct Dependencies {
    entries: Vec<(String, Resource)>,
}

impl Dependencies {
    /// Gets a dependency by name, downcast to `T`.
    pub fn get<T: 'static>(&self, name: &str) -> Result<Rc<T>> {
        let (_, value) = self
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| DispatchError::UnknownResource(name.to_string()))?;
        downcast(name, value)
    }

    /// Gets a dependency by its position in the declared dependency list.
    pub fn at<T: 'static>(&self, index: usize) -> Result<Rc<T>> {
        let (name, value) = self
            .entries
            .get(index)
            .ok_or_else(|| DispatchError::UnknownResource(format!("#{}", index)))?;
        downcast(name, value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct ResourceDescriptor {
    factory: Factory,
    dependencies: Vec<String>,
    cached: Option<Resource>,
    stale: bool,
}

/// Registry of named resource factories with memoized results.
///
/// The registry is single-threaded: it hands out `Rc` values and is owned by
/// one [`Dispatcher`](crate::Dispatcher). Independent runs get independent
/// registries.
#[derive(Default)]
pub struct ResourceRegistry {
    descriptors: HashMap<String, ResourceDescriptor>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the factory for `name`.
    ///
    /// The factory receives the resolved values of `dependencies`. A replaced
    /// registration is recomputed on its next resolution.
    pub fn register<T, F>(&mut self, name: &str, dependencies: &[&str], factory: F) -> Result<()>
    where
        T: 'static,
        F: Fn(&Dependencies) -> anyhow::Result<T> + 'static,
    {
        if RESERVED_NAMES.contains(&name) {
            return Err(DispatchError::ReservedName(name.to_string()));
        }
        let factory: Factory = Rc::new(move |deps: &Dependencies| -> anyhow::Result<Resource> {
            Ok(Rc::new(factory(deps)?))
        });
        self.insert(
            name,
            dependencies.iter().map(|d| d.to_string()).collect(),
            factory,
            None,
        );
        Ok(())
    }

    /// Binds `name` to an already computed value, bypassing the reserved-name
    /// check. Used by the dispatcher for `cli` and `error`.
    pub(crate) fn provide(&mut self, name: &str, value: Resource) {
        let held = value.clone();
        self.insert(
            name,
            Vec::new(),
            Rc::new(move |_: &Dependencies| -> anyhow::Result<Resource> { Ok(held.clone()) }),
            Some(value),
        );
    }

    fn insert(
        &mut self,
        name: &str,
        dependencies: Vec<String>,
        factory: Factory,
        cached: Option<Resource>,
    ) {
        tracing::debug!(resource = name, ?dependencies, "registering resource");
        let stale = cached.is_none();
        self.descriptors.insert(
            name.to_string(),
            ResourceDescriptor {
                factory,
                dependencies,
                cached,
                stale,
            },
        );
    }

    /// Returns true if a resource is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Resolves `name`, computing it (and its dependencies) if needed.
    pub fn resolve(&mut self, name: &str) -> Result<Resource> {
        let mut stack = Vec::new();
        self.resolve_on_stack(name, &mut stack)
    }

    /// Resolves `name` and downcasts it to `T`.
    pub fn resolve_as<T: 'static>(&mut self, name: &str) -> Result<Rc<T>> {
        let value = self.resolve(name)?;
        downcast(name, &value)
    }

    /// Resolves several resources, preserving input order.
    pub fn resolve_all<S: AsRef<str>>(&mut self, names: &[S]) -> Result<Vec<Resource>> {
        names.iter().map(|n| self.resolve(n.as_ref())).collect()
    }

    fn resolve_on_stack(&mut self, name: &str, stack: &mut Vec<String>) -> Result<Resource> {
        if stack.iter().any(|n| n == name) {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            return Err(DispatchError::CyclicDependency(chain));
        }

        let descriptor = self
            .descriptors
            .get(name)
            .ok_or_else(|| DispatchError::UnknownResource(name.to_string()))?;

        if !descriptor.stale {
            if let Some(value) = &descriptor.cached {
                return Ok(value.clone());
            }
        }

        let factory = descriptor.factory.clone();
        let dependency_names = descriptor.dependencies.clone();

        stack.push(name.to_string());
        let mut entries = Vec::with_capacity(dependency_names.len());
        for dependency in dependency_names {
            let value = self.resolve_on_stack(&dependency, stack)?;
            entries.push((dependency, value));
        }
        stack.pop();

        tracing::debug!(resource = name, "computing resource");
        let value = factory(&Dependencies { entries }).map_err(|source| {
            DispatchError::ResourceFailed {
                name: name.to_string(),
                source,
            }
        })?;

        if let Some(descriptor) = self.descriptors.get_mut(name) {
            descriptor.cached = Some(value.clone());
            descriptor.stale = false;
        }
        Ok(value)
    }

    /// Drops every cached value. Registrations are kept and recomputed on
    /// their next resolution.
    pub fn reset(&mut self) {
        for descriptor in self.descriptors.values_mut() {
            descriptor.cached = None;
            descriptor.stale = true;
        }
    }

    /// Removes every registration.
    pub fn clear(&mut self) {
        self.descriptors.clear();
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.descriptors.keys().collect();
        names.sort();
        f.debug_struct("ResourceRegistry")
            .field("resources", &names)
            .finish()
    }
}
