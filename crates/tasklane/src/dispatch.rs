//! The dispatcher: task registry, hook lists and the run cycle.
//!
//! ```text
//! argv
//!   → ParsedArguments        (command name + flag map)
//!   → match command          (NoCommandFound → error hooks)
//!   → INIT HOOKS             (resolve + invoke, registration order)
//!   → task action            (resolve + invoke)
//!   → SHUTDOWN HOOKS         (resolve + invoke, registration order)
//!
//! any failure above
//!   → ERROR HOOKS            (with the failure injectable as "error")
//! ```
//!
//! Each hook and the task resolve their arguments right before they run, so a
//! resource created by an init hook's side effects is visible to the task.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::args::ParsedArguments;
use crate::error::{DispatchError, Phase, Result};
use crate::handler::{Argument, Arguments};
use crate::resource::{Resource, ResourceRegistry, CLI_RESOURCE, ERROR_RESOURCE};
use crate::task::{Declaration, Hook, ParameterSpec, Task};

/// Snapshot of the invocation, injectable into any task or hook as `cli`.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub command: String,
    pub args: ParsedArguments,
}

/// How the last [`Dispatcher::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The task and every init and shutdown hook completed.
    Succeeded,
    /// A failure was routed to the error hooks.
    Failed(Phase),
}

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    argv: Option<Vec<String>>,
    registry: Option<ResourceRegistry>,
}

impl DispatcherBuilder {
    /// Sets the argument vector (program path first). Defaults to the
    /// process arguments.
    pub fn args<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = Some(argv.into_iter().map(Into::into).collect());
        self
    }

    /// Uses a pre-populated resource registry. Defaults to an empty one.
    pub fn registry(mut self, registry: ResourceRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Parses the arguments and builds the dispatcher.
    pub fn build(self) -> Result<Dispatcher> {
        let argv = self
            .argv
            .unwrap_or_else(|| std::env::args().collect::<Vec<_>>());
        let args = ParsedArguments::parse(argv)?;
        let mut registry = self.registry.unwrap_or_default();

        let context = CliContext {
            command: args.command().to_string(),
            args: args.clone(),
        };
        registry.provide(CLI_RESOURCE, Rc::new(context));

        Ok(Dispatcher {
            args,
            registry,
            tasks: BTreeMap::new(),
            init: Vec::new(),
            shutdown: Vec::new(),
            errors: Vec::new(),
            outcome: None,
        })
    }
}

/// Owns the tasks, hooks and resources for one invocation.
pub struct Dispatcher {
    args: ParsedArguments,
    registry: ResourceRegistry,
    tasks: BTreeMap<String, Task>,
    init: Vec<Hook>,
    shutdown: Vec<Hook>,
    errors: Vec<Hook>,
    outcome: Option<Outcome>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Builds a dispatcher for the given argument vector.
    pub fn new<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder().args(argv).build()
    }

    /// Builds a dispatcher for the process arguments.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    /// Registers a task, replacing any task with the same name.
    pub fn task(&mut self, name: &str) -> &mut Task {
        let task = Task::new(name);
        match self.tasks.entry(name.to_string()) {
            std::collections::btree_map::Entry::Occupied(mut entry) => {
                entry.insert(task);
                entry.into_mut()
            }
            std::collections::btree_map::Entry::Vacant(entry) => entry.insert(task),
        }
    }

    /// Adds a hook that runs before the task.
    pub fn init(&mut self) -> &mut Hook {
        push_hook(&mut self.init)
    }

    /// Adds a hook that runs after the task succeeds.
    pub fn shutdown(&mut self) -> &mut Hook {
        push_hook(&mut self.shutdown)
    }

    /// Adds a hook that runs when matching, resolving or invoking fails.
    pub fn error(&mut self) -> &mut Hook {
        push_hook(&mut self.errors)
    }

    /// Registers a resource factory. See [`ResourceRegistry::register`].
    pub fn set_resource<T, F>(&mut self, name: &str, dependencies: &[&str], factory: F) -> Result<()>
    where
        T: 'static,
        F: Fn(&crate::resource::Dependencies) -> anyhow::Result<T> + 'static,
    {
        self.registry.register(name, dependencies, factory)
    }

    /// Resolves a resource by name.
    pub fn resource(&mut self, name: &str) -> Result<Resource> {
        self.registry.resolve(name)
    }

    /// Resolves several resources, keyed by name.
    pub fn resources(&mut self, names: &[&str]) -> Result<Vec<(String, Resource)>> {
        let values = self.registry.resolve_all(names)?;
        Ok(names.iter().map(|n| n.to_string()).zip(values).collect())
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.registry
    }

    /// Drops every cached resource value.
    pub fn reset(&mut self) {
        self.registry.reset();
    }

    /// Finds the task registered under the exact command name.
    pub fn match_command(&self) -> Option<&Task> {
        self.tasks.get(self.args.command())
    }

    /// All registered tasks, sorted by name.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn args(&self) -> &ParsedArguments {
        &self.args
    }

    pub fn command(&self) -> &str {
        self.args.command()
    }

    /// How the most recent run ended, if there was one.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Runs the matched task with its hooks.
    ///
    /// Failures while matching, resolving or invoking are routed to the error
    /// hooks and do not surface here; with no error hooks registered they are
    /// only logged. An error returned from this method came from an error
    /// hook itself.
    pub fn run(&mut self) -> Result<&mut Self> {
        tracing::debug!(command = self.args.command(), "run started");

        match self.execute() {
            Ok(()) => {
                tracing::debug!(command = self.args.command(), "run succeeded");
                self.outcome = Some(Outcome::Succeeded);
            }
            Err(failure) => {
                self.outcome = Some(Outcome::Failed(failure.phase()));
                self.handle_failure(failure)?;
            }
        }

        Ok(self)
    }

    fn execute(&mut self) -> Result<()> {
        let Self {
            args,
            registry,
            tasks,
            init,
            shutdown,
            ..
        } = self;

        let task = tasks
            .get(args.command())
            .ok_or_else(|| DispatchError::NoCommandFound(args.command().to_string()))?;
        tracing::debug!(task = task.name(), "matched task");

        for hook in init.iter() {
            invoke(hook, registry, args)?;
        }
        invoke(task.hook(), registry, args)?;
        for hook in shutdown.iter() {
            invoke(hook, registry, args)?;
        }
        Ok(())
    }

    fn handle_failure(&mut self, failure: DispatchError) -> Result<()> {
        if self.errors.is_empty() {
            tracing::warn!(error = %failure, "run failed and no error hooks are registered");
            return Ok(());
        }
        tracing::warn!(error = %failure, hooks = self.errors.len(), "run failed; running error hooks");

        let failure: Resource = Rc::new(failure);
        let Self {
            args,
            registry,
            errors,
            ..
        } = self;
        for hook in errors.iter() {
            registry.provide(ERROR_RESOURCE, failure.clone());
            invoke(hook, registry, args)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("command", &self.args.command())
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .field("init_count", &self.init.len())
            .field("shutdown_count", &self.shutdown.len())
            .field("error_count", &self.errors.len())
            .field("registry", &self.registry)
            .finish()
    }
}

fn push_hook(hooks: &mut Vec<Hook>) -> &mut Hook {
    hooks.push(Hook::new());
    let last = hooks.len() - 1;
    &mut hooks[last]
}

/// Resolves a hook's declarations and calls its action.
fn invoke(hook: &Hook, registry: &mut ResourceRegistry, args: &ParsedArguments) -> Result<()> {
    let arguments = resolve_arguments(hook, registry, args)?;
    (hook.get_action())(&arguments).map_err(DispatchError::Action)
}

/// Builds the argument list for a hook, in declaration order.
pub(crate) fn resolve_arguments(
    hook: &Hook,
    registry: &mut ResourceRegistry,
    args: &ParsedArguments,
) -> Result<Arguments> {
    let mut entries = Vec::with_capacity(hook.declarations().len());
    for declaration in hook.declarations() {
        let entry = match declaration {
            Declaration::Param(spec) => Argument::Param {
                name: spec.key.clone(),
                value: resolve_param(spec, args)?,
            },
            Declaration::Injection(name) => Argument::Resource {
                name: name.clone(),
                value: registry.resolve(name)?,
            },
        };
        entries.push(entry);
    }
    Ok(Arguments::new(entries))
}

/// Takes the flag value or the default, then validates it.
fn resolve_param(spec: &ParameterSpec, args: &ParsedArguments) -> Result<Value> {
    let value = match args.get(&spec.key) {
        Some(arg) => arg.to_value(),
        None => spec.default.clone(),
    };

    if is_empty(&value) {
        if !spec.optional {
            return Err(DispatchError::MissingParam(spec.key.clone()));
        }
        tracing::trace!(param = %spec.key, "optional param left empty");
        return Ok(value);
    }

    let validator =
        spec.validator
            .instantiate()
            .map_err(|e| DispatchError::InvalidValidator {
                key: spec.key.clone(),
                reason: e.to_string(),
            })?;

    if !validator.is_valid(&value) {
        return Err(DispatchError::InvalidParam {
            key: spec.key.clone(),
            description: validator.description(),
        });
    }

    tracing::trace!(param = %spec.key, "param resolved");
    Ok(value)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{Text, ValidatorSource};
    use serde_json::json;

    fn dispatcher(argv: &[&str]) -> Dispatcher {
        Dispatcher::new(argv.iter().copied()).unwrap()
    }

    fn param_spec(key: &str, default: Value, optional: bool) -> ParameterSpec {
        ParameterSpec {
            key: key.into(),
            default,
            validator: Text::new(10).into(),
            description: String::new(),
            optional,
        }
    }

    #[test]
    fn test_match_exact_name_only() {
        let mut cli = dispatcher(&["test.php", "build2"]);
        cli.task("build1");
        cli.task("build2");
        assert_eq!(cli.match_command().map(Task::name), Some("build2"));

        for command in ["buildx", "build", "build22", "uild2"] {
            let mut cli = dispatcher(&["test.php", command]);
            cli.task("build1");
            cli.task("build2");
            assert!(cli.match_command().is_none(), "{} should not match", command);
        }
    }

    #[test]
    fn test_task_reregistration_replaces() {
        let mut cli = dispatcher(&["prog", "build"]);
        cli.task("build").desc("first");
        cli.task("build").desc("second");
        assert_eq!(cli.tasks().count(), 1);
        assert_eq!(cli.match_command().map(Task::description), Some("second"));
    }

    #[test]
    fn test_resolve_param_from_args() {
        let args = ParsedArguments::parse(["prog", "cmd", "--k=v"]).unwrap();
        let value = resolve_param(&param_spec("k", Value::Null, false), &args).unwrap();
        assert_eq!(value, json!("v"));
    }

    #[test]
    fn test_resolve_param_default() {
        let args = ParsedArguments::parse(["prog", "cmd"]).unwrap();
        let value = resolve_param(&param_spec("k", json!("fallback"), false), &args).unwrap();
        assert_eq!(value, json!("fallback"));
    }

    #[test]
    fn test_resolve_param_missing() {
        let args = ParsedArguments::parse(["prog", "cmd", "--k="]).unwrap();
        let err = resolve_param(&param_spec("k", Value::Null, false), &args).unwrap_err();
        assert!(matches!(err, DispatchError::MissingParam(ref k) if k == "k"));

        let args = ParsedArguments::parse(["prog", "cmd"]).unwrap();
        let err = resolve_param(&param_spec("k", Value::Null, false), &args).unwrap_err();
        assert!(matches!(err, DispatchError::MissingParam(_)));
    }

    #[test]
    fn test_resolve_param_optional_empty_skips_validation() {
        let args = ParsedArguments::parse(["prog", "cmd"]).unwrap();
        let value = resolve_param(&param_spec("k", json!(""), true), &args).unwrap();
        assert_eq!(value, json!(""));
    }

    #[test]
    fn test_resolve_param_invalid() {
        let args = ParsedArguments::parse(["prog", "cmd", "--k=me.example.com"]).unwrap();
        let err = resolve_param(&param_spec("k", Value::Null, false), &args).unwrap_err();
        match err {
            DispatchError::InvalidParam { key, description } => {
                assert_eq!(key, "k");
                assert_eq!(
                    description,
                    "Value must be a valid string and no longer than 10 chars"
                );
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_resolve_param_broken_validator_factory() {
        let args = ParsedArguments::parse(["prog", "cmd", "--k=v"]).unwrap();
        let spec = ParameterSpec {
            validator: ValidatorSource::factory(|| Err(anyhow::anyhow!("not a validator"))),
            ..param_spec("k", Value::Null, false)
        };
        let err = resolve_param(&spec, &args).unwrap_err();
        assert!(err.is_defect());
        assert!(matches!(err, DispatchError::InvalidValidator { .. }));
    }

    #[test]
    fn test_arguments_follow_declaration_order() {
        let args = ParsedArguments::parse(["prog", "cmd", "--email=me@example.com"]).unwrap();
        let mut registry = ResourceRegistry::new();
        registry
            .register("test", &[], |_| Ok("test-value".to_string()))
            .unwrap();

        let mut hook = Hook::new();
        hook.inject("test")
            .unwrap()
            .param("email", Value::Null, Text::new(15), "", false);

        let arguments = resolve_arguments(&hook, &mut registry, &args).unwrap();
        assert_eq!(arguments.names(), vec!["test", "email"]);
    }

    #[test]
    fn test_cli_resource_is_injectable() {
        let mut cli = dispatcher(&["prog", "deploy", "--env=prod"]);
        let context = cli
            .resource(CLI_RESOURCE)
            .unwrap()
            .downcast::<CliContext>()
            .unwrap();
        assert_eq!(context.command, "deploy");
        assert!(context.args.contains("env"));
    }

    #[test]
    fn test_outcome_recorded() {
        let mut cli = dispatcher(&["prog", "missing"]);
        assert_eq!(cli.outcome(), None);
        cli.run().unwrap();
        assert_eq!(cli.outcome(), Some(Outcome::Failed(Phase::Matching)));
    }

    #[test]
    fn test_builder_with_registry() {
        let mut registry = ResourceRegistry::new();
        registry.register("answer", &[], |_| Ok(42u8)).unwrap();

        let mut cli = Dispatcher::builder()
            .args(["prog", "cmd"])
            .registry(registry)
            .build()
            .unwrap();
        let answer = cli.resource("answer").unwrap().downcast::<u8>().unwrap();
        assert_eq!(*answer, 42);
    }

    #[test]
    fn test_builder_missing_command() {
        let result = Dispatcher::builder().args(["prog"]).build();
        assert!(matches!(result, Err(DispatchError::MissingCommand)));
    }
}
