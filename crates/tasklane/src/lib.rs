//! Command dispatch with parameter validation, resource injection and
//! lifecycle hooks.
//!
//! `tasklane` turns an argument vector like
//! `prog build --email=me@example.com --list=a --list=b` into a call of the
//! task registered as `build`, with its declared parameters validated and its
//! declared resources injected.
//!
//! # Features
//!
//! - **Argument parsing**: `--key=value` flags, repeated flags become lists
//! - **Tasks**: description, labels, an action, and an ordered list of
//!   parameters and injections
//! - **Validators**: a small capability trait plus built-ins ([`validator`])
//! - **Resources**: lazily computed, memoized, dependency-resolving factories
//! - **Hooks**: init, shutdown and error hooks sharing the task resolution path
//! - **Adapters**: run a dispatch callback once or on a pool of threads
//!
//! # Run cycle
//!
//! Init hooks run first, then the task, then shutdown hooks, each resolving
//! its own arguments at its execution point. Any failure on the way stops the
//! cycle and runs the error hooks instead, with the failure injectable as the
//! `error` resource:
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//! use tasklane::{DispatchError, Dispatcher, validator::{ArrayList, Text}};
//! use serde_json::Value;
//!
//! let out = Rc::new(RefCell::new(String::new()));
//! let mut cli = Dispatcher::new(["prog", "build", "--email=me@example.com", "--list=a", "--list=b"])?;
//!
//! let sink = out.clone();
//! cli.task("build")
//!     .param("email", Value::Null, Text::new(0), "Valid email address", false)
//!     .param("list", Value::Null, ArrayList::new(Text::new(256), 0), "Items", false)
//!     .action(move |args| {
//!         let email: String = args.param("email")?;
//!         let list: Vec<String> = args.param("list")?;
//!         sink.borrow_mut().push_str(&format!("{}-{}", email, list.join("-")));
//!         Ok(())
//!     });
//!
//! let sink = out.clone();
//! cli.error().inject("error")?.action(move |args| {
//!     let error = args.resource::<DispatchError>("error")?;
//!     sink.borrow_mut().push_str(&error.to_string());
//!     Ok(())
//! });
//!
//! cli.run()?;
//! assert_eq!(out.borrow().as_str(), "me@example.com-a-b");
//! # Ok::<(), DispatchError>(())
//! ```

mod adapter;
mod args;
mod dispatch;
mod error;
mod handler;
mod resource;
mod task;

pub mod validator;

pub use adapter::{Adapter, Generic, StopToken, WorkerFn, WorkerPool};

pub use args::{ArgValue, ParsedArguments};

pub use dispatch::{CliContext, Dispatcher, DispatcherBuilder, Outcome};

pub use error::{DispatchError, Phase, Result};

pub use handler::{ActionFn, Argument, Arguments};

pub use resource::{
    Dependencies, Resource, ResourceRegistry, CLI_RESOURCE, ERROR_RESOURCE, RESERVED_NAMES,
};

pub use task::{Declaration, Hook, ParameterSpec, Task};

pub use validator::{Validator, ValidatorSource};
