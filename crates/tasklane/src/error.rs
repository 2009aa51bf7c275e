//! Error types for argument parsing, registration and dispatch.

use std::fmt;

use thiserror::Error;

/// The stage of a run in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Looking up the command in the task registry.
    Matching,
    /// Resolving parameters and injections for a task or hook.
    Resolving,
    /// Running a task or hook action.
    Invoking,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Matching => write!(f, "matching"),
            Phase::Resolving => write!(f, "resolving"),
            Phase::Invoking => write!(f, "invoking"),
        }
    }
}

/// Everything that can go wrong while building or running a dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The argument vector held no command token.
    #[error("Missing command")]
    MissingCommand,

    /// No task is registered under the requested command name.
    #[error("No command found")]
    NoCommandFound(String),

    /// A required parameter was absent or empty.
    #[error("Param \"{0}\" is not optional.")]
    MissingParam(String),

    /// A parameter value was rejected by its validator.
    #[error("Invalid {key}: {description}")]
    InvalidParam { key: String, description: String },

    /// A validator factory could not produce a validator.
    #[error("Validator for param \"{key}\" could not be created: {reason}")]
    InvalidValidator { key: String, reason: String },

    /// A resource was requested that was never registered.
    #[error("Failed to find resource: \"{0}\"")]
    UnknownResource(String),

    /// Attempt to register a resource under a name owned by the dispatcher.
    #[error("Resource name \"{0}\" is reserved")]
    ReservedName(String),

    /// The same resource was injected twice into one task or hook.
    #[error("Resource \"{0}\" is already injected")]
    DuplicateInjection(String),

    /// Resource dependencies form a cycle.
    #[error("Circular resource dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// A resource holds a value of a different type than requested.
    #[error("Resource \"{name}\" is not a {expected}")]
    ResourceType { name: String, expected: &'static str },

    /// A resource factory returned an error.
    #[error("Resource \"{name}\" failed: {source}")]
    ResourceFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A task or hook action returned an error.
    #[error("{0}")]
    Action(#[source] anyhow::Error),

    /// A worker thread panicked.
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
}

impl DispatchError {
    /// Returns true for programmer errors, as opposed to bad user input or
    /// failures inside user callbacks.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            DispatchError::InvalidValidator { .. }
                | DispatchError::UnknownResource(_)
                | DispatchError::ReservedName(_)
                | DispatchError::DuplicateInjection(_)
                | DispatchError::CyclicDependency(_)
                | DispatchError::ResourceType { .. }
        )
    }

    /// The run phase a failure belongs to when it surfaces from `run()`.
    pub fn phase(&self) -> Phase {
        match self {
            DispatchError::NoCommandFound(_) | DispatchError::MissingCommand => Phase::Matching,
            DispatchError::Action(_) | DispatchError::WorkerPanicked(_) => Phase::Invoking,
            _ => Phase::Resolving,
        }
    }
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_user_facing_text() {
        assert_eq!(DispatchError::MissingCommand.to_string(), "Missing command");
        assert_eq!(
            DispatchError::NoCommandFound("buildx".into()).to_string(),
            "No command found"
        );
        assert_eq!(
            DispatchError::MissingParam("email".into()).to_string(),
            "Param \"email\" is not optional."
        );
        assert_eq!(
            DispatchError::InvalidParam {
                key: "email".into(),
                description: "Value must be a valid string and no longer than 10 chars".into(),
            }
            .to_string(),
            "Invalid email: Value must be a valid string and no longer than 10 chars"
        );
    }

    #[test]
    fn cycle_message_shows_chain() {
        let err = DispatchError::CyclicDependency(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Circular resource dependency: a -> b -> a");
    }

    #[test]
    fn defects_are_distinguished_from_input_errors() {
        assert!(DispatchError::InvalidValidator {
            key: "k".into(),
            reason: "r".into()
        }
        .is_defect());
        assert!(DispatchError::DuplicateInjection("x".into()).is_defect());
        assert!(!DispatchError::MissingParam("k".into()).is_defect());
        assert!(!DispatchError::Action(anyhow::anyhow!("boom")).is_defect());
    }

    #[test]
    fn phase_of_failures() {
        assert_eq!(
            DispatchError::NoCommandFound("x".into()).phase(),
            Phase::Matching
        );
        assert_eq!(
            DispatchError::MissingParam("x".into()).phase(),
            Phase::Resolving
        );
        assert_eq!(
            DispatchError::Action(anyhow::anyhow!("x")).phase(),
            Phase::Invoking
        );
    }
}
