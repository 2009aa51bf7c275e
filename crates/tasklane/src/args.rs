//! Argument vector parsing.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! <program> <command> [--key=value ...] [--key=value1 --key=value2 ...]
//! ```
//!
//! The program path is dropped, the first remaining token is the command name,
//! and every other token is split on its first `=` into a key and a value.
//! Keys seen once hold a single value; repeated keys collect every value in
//! encounter order.

use serde_json::Value;

use crate::error::{DispatchError, Result};

const FLAG_PREFIX: &str = "--";

/// The value of one flag: a single string, or a list when the flag repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Single(String),
    List(Vec<String>),
}

impl ArgValue {
    /// Returns the single value, if this flag appeared once.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Single(s) => Some(s),
            ArgValue::List(_) => None,
        }
    }

    /// Returns every value in encounter order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            ArgValue::Single(s) => vec![s.as_str()],
            ArgValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Converts to the dynamic value handed to validators and actions.
    pub fn to_value(&self) -> Value {
        match self {
            ArgValue::Single(s) => Value::String(s.clone()),
            ArgValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// A parsed invocation: the command name plus the flag map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArguments {
    command: String,
    values: Vec<(String, ArgValue)>,
}

impl ParsedArguments {
    /// Parses a full argument vector, program path included.
    ///
    /// Fails with [`DispatchError::MissingCommand`] when nothing follows the
    /// program path.
    pub fn parse<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = argv.into_iter().map(Into::into).skip(1);
        let command = tokens.next().ok_or(DispatchError::MissingCommand)?;

        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for token in tokens {
            let (key, value) = split_token(&token);
            match grouped.iter_mut().find(|(k, _)| k == key) {
                Some((_, values)) => values.push(value.to_string()),
                None => grouped.push((key.to_string(), vec![value.to_string()])),
            }
        }

        let values = grouped
            .into_iter()
            .map(|(key, mut values)| {
                let value = if values.len() == 1 {
                    ArgValue::Single(values.remove(0))
                } else {
                    ArgValue::List(values)
                };
                (key, value)
            })
            .collect::<Vec<_>>();

        tracing::debug!(command = %command, flags = values.len(), "parsed arguments");

        Ok(Self { command, values })
    }

    /// The command name (first token after the program path).
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Looks up a flag by key (without the `--` prefix).
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns true if the flag was passed at all.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates flags in first-encounter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct flag keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no flags were passed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Strips the flag prefix and splits on the first `=`. A token without `=`
/// yields an empty value.
fn split_token(token: &str) -> (&str, &str) {
    let token = token.strip_prefix(FLAG_PREFIX).unwrap_or(token);
    token.split_once('=').unwrap_or((token, ""))
}
