use std::fmt;

use thiserror::Error;

/// The type a token was expected to parse as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentType {
    Integer,
    Double,
    Boolean,
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgumentType::Integer => "integer",
            ArgumentType::Double => "floating point",
            ArgumentType::Boolean => "boolean value",
        })
    }
}

/// Which argument bound was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentBound {
    TooFew { minimum: usize },
    TooMany { maximum: usize },
}

impl fmt::Display for ArgumentBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentBound::TooFew { minimum } => {
                write!(f, "Not enough arguments. (minimum {minimum})")
            }
            ArgumentBound::TooMany { maximum } => {
                write!(f, "Too many arguments. (maximum {maximum})")
            }
        }
    }
}

/// Every failure a command invocation can report back to its source.
///
/// Hosts are expected to catch these and relay the `Display` text to whoever
/// ran the command.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command '{command}' exists but no executor has been set.")]
    NoHandler { command: String },

    #[error("You do not have permission to execute this command.")]
    Permission { permission: String },

    #[error("{bound} Usage: {usage}")]
    ArgumentCount { bound: ArgumentBound, usage: String },

    #[error("Specified index is out of bounds. (index {index}; size {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("Expected {expected} at index {index}")]
    Parse { index: usize, expected: ArgumentType },

    #[error("{kind} not found: {name}")]
    Lookup { kind: &'static str, name: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A handler rejected the invocation with its own message.
    #[error("{0}")]
    Failed(String),

    /// A handler returned an error that was not a `CommandError`.
    #[error("{message}")]
    Invocation {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CommandError {
    /// Shorthand for handlers reporting a plain failure message.
    pub fn failed(message: impl Into<String>) -> Self {
        CommandError::Failed(message.into())
    }
}
