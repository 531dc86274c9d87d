//! Core implementation of the cmdtree command dispatcher
//!
//! cmdtree resolves an already tokenized command line into a registered
//! handler. Commands are organized as a tree of aliases: the first argument
//! selects a child, recursively, until no child matches and the command at
//! that point runs. Every command on the way checks the source's permission
//! and its own argument bounds.
//!
//! A host application (typically a game server) supplies the
//! [`source::CommandSource`] that runs a command and, optionally, a
//! [`source::Server`] for player and world lookups.

use std::collections::HashSet;
use std::path::PathBuf;

use log::{debug, warn};

use crate::commands::command::fold_alias;
use crate::config_file::{Config, ConfigCommand, ConfigError};

pub mod arguments;
pub mod commands;
pub mod config_file;
pub mod logger;
pub mod source;

pub use arguments::Arguments;
pub use commands::binding::{BindingFactory, CommandHandler, CommandSpec, HandlerResult};
pub use commands::command::Command;
pub use commands::error::CommandError;
pub use commands::executor::{Executor, ExecutorTable};
pub use commands::manager::CommandManager;
pub use source::CommandSource;

/// Load a command manifest from a file (or auto-detect), returning it with its path.
///
/// # Errors
///
/// Returns `ConfigError` if the manifest is not found, cannot be parsed, or
/// contains invalid entries.
pub fn load_config(config_file: Option<&str>) -> Result<(Config, PathBuf), ConfigError> {
    let config_path = match config_file {
        Some(file) => {
            let config_path = PathBuf::from(file);
            if !config_path.exists() {
                return Err(ConfigError::ConfigNotFound(config_path));
            }
            config_path
        }
        None => Config::find_config()?,
    };
    debug!("Loading command manifest: {}", config_path.display());
    let config = Config::from_file(&config_path)?;
    validate_version(&config.cmdtree_version);
    validate_tree(&config)?;
    Ok((config, config_path))
}

/// Warn if the manifest's `cmdtree_version` doesn't match the binary version
fn validate_version(config_version: &str) {
    let binary_version = env!("CARGO_PKG_VERSION");
    if config_version != binary_version {
        warn!(
            "Manifest cmdtree_version '{config_version}' differs from binary version '{binary_version}'"
        );
    }
}

/// Validate the manifest for missing or duplicate aliases and inverted bounds
fn validate_tree(config: &Config) -> Result<(), ConfigError> {
    check_siblings(&config.commands, "the root")?;
    for command in &config.commands {
        check_command(command)?;
    }
    Ok(())
}

fn check_siblings(siblings: &[ConfigCommand], parent: &str) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for command in siblings {
        if command.aliases.is_empty() {
            return Err(ConfigError::Validation(format!(
                "A command under {parent} has no aliases"
            )));
        }
        // Aliases repeated within one command are harmless; across siblings they are ambiguous.
        let own: HashSet<String> = command.aliases.iter().map(|a| fold_alias(a)).collect();
        for alias in own {
            if !seen.insert(alias.clone()) {
                return Err(ConfigError::DuplicateAlias {
                    alias,
                    parent: parent.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_command(command: &ConfigCommand) -> Result<(), ConfigError> {
    let name = command.name();
    if command.aliases.iter().any(|alias| alias.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "Command '{name}' has an empty alias"
        )));
    }
    if let Some(max) = command.max
        && command.min.unwrap_or(0) > max
    {
        return Err(ConfigError::Validation(format!(
            "Command '{name}' has min {} greater than max {max}",
            command.min.unwrap_or(0)
        )));
    }
    if command.handler.is_none() && command.children().is_empty() {
        warn!("Command '{name}' has no handler and no children");
    }
    check_siblings(command.children(), &format!("'{name}'"))?;
    for child in command.children() {
        check_command(child)?;
    }
    Ok(())
}
