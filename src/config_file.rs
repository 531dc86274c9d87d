//! Command manifest handling for cmdtree

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::command::Command;
use crate::commands::executor::ExecutorTable;
use crate::commands::manager::CommandManager;

/// Errors that can occur while loading a command manifest
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No command manifest found in current directory or its parents: {0}")]
    ConfigNotFound(PathBuf),
    #[error("Unknown working directory: {0}")]
    UnknownWorkingDirectory(String),
    #[error("Unable to parse YAML manifest {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON manifest {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("Command '{command}' refers to unknown handler '{handler}'")]
    UnknownHandler { command: String, handler: String },
    #[error("Duplicate alias '{alias}' under {parent}")]
    DuplicateAlias { alias: String, parent: String },
    #[error("Invalid manifest: {0}")]
    Validation(String),
}

/// Manifest entry for a single command and its subcommands
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ConfigCommand {
    pub aliases: Vec<String>,
    #[serde(default, alias = "desc")]
    pub description: Option<String>,
    pub usage: Option<String>,
    pub permission: Option<String>,
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub handler: Option<String>,
    pub children: Option<Vec<ConfigCommand>>,
}

impl ConfigCommand {
    /// The primary alias, or an empty string for an invalid entry.
    #[must_use]
    pub fn name(&self) -> &str {
        self.aliases.first().map_or("", String::as_str)
    }

    #[must_use]
    pub fn children(&self) -> &[ConfigCommand] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Builds the command described by this entry, resolving handler names in `executors`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownHandler` if a `handler` is not in `executors`.
    pub fn build(&self, executors: &ExecutorTable) -> Result<Command, ConfigError> {
        let mut command = Command::new(self.name());
        command
            .add_alias(&self.aliases)
            .set_argument_bounds(self.min.unwrap_or(0), self.max);
        if let Some(description) = &self.description {
            command.set_help(description.clone());
        }
        if let Some(usage) = &self.usage {
            command.set_usage(usage.clone());
        }
        if let Some(permission) = &self.permission {
            command.set_permission(permission.clone());
        }
        if let Some(handler) = &self.handler {
            let executor = executors
                .get(handler)
                .ok_or_else(|| ConfigError::UnknownHandler {
                    command: self.name().to_string(),
                    handler: handler.clone(),
                })?;
            command.set_executor(executor);
        }
        for child in self.children() {
            command.push_child(child.build(executors)?);
        }
        Ok(command)
    }
}

/// Root manifest structure for cmdtree
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub cmdtree_version: String,
    #[serde(default)]
    pub commands: Vec<ConfigCommand>,
}

/// List of supported manifest file names
const FILENAMES: [&str; 3] = [".cmdtree.json", ".cmdtree.yaml", ".cmdtree.yml"];

impl Config {
    /// Loads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if the file cannot be read, or
    /// `ConfigError::Yaml`/`ConfigError::Json` if parsing fails.
    pub fn from_file(file: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(file)
            .map_err(|_| ConfigError::ConfigNotFound(file.to_path_buf()))?;
        let config: Config = if file.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Json {
                source: e,
                path: file.to_path_buf(),
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml {
                source: e,
                path: file.to_path_buf(),
            })?
        };
        Ok(config)
    }

    /// Searches for a manifest in the current directory and its parents.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownWorkingDirectory` if the cwd cannot be determined,
    /// or `ConfigError::ConfigNotFound` if no manifest is found.
    pub fn find_config() -> Result<PathBuf, ConfigError> {
        let config_path = std::env::current_dir()
            .map_err(|e| ConfigError::UnknownWorkingDirectory(e.to_string()))?;
        let mut path = config_path.clone();
        debug!("Searching for command manifest in {}", config_path.display());
        loop {
            for file in &FILENAMES {
                let config_path = path.join(file);
                if config_path.exists() {
                    info!("Found command manifest: {}", config_path.display());
                    return Ok(config_path);
                }
            }
            if !path.pop() {
                return Err(ConfigError::ConfigNotFound(config_path));
            }
        }
    }
}

impl CommandManager {
    /// Builds a registry holding every command of `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownHandler` if a command names a handler
    /// missing from `executors`.
    pub fn from_config(config: &Config, executors: &ExecutorTable) -> Result<Self, ConfigError> {
        let mut manager = CommandManager::new();
        for entry in &config.commands {
            manager.push_command(entry.build(executors)?);
        }
        info!("Registered {} root command(s)", manager.commands().len());
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::Arguments;
    use crate::commands::error::CommandError;
    use crate::source::{CommandSource, ConsoleSource};
    use std::sync::Arc;

    #[test]
    fn test_from_file_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cmdtree.json");
        std::fs::write(
            &path,
            r#"{
                "cmdtree_version": "0.1.0",
                "commands": [{"aliases": ["spawn"], "description": "Go to spawn"}]
            }"#,
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.commands[0].name(), "spawn");
        assert_eq!(config.commands[0].description.as_deref(), Some("Go to spawn"));
    }

    #[test]
    fn test_from_file_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cmdtree.yaml");
        std::fs::write(
            &path,
            "cmdtree_version: '0.1.0'\ncommands:\n  - aliases: [home, h]\n    desc: Go home\n    children:\n      - aliases: [set]\n        min: 1\n        max: 1\n",
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        let home = &config.commands[0];
        assert_eq!(home.aliases, vec!["home", "h"]);
        assert_eq!(home.description.as_deref(), Some("Go home"));
        assert_eq!(home.children()[0].min, Some(1));
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cmdtree.yaml");
        std::fs::write(&path, "cmdtree_version: [nope\n").unwrap();
        match Config::from_file(&path) {
            Err(ConfigError::Yaml { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("Expected ConfigError::Yaml, got: {other:?}"),
        }
    }

    #[test]
    fn test_build_resolves_handlers() {
        let mut executors = ExecutorTable::new();
        executors.insert(
            "fail",
            Arc::new(
                |_: &dyn CommandSource,
                 command: &Command,
                 _: &Arguments|
                 -> Result<(), CommandError> {
                    Err(CommandError::failed(format!("{} ran", command.name())))
                },
            ),
        );
        let entry = ConfigCommand {
            aliases: vec!["warp".to_string()],
            permission: Some("warp.use".to_string()),
            children: Some(vec![ConfigCommand {
                aliases: vec!["go".to_string(), "g".to_string()],
                handler: Some("fail".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let warp = entry.build(&executors).unwrap();
        assert_eq!(warp.permission(), Some("warp.use"));
        assert!(warp.executor().is_none());

        let source = ConsoleSource::new("op", vec!["*".to_string()], Box::new(std::io::sink()));
        let err = warp.execute_tokens(&source, &["G"]).unwrap_err();
        assert_eq!(err.to_string(), "go ran");
    }

    #[test]
    fn test_build_unknown_handler() {
        let entry = ConfigCommand {
            aliases: vec!["warp".to_string()],
            handler: Some("missing".to_string()),
            ..Default::default()
        };
        match entry.build(&ExecutorTable::new()) {
            Err(ConfigError::UnknownHandler { command, handler }) => {
                assert_eq!(command, "warp");
                assert_eq!(handler, "missing");
            }
            other => panic!("Expected UnknownHandler, got: {other:?}"),
        }
    }
}
