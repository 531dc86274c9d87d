use std::collections::HashMap;
use std::sync::Arc;

use crate::arguments::Arguments;
use crate::commands::command::Command;
use crate::commands::error::CommandError;
use crate::source::CommandSource;

/// The operation a command runs once routing has settled on it.
pub trait Executor: Send + Sync {
    /// # Errors
    ///
    /// Returns `CommandError` when the invocation fails for any reason.
    fn execute(
        &self,
        source: &dyn CommandSource,
        command: &Command,
        args: &Arguments,
    ) -> Result<(), CommandError>;
}

impl<F> Executor for F
where
    F: Fn(&dyn CommandSource, &Command, &Arguments) -> Result<(), CommandError> + Send + Sync,
{
    fn execute(
        &self,
        source: &dyn CommandSource,
        command: &Command,
        args: &Arguments,
    ) -> Result<(), CommandError> {
        self(source, command, args)
    }
}

/// Named executors that a command manifest can refer to by its `handler` key.
#[derive(Default, Clone)]
pub struct ExecutorTable {
    executors: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an executor under `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, executor: Arc<dyn Executor>) -> &mut Self {
        self.executors.insert(name.into(), executor);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Executor>> {
        self.executors.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    /// Handler names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ExecutorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorTable")
            .field("executors", &self.names())
            .finish()
    }
}
