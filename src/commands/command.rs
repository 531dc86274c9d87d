use std::fmt;
use std::sync::Arc;

use log::debug;
use uuid::Uuid;

use crate::arguments::Arguments;
use crate::commands::error::{ArgumentBound, CommandError};
use crate::commands::executor::Executor;
use crate::source::CommandSource;

/// The case-folded form aliases are compared in. Folds full Unicode, not just ASCII.
pub(crate) fn fold_alias(alias: &str) -> String {
    alias.to_lowercase()
}

/// A node in the command tree.
///
/// A command is recognized under any of its aliases (compared
/// case-insensitively) and may own children that are routed to by the first
/// argument. A command without an executor is a pure routing point.
pub struct Command {
    id: Uuid,
    name: String,
    aliases: Vec<String>,
    children: Vec<Command>,
    help: Option<String>,
    usage: Option<String>,
    permission: Option<String>,
    min_args: usize,
    max_args: Option<usize>,
    executor: Option<Arc<dyn Executor>>,
}

impl Command {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            aliases: vec![name.clone()],
            name,
            children: Vec::new(),
            help: None,
            usage: None,
            permission: None,
            min_args: 0,
            max_args: None,
            executor: None,
        }
    }

    /// Executes the command, or the child named by the first argument.
    ///
    /// Permission and argument bounds are checked on every command along the
    /// route, so a child is only reached once its parent accepted the call.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Permission` if the source lacks this command's
    /// permission, `CommandError::ArgumentCount` if the argument count is out
    /// of bounds, `CommandError::NoHandler` if neither a child nor an executor
    /// can take the call, and whatever the executor itself returns.
    pub fn execute(&self, source: &dyn CommandSource, args: &Arguments) -> Result<(), CommandError> {
        if let Some(permission) = &self.permission
            && !source.has_permission(permission)
        {
            debug!(
                "{} denied '{}': missing permission {permission}",
                source.name(),
                self.name
            );
            return Err(CommandError::Permission {
                permission: permission.clone(),
            });
        }

        self.check_bounds(source, args.len())?;

        if let Ok(label) = args.get_string(0)
            && let Some(child) = self.child(label)
        {
            debug!("Routing '{}' to child '{}'", self.name, child.name);
            return child.execute(source, &args.tail());
        }

        match &self.executor {
            Some(executor) => {
                debug!("Executing '{}' with {} argument(s)", self.name, args.len());
                executor.execute(source, self, args)
            }
            None => Err(CommandError::NoHandler {
                command: self.name.clone(),
            }),
        }
    }

    fn check_bounds(&self, source: &dyn CommandSource, len: usize) -> Result<(), CommandError> {
        let bound = if len < self.min_args {
            ArgumentBound::TooFew {
                minimum: self.min_args,
            }
        } else if let Some(maximum) = self.max_args.filter(|&maximum| len > maximum) {
            ArgumentBound::TooMany { maximum }
        } else {
            return Ok(());
        };
        source.send_message(&bound.to_string());
        Err(CommandError::ArgumentCount {
            bound,
            usage: self.usage.clone().unwrap_or_default(),
        })
    }

    /// Convenience for executing with borrowed tokens.
    ///
    /// # Errors
    ///
    /// See [`Command::execute`].
    pub fn execute_tokens(&self, source: &dyn CommandSource, args: &[&str]) -> Result<(), CommandError> {
        self.execute(source, &Arguments::from(args))
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The primary alias of this command
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every name this command is recognized under, the primary name included.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether `label` is one of this command's aliases, ignoring case.
    #[must_use]
    pub fn matches(&self, label: &str) -> bool {
        let label = fold_alias(label);
        self.aliases.iter().any(|alias| fold_alias(alias) == label)
    }

    /// Adds names this command is recognized under. Names already present are skipped.
    pub fn add_alias<S: AsRef<str>>(&mut self, aliases: &[S]) -> &mut Self {
        for alias in aliases {
            let alias = alias.as_ref();
            if !self.matches(alias) {
                self.aliases.push(alias.to_string());
            }
        }
        self
    }

    /// Removes names this command is recognized under. The primary name always stays.
    pub fn remove_alias<S: AsRef<str>>(&mut self, aliases: &[S]) -> &mut Self {
        let name = &self.name;
        let removed: Vec<String> = aliases.iter().map(|a| fold_alias(a.as_ref())).collect();
        self.aliases
            .retain(|alias| alias == name || !removed.contains(&fold_alias(alias)));
        self
    }

    #[must_use]
    pub fn children(&self) -> &[Command] {
        &self.children
    }

    /// Finds a child by any of its aliases without modifying the tree.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Command> {
        self.children.iter().find(|child| child.matches(name))
    }

    #[must_use]
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Command> {
        self.children.iter_mut().find(|child| child.matches(name))
    }

    /// Finds a child by alias, creating one named `name` if none matches.
    pub fn child_or_create(&mut self, name: &str) -> &mut Command {
        let index = match self.children.iter().position(|child| child.matches(name)) {
            Some(index) => index,
            None => {
                self.children.push(Command::new(name));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Returns the child with the given alias, creating it when `create_if_absent` is set.
    pub fn get_child(&mut self, name: &str, create_if_absent: bool) -> Option<&mut Command> {
        if create_if_absent {
            Some(self.child_or_create(name))
        } else {
            self.child_mut(name)
        }
    }

    /// Adds a fully built child. Used when assembling a tree from a manifest.
    pub(crate) fn push_child(&mut self, child: Command) -> &mut Command {
        self.children.push(child);
        let index = self.children.len() - 1;
        &mut self.children[index]
    }

    /// Finds a node in this subtree by its id.
    pub(crate) fn find_mut(&mut self, id: Uuid) -> Option<&mut Command> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    #[must_use]
    pub fn executor(&self) -> Option<&Arc<dyn Executor>> {
        self.executor.as_ref()
    }

    pub fn set_executor(&mut self, executor: Arc<dyn Executor>) -> &mut Self {
        self.executor = Some(executor);
        self
    }

    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn set_help(&mut self, help: impl Into<String>) -> &mut Self {
        self.help = Some(help.into());
        self
    }

    /// The correct usage for this command
    #[must_use]
    pub fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    pub fn set_usage(&mut self, usage: impl Into<String>) -> &mut Self {
        self.usage = Some(usage.into());
        self
    }

    /// The permission node required to execute this command
    #[must_use]
    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    pub fn set_permission(&mut self, permission: impl Into<String>) -> &mut Self {
        self.permission = Some(permission.into());
        self
    }

    /// Sets the accepted argument count. `None` leaves the maximum unbounded.
    pub fn set_argument_bounds(&mut self, min_args: usize, max_args: Option<usize>) -> &mut Self {
        self.min_args = min_args;
        self.max_args = max_args;
        self
    }

    #[must_use]
    pub fn min_arguments(&self) -> usize {
        self.min_args
    }

    #[must_use]
    pub fn max_arguments(&self) -> Option<usize> {
        self.max_args
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("has_executor", &self.executor.is_some())
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}
