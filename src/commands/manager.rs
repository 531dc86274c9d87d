use log::debug;

use crate::arguments::Arguments;
use crate::commands::binding::BindingFactory;
use crate::commands::command::Command;
use crate::commands::error::CommandError;
use crate::source::CommandSource;

/// The set of root commands a host dispatches into.
#[derive(Debug, Default)]
pub struct CommandManager {
    commands: Vec<Command>,
}

impl CommandManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root commands in registration order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Finds a root command by any of its aliases without modifying the registry.
    #[must_use]
    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|command| command.matches(name))
    }

    #[must_use]
    pub fn command_mut(&mut self, name: &str) -> Option<&mut Command> {
        self.commands.iter_mut().find(|command| command.matches(name))
    }

    /// Finds a root command by alias, creating one named `name` if none matches.
    pub fn command_or_create(&mut self, name: &str) -> &mut Command {
        let index = match self.commands.iter().position(|command| command.matches(name)) {
            Some(index) => index,
            None => {
                self.commands.push(Command::new(name));
                self.commands.len() - 1
            }
        };
        &mut self.commands[index]
    }

    /// Returns the root command with the given alias, creating it when `create_if_absent` is set.
    pub fn get_command(&mut self, name: &str, create_if_absent: bool) -> Option<&mut Command> {
        if create_if_absent {
            Some(self.command_or_create(name))
        } else {
            self.command_mut(name)
        }
    }

    pub(crate) fn commands_mut(&mut self) -> &mut [Command] {
        &mut self.commands
    }

    pub(crate) fn push_command(&mut self, command: Command) -> &mut Command {
        self.commands.push(command);
        let index = self.commands.len() - 1;
        &mut self.commands[index]
    }

    /// Binds handler declarations as root commands.
    pub fn factory(&mut self) -> BindingFactory<'_> {
        BindingFactory::root(self)
    }

    /// Runs the root command registered under `label`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::UnknownCommand` if no root command has that
    /// alias, otherwise whatever [`Command::execute`] returns.
    pub fn dispatch(
        &self,
        source: &dyn CommandSource,
        label: &str,
        args: &Arguments,
    ) -> Result<(), CommandError> {
        let command = self
            .command(label)
            .ok_or_else(|| CommandError::UnknownCommand(label.to_string()))?;
        debug!("{} ran '{label}' -> '{}'", source.name(), command.name());
        command.execute(source, args)
    }

    /// Splits a raw line on whitespace and dispatches it. A leading `/` on the
    /// label is ignored. Blank lines do nothing.
    ///
    /// # Errors
    ///
    /// See [`CommandManager::dispatch`].
    pub fn dispatch_line(&self, source: &dyn CommandSource, line: &str) -> Result<(), CommandError> {
        let mut tokens = line.split_whitespace();
        let Some(label) = tokens.next() else {
            return Ok(());
        };
        let label = label.strip_prefix('/').unwrap_or(label);
        let args = Arguments::new(tokens.map(str::to_string).collect());
        self.dispatch(source, label, &args)
    }

    /// Renders every command, depth first, one per line, children indented.
    #[must_use]
    pub fn help_listing(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            describe(command, 0, &mut out);
        }
        out
    }
}

fn describe(command: &Command, depth: usize, out: &mut String) {
    let label = match command.usage() {
        Some(usage) if !usage.is_empty() => usage.to_string(),
        _ => command.aliases().join("|"),
    };
    out.push_str(&"  ".repeat(depth));
    out.push_str(&label);
    if let Some(help) = command.help().filter(|help| !help.is_empty()) {
        out.push_str(" - ");
        out.push_str(help);
    }
    out.push('\n');
    for child in command.children() {
        describe(child, depth + 1, out);
    }
}
