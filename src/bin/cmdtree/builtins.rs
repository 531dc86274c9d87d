use std::sync::Arc;

use parking_lot::Mutex;

use cmdtree::config_file::Config;
use cmdtree::logger::LogBuffer;
use cmdtree::{
    Arguments, Command, CommandError, CommandHandler, CommandManager, CommandSource, CommandSpec,
    ExecutorTable, HandlerResult,
};

const DEFAULT_LOG_LINES: usize = 20;

/// Commands the console always provides, on top of the manifest.
pub struct Builtins {
    listing: Mutex<String>,
    logs: LogBuffer,
}

impl Builtins {
    pub fn new(logs: LogBuffer) -> Self {
        Self {
            listing: Mutex::new(String::new()),
            logs,
        }
    }

    fn help(&self, source: &dyn CommandSource, _args: &Arguments) -> HandlerResult {
        for line in self.listing.lock().lines() {
            source.send_message(line);
        }
        Ok(())
    }

    fn logs(&self, source: &dyn CommandSource, args: &Arguments) -> HandlerResult {
        let count = if args.is_empty() {
            DEFAULT_LOG_LINES
        } else {
            let count = args.get_integer(0)?;
            usize::try_from(count)
                .map_err(|_| CommandError::failed(format!("Count must not be negative: {count}")))?
        };
        for entry in self.logs.tail(count) {
            source.send_message(&self.logs.format(&entry));
        }
        Ok(())
    }
}

impl CommandHandler for Builtins {
    fn commands() -> Vec<CommandSpec<Self>> {
        vec![
            CommandSpec::new(&["help", "?"], "Show available commands", Self::help)
                .usage("/help")
                .max(0),
            CommandSpec::new(&["logs"], "Show recent log entries", Self::logs)
                .usage("/logs [count]")
                .max(1),
        ]
    }
}

type Handler = fn(&dyn CommandSource, &Command, &Arguments) -> Result<(), CommandError>;

fn echo(source: &dyn CommandSource, _command: &Command, args: &Arguments) -> Result<(), CommandError> {
    source.send_message(&args.get_joined_string(0));
    Ok(())
}

fn sum(source: &dyn CommandSource, _command: &Command, args: &Arguments) -> Result<(), CommandError> {
    let mut total = 0.0;
    for index in 0..args.len() {
        total += args.get_double(index)?;
    }
    source.send_message(&total.to_string());
    Ok(())
}

fn whoami(source: &dyn CommandSource, _command: &Command, _args: &Arguments) -> Result<(), CommandError> {
    source.send_message(source.name());
    Ok(())
}

/// Handlers a manifest can refer to by name.
pub fn handler_table() -> ExecutorTable {
    let handlers: [(&str, Handler); 3] = [("echo", echo), ("sum", sum), ("whoami", whoami)];
    let mut table = ExecutorTable::new();
    for (name, handler) in handlers {
        table.insert(name, Arc::new(handler));
    }
    table
}

/// Builds the registry for `config` with the builtins bound as root commands.
///
/// # Errors
///
/// Returns an error if the manifest names an unknown handler or claims an
/// alias a builtin needs.
pub fn build_registry(
    config: &Config,
    builtins: &Arc<Builtins>,
) -> Result<CommandManager, Box<dyn std::error::Error>> {
    let mut manager = CommandManager::from_config(config, &handler_table())?;
    manager
        .factory()
        .create_from(Arc::clone(builtins), Builtins::commands())?;
    *builtins.listing.lock() = manager.help_listing();
    Ok(manager)
}
