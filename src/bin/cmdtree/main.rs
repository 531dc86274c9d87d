mod builtins;
mod check;
mod console;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use parking_lot::RwLock;

use cmdtree::load_config;
use cmdtree::logger::LogBuffer;
use cmdtree::source::ConsoleSource;

use crate::builtins::{Builtins, build_registry};

#[derive(Parser, Debug)]
#[command(name = "cmdtree", about = "Console host for a cmdtree command manifest")]
struct Cli {
    /// Path to the command manifest (auto-detected if not specified)
    #[arg(short, long)]
    config: Option<String>,

    /// Log file path (log entries are also kept for the `logs` command)
    #[arg(long)]
    log_file: Option<String>,

    /// Permission granted to the console, repeatable; `*` grants everything
    #[arg(long = "grant", value_name = "PERMISSION")]
    grants: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the manifest and print the command listing
    Check(check::CheckArgs),
    /// Run a single command line
    Exec(console::ExecArgs),
    /// Read command lines from stdin (the default)
    Repl(console::ReplArgs),
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_buffer = LogBuffer::new();
    let log_file = cli
        .log_file
        .as_ref()
        .map(std::fs::File::create)
        .transpose()?;
    cmdtree::logger::init(log_buffer.clone(), log_file);

    let (config, config_path) = load_config(cli.config.as_deref())?;
    let builtins = Arc::new(Builtins::new(log_buffer.clone()));
    let registry = build_registry(&config, &builtins)?;
    let source = ConsoleSource::stdout(cli.grants);

    match cli.command {
        Some(Commands::Check(ref args)) => Ok(check::run(args, &registry, &log_buffer)),
        Some(Commands::Exec(ref args)) => Ok(console::exec(args, &registry, &source)),
        Some(Commands::Repl(ref args)) => Ok(start_repl(args, registry, &source, &config_path, &builtins)),
        None => Ok(start_repl(
            &console::ReplArgs::default(),
            registry,
            &source,
            &config_path,
            &builtins,
        )),
    }
}

fn start_repl(
    args: &console::ReplArgs,
    registry: cmdtree::CommandManager,
    source: &ConsoleSource,
    config_path: &std::path::Path,
    builtins: &Arc<Builtins>,
) -> ExitCode {
    let registry = Arc::new(RwLock::new(registry));
    let path = config_path.to_string_lossy().into_owned();
    let reload = args.watch().then(|| {
        move || {
            let (config, _) = load_config(Some(&path))?;
            build_registry(&config, builtins)
        }
    });
    console::repl(&registry, source, config_path, reload)
}
