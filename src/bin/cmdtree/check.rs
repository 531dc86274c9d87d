use std::process::ExitCode;

use clap::Args;
use log::Level;

use cmdtree::CommandManager;
use cmdtree::logger::LogBuffer;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Treat manifest warnings as errors
    #[arg(long)]
    strict: bool,
}

/// Print the command listing and any warnings raised while loading the manifest.
pub fn run(args: &CheckArgs, registry: &CommandManager, logs: &LogBuffer) -> ExitCode {
    print!("{}", registry.help_listing());

    let warnings: Vec<_> = logs
        .entries()
        .into_iter()
        .filter(|entry| entry.level <= Level::Warn)
        .collect();
    for entry in &warnings {
        eprintln!("{}: {}", entry.level, entry.message);
    }

    eprintln!(
        "{} root command(s), {} warning(s)",
        registry.commands().len(),
        warnings.len()
    );
    if args.strict && !warnings.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
