use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread::spawn;

use clap::Args;
use crossbeam_channel::{Receiver, select};
use log::{debug, error, info, warn};
use parking_lot::RwLock;

use cmdtree::{Arguments, CommandManager, CommandSource};

enum ConsoleEvent {
    Line(String),
    ManifestChanged,
    Closed,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Command label followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct ReplArgs {
    /// Reload the manifest whenever it changes
    #[arg(long)]
    watch: bool,
}

impl ReplArgs {
    pub fn watch(&self) -> bool {
        self.watch
    }
}

/// Dispatch a single command line.
pub fn exec(args: &ExecArgs, registry: &CommandManager, source: &dyn CommandSource) -> ExitCode {
    let Some((label, rest)) = args.tokens.split_first() else {
        return ExitCode::FAILURE;
    };
    match registry.dispatch(source, label, &Arguments::new(rest.to_vec())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            source.send_message(&format!("Error: {e}"));
            ExitCode::FAILURE
        }
    }
}

/// Read command lines from stdin until EOF, dispatching each one.
///
/// When `reload` is given, the registry is rebuilt with it every time the
/// manifest at `config_path` changes.
pub fn repl<F>(
    registry: &Arc<RwLock<CommandManager>>,
    source: &dyn CommandSource,
    config_path: &Path,
    reload: Option<F>,
) -> ExitCode
where
    F: Fn() -> Result<CommandManager, Box<dyn std::error::Error>>,
{
    let lines = spawn_stdin_reader();
    let (changes, _watcher) = match reload {
        Some(_) => start_config_watcher(config_path.to_path_buf()),
        None => (crossbeam_channel::never(), None),
    };

    loop {
        let event = select! {
            recv(lines) -> line => line.map_or(ConsoleEvent::Closed, ConsoleEvent::Line),
            recv(changes) -> _ => ConsoleEvent::ManifestChanged,
        };
        match event {
            ConsoleEvent::Line(line) => {
                if let Err(e) = registry.read().dispatch_line(source, &line) {
                    source.send_message(&format!("Error: {e}"));
                }
            }
            ConsoleEvent::ManifestChanged => {
                if let Some(reload) = &reload {
                    reload_registry(registry, source, config_path, reload);
                }
            }
            ConsoleEvent::Closed => {
                debug!("stdin closed");
                break;
            }
        }
    }

    ExitCode::SUCCESS
}

fn reload_registry<F>(
    registry: &RwLock<CommandManager>,
    source: &dyn CommandSource,
    config_path: &Path,
    reload: &F,
) where
    F: Fn() -> Result<CommandManager, Box<dyn std::error::Error>>,
{
    match reload() {
        Ok(manager) => {
            *registry.write() = manager;
            info!("Reloaded {}", config_path.display());
            source.send_message("Command manifest reloaded");
        }
        Err(e) => {
            error!("Reload failed: {e}");
            source.send_message(&format!("Reload failed, keeping previous commands: {e}"));
        }
    }
}

/// Spawn a thread forwarding stdin lines to a channel, closed on EOF.
fn spawn_stdin_reader() -> Receiver<String> {
    let (line_tx, line_rx) = crossbeam_channel::bounded(16);

    spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("stdin reader error: {e}");
                    break;
                }
            }
        }
    });

    line_rx
}

/// Start a manifest watcher with a manual 1s debounce.
fn start_config_watcher(
    config_path: PathBuf,
) -> (Receiver<()>, Option<Box<dyn notify::Watcher>>) {
    use notify::{EventKind, RecursiveMode, Watcher};
    use std::time::Instant;

    let (change_tx, change_rx) = crossbeam_channel::bounded(1);
    let last_reload = Arc::new(parking_lot::Mutex::new(Instant::now()));

    match notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        {
            let mut last = last_reload.lock();
            if last.elapsed().as_secs() >= 1 {
                *last = Instant::now();
                let _ = change_tx.try_send(());
            }
        }
    }) {
        Ok(mut watcher) => {
            if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
                warn!("Manifest watcher not started: {e}");
            } else {
                info!("Manifest watcher started for {}", config_path.display());
                return (change_rx, Some(Box::new(watcher) as Box<dyn notify::Watcher>));
            }
        }
        Err(e) => {
            warn!("Manifest watcher not started: {e}");
        }
    }

    (crossbeam_channel::never(), None)
}
