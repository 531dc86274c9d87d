//! Capabilities the dispatcher needs from whoever runs a command

use std::any::Any;
use std::collections::HashSet;
use std::io::Write;

use log::warn;
use parking_lot::Mutex;

/// Who is running a command.
///
/// The dispatcher only ever asks a source for a permission decision and hands
/// it messages; everything else about the sender stays with the host.
pub trait CommandSource: Send + Sync {
    fn has_permission(&self, permission: &str) -> bool;

    fn send_message(&self, message: &str);

    /// The host's own sender object, for handlers that need more than this trait offers.
    fn sender(&self) -> &dyn Any;

    /// A display name used in log lines and by handlers that greet the sender.
    fn name(&self) -> &str {
        "source"
    }

    fn send_messages(&self, messages: &[&str]) {
        for message in messages {
            self.send_message(message);
        }
    }
}

/// Lookups a host server provides to argument accessors.
pub trait Server {
    type Player;
    type World;

    /// Finds an online player. A non-exact lookup may match on a name prefix.
    fn player(&self, name: &str, exact: bool) -> Option<Self::Player>;

    fn world(&self, name: &str) -> Option<Self::World>;
}

/// A source backed by a text stream, holding a fixed set of granted permissions.
///
/// The permission `*` grants everything.
pub struct ConsoleSource {
    name: String,
    permissions: HashSet<String>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSource {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        permissions: impl IntoIterator<Item = String>,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().collect(),
            out: Mutex::new(out),
        }
    }

    /// A console source writing to stdout.
    #[must_use]
    pub fn stdout(permissions: impl IntoIterator<Item = String>) -> Self {
        Self::new("console", permissions, Box::new(std::io::stdout()))
    }
}

impl CommandSource for ConsoleSource {
    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains("*") || self.permissions.contains(permission)
    }

    fn send_message(&self, message: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{message}").and_then(|()| out.flush()) {
            warn!("Unable to write message to {}: {e}", self.name);
        }
    }

    fn sender(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }
}
