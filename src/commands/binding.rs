//! Builds commands from a handler type's table of declarations
//!
//! A handler type lists its commands once, as [`CommandSpec`] entries pairing
//! metadata with a method. [`BindingFactory`] turns that table into nodes of
//! the tree, either as root commands or as children of an existing command,
//! and points every produced node at one shared [`BoundExecutor`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;
use uuid::Uuid;

use crate::arguments::Arguments;
use crate::commands::command::{Command, fold_alias};
use crate::commands::error::CommandError;
use crate::commands::executor::Executor;
use crate::commands::manager::CommandManager;
use crate::source::CommandSource;

/// What a bound method returns. Any error type is accepted; errors that are
/// not already a [`CommandError`] are wrapped on the way out.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A bound method of handler type `T`.
pub type Method<T> = fn(&T, &dyn CommandSource, &Arguments) -> HandlerResult;

/// Errors raised while binding declarations to the tree
#[derive(Error, Debug)]
pub enum BindingError {
    #[error("Command declaration '{0}' has no aliases")]
    NoAliases(String),
    #[error("Alias '{alias}' of '{command}' is already used by '{existing}'")]
    AliasConflict {
        alias: String,
        command: String,
        existing: String,
    },
}

/// Metadata and method for one command a handler type provides.
pub struct CommandSpec<T> {
    aliases: Vec<String>,
    description: String,
    usage: String,
    min: usize,
    max: Option<usize>,
    method: Method<T>,
}

impl<T> CommandSpec<T> {
    /// The first alias is the primary name of the command.
    pub fn new<S: AsRef<str>>(aliases: &[S], description: impl Into<String>, method: Method<T>) -> Self {
        Self {
            aliases: aliases.iter().map(|a| a.as_ref().to_string()).collect(),
            description: description.into(),
            usage: String::new(),
            min: 0,
            max: None,
            method,
        }
    }

    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    #[must_use]
    pub fn min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    #[must_use]
    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// A type whose methods are exposed as commands.
pub trait CommandHandler: Send + Sync + Sized + 'static {
    fn commands() -> Vec<CommandSpec<Self>>;
}

/// The executor shared by every command bound from one handler instance.
pub struct BoundExecutor<T> {
    instance: Arc<T>,
    methods: HashMap<Uuid, Method<T>>,
}

impl<T> BoundExecutor<T> {
    #[must_use]
    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    /// Whether `command` was produced by the binding that created this executor.
    #[must_use]
    pub fn handles(&self, command: &Command) -> bool {
        self.methods.contains_key(&command.id())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<T: Send + Sync> Executor for BoundExecutor<T> {
    fn execute(
        &self,
        source: &dyn CommandSource,
        command: &Command,
        args: &Arguments,
    ) -> Result<(), CommandError> {
        let method = *self
            .methods
            .get(&command.id())
            .ok_or_else(|| CommandError::NoHandler {
                command: command.name().to_string(),
            })?;
        method(self.instance.as_ref(), source, args).map_err(into_command_error)
    }
}

fn into_command_error(error: Box<dyn std::error::Error + Send + Sync>) -> CommandError {
    match error.downcast::<CommandError>() {
        Ok(command_error) => *command_error,
        Err(other) => CommandError::Invocation {
            message: other.to_string(),
            source: other,
        },
    }
}

/// What a host learns about a root command it exposes on its own command line.
///
/// The host keeps the registration and, when its own command line sees one of
/// `aliases`, routes the raw arguments back with
/// `manager.dispatch(source, &registration.label, &args)`. The label resolves
/// to the bound command, whose executor is the shared [`BoundExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRegistration {
    /// The label the host should pass back to [`CommandManager::dispatch`].
    pub label: String,
    pub usage: Option<String>,
    pub description: Option<String>,
    pub permission: Option<String>,
    pub aliases: Vec<String>,
}

/// A command the host has already declared on its own command line.
///
/// [`BindingFactory::with_host`] calls [`ExternalCommand::apply`] once per
/// bound root command whose primary name the host knows.
pub trait ExternalCommand {
    fn apply(&mut self, registration: ExternalRegistration);
}

/// The host's registry of externally declared commands.
pub trait CommandHost {
    fn external_command(&mut self, name: &str) -> Option<&mut dyn ExternalCommand>;
}

enum BindTarget<'a> {
    Root(&'a mut CommandManager),
    Child(&'a mut Command),
}

impl BindTarget<'_> {
    fn resolve(&mut self, name: &str) -> &mut Command {
        match self {
            BindTarget::Root(manager) => manager.command_or_create(name),
            BindTarget::Child(parent) => parent.child_or_create(name),
        }
    }

    fn siblings(&self) -> &[Command] {
        match self {
            BindTarget::Root(manager) => manager.commands(),
            BindTarget::Child(parent) => parent.children(),
        }
    }

    fn find_mut(&mut self, id: Uuid) -> Option<&mut Command> {
        match self {
            BindTarget::Root(manager) => manager
                .commands_mut()
                .iter_mut()
                .find_map(|command| command.find_mut(id)),
            BindTarget::Child(parent) => parent.find_mut(id),
        }
    }
}

/// Binds handler declarations under a parent command or at the root.
pub struct BindingFactory<'a> {
    target: BindTarget<'a>,
    host: Option<&'a mut dyn CommandHost>,
}

impl<'a> BindingFactory<'a> {
    /// Declarations become root commands of `manager`.
    pub fn root(manager: &'a mut CommandManager) -> Self {
        Self {
            target: BindTarget::Root(manager),
            host: None,
        }
    }

    /// Declarations become children of `parent`.
    pub fn child(parent: &'a mut Command) -> Self {
        Self {
            target: BindTarget::Child(parent),
            host: None,
        }
    }

    /// Also push root command metadata into matching external registrations.
    #[must_use]
    pub fn with_host(mut self, host: &'a mut dyn CommandHost) -> Self {
        self.host = Some(host);
        self
    }

    /// Binds every declaration of `T` to commands backed by `instance`.
    ///
    /// # Errors
    ///
    /// See [`BindingFactory::create_from`].
    pub fn create<T: CommandHandler>(self, instance: T) -> Result<Arc<BoundExecutor<T>>, BindingError> {
        self.create_from(Arc::new(instance), T::commands())
    }

    /// Binds `specs` to commands backed by `instance`.
    ///
    /// When several declarations resolve to the same command, the metadata of
    /// the last one wins, and so does its method.
    ///
    /// # Errors
    ///
    /// Returns `BindingError::NoAliases` for a declaration without aliases,
    /// or `BindingError::AliasConflict` if one of its aliases already belongs
    /// to a different sibling or to another declaration in `specs`. The tree
    /// is left untouched when either is returned.
    pub fn create_from<T: Send + Sync + 'static>(
        mut self,
        instance: Arc<T>,
        specs: Vec<CommandSpec<T>>,
    ) -> Result<Arc<BoundExecutor<T>>, BindingError> {
        let mut methods: HashMap<Uuid, Method<T>> = HashMap::new();
        let mut bound: Vec<Uuid> = Vec::new();

        validate_batch(self.target.siblings(), &specs)?;

        for spec in specs {
            let Some(primary) = spec.aliases.first().cloned() else {
                return Err(BindingError::NoAliases(spec.description));
            };

            let command = self.target.resolve(&primary);
            command
                .add_alias(&spec.aliases)
                .set_help(spec.description)
                .set_usage(spec.usage)
                .set_argument_bounds(spec.min, spec.max);
            debug!("Bound '{}' with aliases {:?}", command.name(), command.aliases());

            let id = command.id();
            if methods.insert(id, spec.method).is_none() {
                bound.push(id);
            }
        }

        let executor = Arc::new(BoundExecutor { instance, methods });
        for id in &bound {
            if let Some(command) = self.target.find_mut(*id) {
                command.set_executor(Arc::clone(&executor) as Arc<dyn Executor>);
            }
        }

        if let (BindTarget::Root(manager), Some(host)) = (&self.target, self.host) {
            for id in &bound {
                if let Some(command) = manager.commands().iter().find(|c| c.id() == *id)
                    && let Some(external) = host.external_command(command.name())
                {
                    info!("Bridging '{}' to host command line", command.name());
                    external.apply(ExternalRegistration {
                        label: command.name().to_string(),
                        usage: command.usage().map(str::to_string),
                        description: command.help().map(str::to_string),
                        permission: command.permission().map(str::to_string),
                        aliases: command.aliases().to_vec(),
                    });
                }
            }
        }

        info!("Bound {} command(s)", bound.len());
        Ok(executor)
    }
}

/// Checks a whole batch against the siblings before any node is created.
///
/// Each declaration belongs to the first node (existing or declared earlier in
/// the batch) matching its primary alias; its other aliases must not be
/// claimed by any other node.
fn validate_batch<T>(siblings: &[Command], specs: &[CommandSpec<T>]) -> Result<(), BindingError> {
    let mut claims: Vec<(String, HashSet<String>)> = siblings
        .iter()
        .map(|c| (c.name().to_string(), c.aliases().iter().map(|a| fold_alias(a)).collect()))
        .collect();

    for spec in specs {
        let Some(primary) = spec.aliases.first() else {
            return Err(BindingError::NoAliases(spec.description.clone()));
        };
        let primary_key = fold_alias(primary);
        let owner = claims.iter().position(|(_, aliases)| aliases.contains(&primary_key));

        for alias in &spec.aliases {
            let key = fold_alias(alias);
            if let Some((_, (existing, _))) = claims
                .iter()
                .enumerate()
                .find(|(index, (_, aliases))| Some(*index) != owner && aliases.contains(&key))
            {
                return Err(BindingError::AliasConflict {
                    alias: alias.clone(),
                    command: primary.clone(),
                    existing: existing.clone(),
                });
            }
        }

        let keys = spec.aliases.iter().map(|a| fold_alias(a));
        match owner {
            Some(index) => claims[index].1.extend(keys),
            None => claims.push((primary.clone(), keys.collect())),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::any::Any;

    struct Player {
        permissions: Vec<&'static str>,
        inbox: Mutex<Vec<String>>,
    }

    impl Player {
        fn new() -> Self {
            Self {
                permissions: Vec::new(),
                inbox: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommandSource for Player {
        fn has_permission(&self, permission: &str) -> bool {
            self.permissions.iter().any(|p| *p == permission)
        }

        fn send_message(&self, message: &str) {
            self.inbox.lock().push(message.to_string());
        }

        fn sender(&self) -> &dyn Any {
            self
        }

        fn name(&self) -> &str {
            "player"
        }
    }

    #[derive(Default)]
    struct Teleports {
        log: Mutex<Vec<String>>,
    }

    impl Teleports {
        fn teleport(&self, source: &dyn CommandSource, args: &Arguments) -> HandlerResult {
            let target = args.get_string(0)?;
            self.log.lock().push(format!("tp {target}"));
            source.send_message(&format!("Teleported to {target}"));
            Ok(())
        }

        fn back(&self, _source: &dyn CommandSource, _args: &Arguments) -> HandlerResult {
            Err(CommandError::failed("No previous location").into())
        }

        fn broken(&self, _source: &dyn CommandSource, _args: &Arguments) -> HandlerResult {
            Err(Box::new(std::io::Error::other("location store unavailable")))
        }
    }

    impl CommandHandler for Teleports {
        fn commands() -> Vec<CommandSpec<Self>> {
            vec![
                CommandSpec::new(&["tp", "teleport"], "Teleport somewhere", Self::teleport)
                    .usage("/tp <target>")
                    .min(1)
                    .max(1),
                CommandSpec::new(&["back"], "Return to the previous location", Self::back),
                CommandSpec::new(&["broken"], "Always fails", Self::broken),
            ]
        }
    }

    #[test]
    fn test_single_node_reachable_by_every_alias() {
        let mut manager = CommandManager::new();
        manager.factory().create(Teleports::default()).unwrap();

        let tp = manager.command("tp").unwrap();
        let teleport = manager.command("TELEPORT").unwrap();
        assert_eq!(tp.id(), teleport.id());
        assert_eq!(tp.usage(), Some("/tp <target>"));
        assert_eq!(tp.help(), Some("Teleport somewhere"));
        assert_eq!(tp.min_arguments(), 1);
        assert_eq!(tp.max_arguments(), Some(1));
        assert_eq!(manager.commands().len(), 3);
    }

    #[test]
    fn test_shared_executor_dispatches_to_method() {
        let mut manager = CommandManager::new();
        let executor = manager.factory().create(Teleports::default()).unwrap();
        assert_eq!(executor.len(), 3);
        assert!(executor.handles(manager.command("back").unwrap()));

        let player = Player::new();
        manager
            .dispatch(&player, "teleport", &Arguments::from(["spawn"]))
            .unwrap();
        assert_eq!(*executor.instance().log.lock(), vec!["tp spawn".to_string()]);
        assert_eq!(*player.inbox.lock(), vec!["Teleported to spawn".to_string()]);
    }

    #[test]
    fn test_command_errors_pass_through() {
        let mut manager = CommandManager::new();
        manager.factory().create(Teleports::default()).unwrap();
        match manager.dispatch(&Player::new(), "back", &Arguments::default()) {
            Err(CommandError::Failed(message)) => assert_eq!(message, "No previous location"),
            other => panic!("Expected Failed, got: {other:?}"),
        }
    }

    #[test]
    fn test_foreign_errors_are_wrapped() {
        use std::error::Error as _;

        let mut manager = CommandManager::new();
        manager.factory().create(Teleports::default()).unwrap();
        let err = manager
            .dispatch(&Player::new(), "broken", &Arguments::default())
            .unwrap_err();
        assert!(matches!(err, CommandError::Invocation { .. }));
        assert_eq!(err.to_string(), "location store unavailable");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_bind_under_parent() {
        let mut manager = CommandManager::new();
        let warp = manager.command_or_create("warp");
        BindingFactory::child(warp)
            .create(Teleports::default())
            .unwrap();

        assert_eq!(manager.commands().len(), 1);
        let player = Player::new();
        manager
            .dispatch(&player, "warp", &Arguments::from(["tp", "nether"]))
            .unwrap();
        assert_eq!(*player.inbox.lock(), vec!["Teleported to nether".to_string()]);
    }

    #[test]
    fn test_unmapped_node_is_not_a_silent_noop() {
        let mut manager = CommandManager::new();
        let executor = manager.factory().create(Teleports::default()).unwrap();
        let mut stray = Command::new("stray");
        stray.set_executor(executor);
        assert!(matches!(
            stray.execute(&Player::new(), &Arguments::default()),
            Err(CommandError::NoHandler { .. })
        ));
    }

    #[test]
    fn test_last_declaration_wins() {
        fn first(_: &(), source: &dyn CommandSource, _: &Arguments) -> HandlerResult {
            source.send_message("first");
            Ok(())
        }
        fn second(_: &(), source: &dyn CommandSource, _: &Arguments) -> HandlerResult {
            source.send_message("second");
            Ok(())
        }

        let mut manager = CommandManager::new();
        manager
            .factory()
            .create_from(
                Arc::new(()),
                vec![
                    CommandSpec::new(&["kit"], "old", first).usage("/kit"),
                    CommandSpec::new(&["kit", "kits"], "new", second),
                ],
            )
            .unwrap();
        let kit = manager.command("kits").unwrap();
        assert_eq!(kit.help(), Some("new"));
        assert_eq!(kit.usage(), Some(""));

        let player = Player::new();
        kit.execute(&player, &Arguments::default()).unwrap();
        assert_eq!(*player.inbox.lock(), vec!["second".to_string()]);
    }

    #[test]
    fn test_rejects_alias_conflicts() {
        fn noop(_: &(), _: &dyn CommandSource, _: &Arguments) -> HandlerResult {
            Ok(())
        }

        let mut manager = CommandManager::new();
        manager.command_or_create("home");
        let result = manager.factory().create_from(
            Arc::new(()),
            vec![CommandSpec::new(&["house", "home"], "clash", noop)],
        );
        match result {
            Err(BindingError::AliasConflict {
                alias, existing, ..
            }) => {
                assert_eq!(alias, "home");
                assert_eq!(existing, "home");
            }
            other => panic!("Expected AliasConflict, got: {:?}", other.err()),
        }

        let empty: &[&str] = &[];
        let result = manager.factory().create_from(
            Arc::new(()),
            vec![CommandSpec::new(empty, "nameless", noop)],
        );
        assert!(matches!(result, Err(BindingError::NoAliases(_))));
    }

    #[test]
    fn test_failed_batch_leaves_tree_untouched() {
        fn noop(_: &(), _: &dyn CommandSource, _: &Arguments) -> HandlerResult {
            Ok(())
        }

        let mut manager = CommandManager::new();
        manager.command_or_create("home");
        let result = manager.factory().create_from(
            Arc::new(()),
            vec![
                CommandSpec::new(&["warp"], "Warp somewhere", noop),
                CommandSpec::new(&["house", "home"], "clash", noop),
            ],
        );
        assert!(matches!(result, Err(BindingError::AliasConflict { .. })));
        assert!(manager.command("warp").is_none());
        assert_eq!(manager.commands().len(), 1);

        let empty: &[&str] = &[];
        let result = manager.factory().create_from(
            Arc::new(()),
            vec![
                CommandSpec::new(&["warp"], "Warp somewhere", noop),
                CommandSpec::new(empty, "nameless", noop),
            ],
        );
        assert!(matches!(result, Err(BindingError::NoAliases(_))));
        assert!(manager.command("warp").is_none());
    }

    #[test]
    fn test_rejects_conflicts_within_batch() {
        fn noop(_: &(), _: &dyn CommandSource, _: &Arguments) -> HandlerResult {
            Ok(())
        }

        let mut manager = CommandManager::new();
        let result = manager.factory().create_from(
            Arc::new(()),
            vec![
                CommandSpec::new(&["spawn", "s"], "Go to spawn", noop),
                CommandSpec::new(&["sethome", "S"], "Save a home", noop),
            ],
        );
        match result {
            Err(BindingError::AliasConflict {
                alias,
                command,
                existing,
            }) => {
                assert_eq!(alias, "S");
                assert_eq!(command, "sethome");
                assert_eq!(existing, "spawn");
            }
            other => panic!("Expected AliasConflict, got: {:?}", other.err()),
        }
        assert!(manager.commands().is_empty());

        // a later declaration reached through an earlier one's alias is the same command
        manager
            .factory()
            .create_from(
                Arc::new(()),
                vec![
                    CommandSpec::new(&["spawn", "s"], "Go to spawn", noop),
                    CommandSpec::new(&["S", "hub"], "Go to the hub", noop),
                ],
            )
            .unwrap();
        assert_eq!(manager.commands().len(), 1);
        assert_eq!(manager.command("hub").unwrap().name(), "spawn");
    }

    struct Host {
        declared: Vec<Declared>,
    }

    struct Declared {
        name: &'static str,
        registration: Option<ExternalRegistration>,
    }

    impl ExternalCommand for Declared {
        fn apply(&mut self, registration: ExternalRegistration) {
            self.registration = Some(registration);
        }
    }

    impl CommandHost for Host {
        fn external_command(&mut self, name: &str) -> Option<&mut dyn ExternalCommand> {
            self.declared
                .iter_mut()
                .find(|d| d.name == name)
                .map(|d| d as &mut dyn ExternalCommand)
        }
    }

    #[test]
    fn test_bridges_root_commands_to_host() {
        let mut host = Host {
            declared: vec![Declared {
                name: "tp",
                registration: None,
            }],
        };
        let mut manager = CommandManager::new();
        manager
            .factory()
            .with_host(&mut host)
            .create(Teleports::default())
            .unwrap();

        assert_eq!(
            host.declared[0].registration,
            Some(ExternalRegistration {
                label: "tp".to_string(),
                usage: Some("/tp <target>".to_string()),
                description: Some("Teleport somewhere".to_string()),
                permission: None,
                aliases: vec!["tp".to_string(), "teleport".to_string()],
            })
        );

        let registration = host.declared[0].registration.take().unwrap();
        let player = Player::new();
        manager
            .dispatch(&player, &registration.label, &Arguments::from(["spawn"]))
            .unwrap();
        assert_eq!(*player.inbox.lock(), vec!["Teleported to spawn".to_string()]);
    }
}
