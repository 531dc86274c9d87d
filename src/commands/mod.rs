//! The command tree and everything needed to route into it
//!
//! Commands form a tree: the [`manager::CommandManager`] holds the roots, and
//! each [`command::Command`] may own children that are selected by the first
//! argument. Executing a command checks its permission and argument bounds,
//! routes to a matching child if there is one, and otherwise runs its own
//! [`executor::Executor`].
//!
//! Trees can be built by hand, from a handler type's declarations via
//! [`binding::BindingFactory`], or from a manifest file (see
//! [`crate::config_file`]).

pub mod binding;
pub mod command;
pub mod error;
pub mod executor;
pub mod manager;
