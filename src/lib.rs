//! Runtime command-dispatch framework.
//!
//! This crate lets a host application register, mutate, and unregister
//! named commands while the process is running: aliases, hierarchical
//! sub-commands, permission gates with a wildcard form, composable
//! tab-completion, and safe displacement (and later restoration) of a
//! pre-existing command occupying the same name.
//!
//! # Building and registering a command
//!
//! ```rust,ignore
//! use dyncmd::prelude::*;
//! use std::sync::Arc;
//!
//! let host = Host::new(table, permissions, scheduler);
//!
//! let entry = CommandBuilder::new("myapp", "greet")
//!     .alias("hello")
//!     .subcommand(Arc::new(SubCommand::constant(
//!         "reload",
//!         "myapp.greet.reload",
//!         true,
//!     )))
//!     .console_arguments(["reload"])
//!     .action(|caller, _args| {
//!         caller.send("Hi!");
//!         Ok(Outcome::Success)
//!     })
//!     .build(&host)?;
//!
//! entry.register(true);
//! // ... later, restoring whatever command "greet" displaced:
//! entry.unregister(true);
//! ```
//!
//! # Synchronization
//!
//! Registry mutations are made visible to observers through
//! [`CommandTable::publish`]. Each entry owns a [`Synchronizer`] that
//! debounces bursts of mutations into a single publish, scheduled on the
//! host's designated execution context after a short quiet period.
//!
//! # Error containment
//!
//! Faults arising from the caller's input (unknown sub-command, console
//! restriction, permission denial) are converted to boolean outcomes via
//! configurable predicates. Faults from caller-supplied actions or
//! completion sources are contained the same way and never unwind
//! through the dispatcher. Programmer misuse (blank names, missing
//! actions) fails fast at construction.

mod builder;
mod caller;
mod command;
mod entry;
mod outcome;
mod permission;
mod scheduler;
mod subcommands;
mod suggest;
mod sync;
mod table;

pub use builder::{BuildError, CommandBuilder, Host};
pub use caller::{Caller, CallerKind};
pub use command::{
    Action, Command, CompletionFn, ErrorPredicate, SubCommand, TableCommand, TokenPredicate,
};
pub use entry::CommandEntry;
pub use outcome::Outcome;
pub use permission::{MemoryPermissions, PermissionRegistry, WILDCARD_SUFFIX};
pub use scheduler::{Scheduler, TICK, Task, TaskHandle, TokioScheduler};
pub use subcommands::{RegistryError, SubCommandRegistry};
pub use suggest::{ArgPosition, SuggestionBuilder};
pub use sync::{DEFAULT_SYNC_DELAY_TICKS, Synchronizer};
pub use table::{CommandTable, InMemoryTable, same_command};

/// Re-export common types for convenience.
pub mod prelude {
    pub use crate::{
        Caller, CallerKind, Command, CommandBuilder, CommandEntry, CommandTable, Host, Outcome,
        PermissionRegistry, Scheduler, SubCommand, SuggestionBuilder, Synchronizer, TableCommand,
    };
}
