//! Core command capability traits shared by parents and sub-commands.

use std::fmt;

use tracing::debug;

use crate::caller::Caller;
use crate::outcome::Outcome;

/// A command action: maps a caller and arguments to an [`Outcome`].
///
/// Actions are fallible so arbitrary host faults can be contained by the
/// execution-error predicate instead of unwinding through the dispatcher.
pub type Action = Box<dyn Fn(&dyn Caller, &[String]) -> anyhow::Result<Outcome> + Send + Sync>;

/// A plain tab-completion source: maps a caller and arguments to candidates.
pub type CompletionFn =
    Box<dyn Fn(&dyn Caller, &[String]) -> anyhow::Result<Vec<String>> + Send + Sync>;

/// Predicate invoked when an action or completion source faults.
///
/// Returns whether the fault was handled; the boolean becomes the
/// caller-visible command result.
pub type ErrorPredicate = Box<dyn Fn(&dyn Caller, &anyhow::Error) -> bool + Send + Sync>;

/// Predicate invoked for an unknown or console-incompatible first token.
pub type TokenPredicate = Box<dyn Fn(&dyn Caller, &str) -> bool + Send + Sync>;

/// What the global command table stores.
///
/// Foreign commands owned by other applications implement this too, which
/// is all the displace/restore machinery needs to hold onto them.
pub trait TableCommand: Send + Sync {
    /// Primary name of the command.
    fn name(&self) -> &str;

    /// Alias names; never contains the primary name.
    fn aliases(&self) -> Vec<String> {
        Vec::new()
    }

    /// Namespace of the owning application, if known.
    fn namespace(&self) -> Option<&str> {
        None
    }
}

/// The uniform capability set shared by a parent command and its
/// sub-commands, so routing code treats both alike.
pub trait Command: TableCommand {
    /// Permission node gating this command. Blank means unrestricted.
    fn permission(&self) -> &str;

    /// Run the command. Faults bubble to the parent dispatcher, which
    /// routes them through its execution-error predicate.
    fn execute(&self, caller: &dyn Caller, args: &[String]) -> anyhow::Result<Outcome>;

    /// Produce tab-completion candidates. Never mutates state.
    fn tab_complete(&self, caller: &dyn Caller, args: &[String]) -> Vec<String> {
        let _ = (caller, args);
        Vec::new()
    }

    /// Whether the caller is authorized for this command.
    ///
    /// A blank permission string is the absence of restriction, not a
    /// denial.
    fn is_permitted(&self, caller: &dyn Caller) -> bool {
        let node = self.permission();
        node.trim().is_empty() || caller.has_permission(node)
    }

    /// Like [`Command::is_permitted`], additionally reporting a denial
    /// through the caller's notification channel.
    fn is_permitted_or_notify(&self, caller: &dyn Caller) -> bool {
        let permitted = self.is_permitted(caller);
        if !permitted {
            debug!(
                command = %self.name(),
                caller = %caller.name(),
                node = %self.permission(),
                "permission denied"
            );
            caller.send(&format!(
                "You do not have permission to use /{}.",
                self.name()
            ));
        }
        permitted
    }
}

/// A lightweight leaf sub-command backed by a single action closure.
///
/// Hosts that need nested routing or registration under a child use a full
/// [`CommandEntry`](crate::CommandEntry) instead.
pub struct SubCommand {
    name: String,
    aliases: Vec<String>,
    permission: String,
    action: Action,
}

impl SubCommand {
    /// Create a sub-command from an action closure.
    pub fn new<F>(name: impl Into<String>, permission: impl Into<String>, action: F) -> Self
    where
        F: Fn(&dyn Caller, &[String]) -> anyhow::Result<Outcome> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            permission: permission.into(),
            action: Box::new(action),
        }
    }

    /// Create a sub-command whose action always yields a constant result.
    pub fn constant(name: impl Into<String>, permission: impl Into<String>, value: bool) -> Self {
        Self::new(name, permission, move |_, _| Ok(Outcome::from(value)))
    }

    /// Add alias names, skipping any that duplicate the primary name.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for alias in aliases {
            let alias = alias.into();
            if alias != self.name && !self.aliases.contains(&alias) {
                self.aliases.push(alias);
            }
        }
        self
    }
}

impl fmt::Debug for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubCommand")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

impl TableCommand for SubCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<String> {
        self.aliases.clone()
    }
}

impl Command for SubCommand {
    fn permission(&self) -> &str {
        &self.permission
    }

    fn execute(&self, caller: &dyn Caller, args: &[String]) -> anyhow::Result<Outcome> {
        (self.action)(caller, args)
    }
}
