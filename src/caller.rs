//! Abstraction over whoever invoked a command.

/// Kind of caller invoking a command.
///
/// The console kind is restricted: sub-command tokens must be whitelisted
/// via [`SubCommandRegistry::set_console_arguments`] before a console
/// caller may use them.
///
/// [`SubCommandRegistry::set_console_arguments`]: crate::SubCommandRegistry::set_console_arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerKind {
    /// An interactive caller, e.g. a connected user.
    Interactive,
    /// A restricted, non-interactive caller, e.g. an operator console.
    Console,
}

/// The invoker of a command.
///
/// Exposes identity, a notification channel, the caller kind used by the
/// console-compatibility gate, and the permission query the permission
/// model delegates to.
pub trait Caller: Send + Sync {
    /// Display name of the caller.
    fn name(&self) -> &str;

    /// Send a message back to the caller.
    fn send(&self, message: &str);

    /// The kind of this caller.
    fn kind(&self) -> CallerKind;

    /// Whether the caller holds the given permission node.
    fn has_permission(&self, node: &str) -> bool;

    /// Whether this caller is of the restricted console kind.
    fn is_console(&self) -> bool {
        self.kind() == CallerKind::Console
    }
}
