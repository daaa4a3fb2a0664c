//! Name/alias-indexed registry of sub-commands under one parent.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::command::Command;

/// Errors from mutating registry calls.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An empty name was passed to a call that requires one.
    #[error("sub-command name cannot be empty")]
    EmptyName,
}

/// Registry of sub-commands owned exclusively by one parent command, plus
/// the whitelist of first-level argument tokens a console caller may use.
///
/// The whitelist is a caller-kind gate, orthogonal to the permission
/// model: even a fully permitted console caller is restricted to the
/// whitelisted tokens.
#[derive(Default)]
pub struct SubCommandRegistry {
    // Insertion-ordered; primary names are unique.
    commands: Vec<Arc<dyn Command>>,
    console_arguments: Vec<String>,
}

impl SubCommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with an initial console-argument whitelist.
    pub fn with_console_arguments<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        registry.set_console_arguments(arguments);
        registry
    }

    /// Add a sub-command.
    ///
    /// A sub-command with the same primary name is silently replaced
    /// (last write wins), keeping its slot in the insertion order.
    /// Alias collisions are not validated.
    pub fn add(&mut self, command: Arc<dyn Command>) {
        if let Some(existing) = self
            .commands
            .iter_mut()
            .find(|c| c.name() == command.name())
        {
            *existing = command;
        } else {
            self.commands.push(command);
        }
    }

    /// Remove a sub-command by exact primary-name match.
    ///
    /// Aliases are not consulted. Fails with [`RegistryError::EmptyName`]
    /// when `name` is empty.
    pub fn remove(&mut self, name: &str) -> Result<Option<Arc<dyn Command>>, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let position = self.commands.iter().position(|c| c.name() == name);
        Ok(position.map(|index| self.commands.remove(index)))
    }

    /// Look up a sub-command by primary name or alias.
    ///
    /// Scans registered sub-commands in insertion order, treating the
    /// primary name and aliases as one match set, and returns the first
    /// match.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        if name.is_empty() {
            return None;
        }
        self.commands
            .iter()
            .find(|c| c.name() == name || c.aliases().iter().any(|a| a == name))
            .cloned()
    }

    /// All registered sub-commands in insertion order.
    pub fn commands(&self) -> &[Arc<dyn Command>] {
        &self.commands
    }

    /// Whether no sub-commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of registered sub-commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Replace the console-argument whitelist.
    pub fn set_console_arguments<I, S>(&mut self, arguments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.console_arguments = arguments.into_iter().map(Into::into).collect();
    }

    /// The console-argument whitelist.
    pub fn console_arguments(&self) -> &[String] {
        &self.console_arguments
    }

    /// Whether a console caller may use the given first-level token.
    ///
    /// True iff the token is non-blank and whitelisted.
    pub fn is_console_compatible(&self, token: &str) -> bool {
        !token.trim().is_empty() && self.console_arguments.iter().any(|a| a == token)
    }
}

impl fmt::Debug for SubCommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.commands.iter().map(|c| c.name()).collect();
        f.debug_struct("SubCommandRegistry")
            .field("commands", &names)
            .field("console_arguments", &self.console_arguments)
            .finish()
    }
}
