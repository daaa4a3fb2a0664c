//! Global command table contract and an in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::command::TableCommand;

/// Compare two table entries by reference identity.
///
/// The table contract requires lookup and removal by identity, not by
/// name, so a command is only ever confused with itself.
pub fn same_command(a: &Arc<dyn TableCommand>, b: &Arc<dyn TableCommand>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// The host's single shared table mapping names to command objects.
///
/// This is the one host-owned structure the framework mutates; every
/// mutating call must happen on the host's designated execution context.
pub trait CommandTable: Send + Sync {
    /// Look up the command registered under a name.
    fn get(&self, name: &str) -> Option<Arc<dyn TableCommand>>;

    /// Insert a command under its name and aliases.
    ///
    /// Qualified `prefix:name` and `prefix:alias` keys are always
    /// written; the plain name and aliases only take vacant slots.
    /// Returns whether the plain-name slot was claimed.
    fn insert(&self, prefix: &str, command: Arc<dyn TableCommand>) -> bool;

    /// Remove every key mapping to this exact command.
    fn remove(&self, command: &Arc<dyn TableCommand>);

    /// Every key currently mapping to this exact command, in key order.
    fn names_of(&self, command: &Arc<dyn TableCommand>) -> Vec<String>;

    /// Make pending table changes visible to observers.
    ///
    /// Called by the debounce synchronizer, always on the designated
    /// execution context.
    fn publish(&self);
}

/// In-memory command table for embedding hosts and tests.
#[derive(Default)]
pub struct InMemoryTable {
    commands: Mutex<BTreeMap<String, Arc<dyn TableCommand>>>,
    publishes: AtomicU64,
}

impl InMemoryTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times [`CommandTable::publish`] has run.
    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::SeqCst)
    }

    /// Number of keys in the table (qualified keys included).
    pub fn len(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.commands.lock().unwrap().is_empty()
    }
}

impl std::fmt::Debug for InMemoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self.commands.lock().unwrap().keys().cloned().collect();
        f.debug_struct("InMemoryTable")
            .field("keys", &keys)
            .field("publishes", &self.publish_count())
            .finish()
    }
}

impl CommandTable for InMemoryTable {
    fn get(&self, name: &str) -> Option<Arc<dyn TableCommand>> {
        self.commands.lock().unwrap().get(name).cloned()
    }

    fn insert(&self, prefix: &str, command: Arc<dyn TableCommand>) -> bool {
        let mut commands = self.commands.lock().unwrap();
        let name = command.name().to_string();
        let aliases = command.aliases();

        if !prefix.is_empty() {
            commands.insert(format!("{prefix}:{name}"), Arc::clone(&command));
            for alias in &aliases {
                commands.insert(format!("{prefix}:{alias}"), Arc::clone(&command));
            }
        }

        for alias in &aliases {
            if !commands.contains_key(alias) {
                commands.insert(alias.clone(), Arc::clone(&command));
            }
        }

        let claimed = !commands.contains_key(&name);
        if claimed {
            commands.insert(name.clone(), command);
        }
        debug!(name = %name, prefix, claimed, "table insert");
        claimed
    }

    fn remove(&self, command: &Arc<dyn TableCommand>) {
        self.commands
            .lock()
            .unwrap()
            .retain(|_, registered| !same_command(registered, command));
    }

    fn names_of(&self, command: &Arc<dyn TableCommand>) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, registered)| same_command(registered, command))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn publish(&self) {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        debug!("command table published");
    }
}
