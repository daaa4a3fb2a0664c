//! The command registry entry: dispatch, completion, and the
//! register/unregister lifecycle with displace-and-restore support.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::caller::Caller;
use crate::command::{Action, Command, CompletionFn, ErrorPredicate, TableCommand, TokenPredicate};
use crate::outcome::Outcome;
use crate::permission::{PermissionRegistry, WILDCARD_SUFFIX};
use crate::subcommands::{RegistryError, SubCommandRegistry};
use crate::suggest::SuggestionBuilder;
use crate::sync::Synchronizer;
use crate::table::{CommandTable, same_command};

/// A previously registered command this entry pushed out of the global
/// table, held for restoration at unregistration.
pub(crate) struct DisplacedEntry {
    command: Arc<dyn TableCommand>,
    fallback_prefix: String,
}

impl DisplacedEntry {
    /// Capture a displaced command together with the namespace prefix to
    /// restore it under.
    ///
    /// When the command does not report an owner, the prefix is derived
    /// by scanning the table for qualified keys pointing at it; with
    /// several qualified aliases the last match in key order wins.
    fn capture(table: &dyn CommandTable, command: Arc<dyn TableCommand>) -> Self {
        let fallback_prefix = match command.namespace() {
            Some(namespace) => namespace.to_string(),
            None => {
                let mut prefix = String::new();
                for name in table.names_of(&command) {
                    if let Some((candidate, _)) = name.split_once(':') {
                        prefix = candidate.to_string();
                    }
                }
                prefix
            }
        };
        Self {
            command,
            fallback_prefix,
        }
    }

    /// Reinsert the displaced command under its captured prefix.
    fn restore(&self, table: &dyn CommandTable) -> bool {
        debug!(
            command = %self.command.name(),
            prefix = %self.fallback_prefix,
            "restoring displaced command"
        );
        table.insert(&self.fallback_prefix, Arc::clone(&self.command))
    }
}

/// A registrable command: identity, aliases, permission, sub-commands,
/// completion sources, error predicates, and the registration state
/// machine.
///
/// Entries are constructed through
/// [`CommandBuilder`](crate::CommandBuilder) and used behind an [`Arc`].
/// Equality and hashing are defined solely by the immutable identity
/// token, never by the mutable name or aliases.
pub struct CommandEntry {
    pub(crate) id: Uuid,
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) permission: String,
    pub(crate) aliases: Mutex<Vec<String>>,
    pub(crate) enabled: AtomicBool,
    pub(crate) overriding: AtomicBool,
    pub(crate) registered: AtomicBool,
    pub(crate) action: Action,
    pub(crate) completions: Option<CompletionFn>,
    pub(crate) suggestions: Option<SuggestionBuilder>,
    pub(crate) subcommands: Mutex<SubCommandRegistry>,
    pub(crate) synchronizer: Synchronizer,
    pub(crate) displaced: Mutex<Option<DisplacedEntry>>,
    pub(crate) table: Arc<dyn CommandTable>,
    pub(crate) permissions: Arc<dyn PermissionRegistry>,
    pub(crate) on_execution_error: ErrorPredicate,
    pub(crate) on_completion_error: ErrorPredicate,
    pub(crate) on_unknown: TokenPredicate,
    pub(crate) on_console_incompatible: TokenPredicate,
}

enum Route {
    Unknown,
    ConsoleIncompatible,
    Dispatch(Arc<dyn Command>),
    Fallthrough,
}

impl CommandEntry {
    /// The immutable identity token.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Namespace of the owning application.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether the entry may be registered.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable the entry.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether registration displaces an existing same-named command.
    pub fn is_overriding(&self) -> bool {
        self.overriding.load(Ordering::SeqCst)
    }

    /// Set the overriding flag for future registrations.
    pub fn set_overriding(&self, overriding: bool) {
        self.overriding.store(overriding, Ordering::SeqCst);
    }

    /// Whether the entry is currently registered in the global table.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Whether a displaced command is currently held for restoration.
    pub fn has_displaced(&self) -> bool {
        self.displaced.lock().unwrap().is_some()
    }

    /// The entry's debounce synchronizer.
    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    /// Append aliases, skipping the primary name and duplicates.
    pub fn add_aliases<I, S>(&self, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut current = self.aliases.lock().unwrap();
        for alias in aliases {
            let alias = alias.into();
            if alias != self.name && !current.contains(&alias) {
                current.push(alias);
            }
        }
    }

    /// Remove the given aliases.
    pub fn remove_aliases<I, S>(&self, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = self.aliases.lock().unwrap();
        for alias in aliases {
            current.retain(|a| a != alias.as_ref());
        }
    }

    /// The permission node, optionally in wildcard form.
    ///
    /// The wildcard suffix is appended only when the entry owns at least
    /// one sub-command, so one grant can cover the command and all its
    /// children.
    pub fn permission_string(&self, wildcard: bool) -> String {
        if wildcard && !self.subcommands.lock().unwrap().is_empty() {
            self.wildcard_node()
        } else {
            self.permission.clone()
        }
    }

    fn wildcard_node(&self) -> String {
        format!("{}{}", self.permission, WILDCARD_SUFFIX)
    }

    /// Add a sub-command; a same-named one is replaced.
    pub fn add_subcommand(&self, command: Arc<dyn Command>) {
        self.subcommands.lock().unwrap().add(command);
    }

    /// Remove a sub-command by exact primary name.
    pub fn remove_subcommand(&self, name: &str) -> Result<Option<Arc<dyn Command>>, RegistryError> {
        self.subcommands.lock().unwrap().remove(name)
    }

    /// Look up a sub-command by name or alias.
    pub fn subcommand(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.subcommands.lock().unwrap().get(name)
    }

    /// Whether the entry owns at least one sub-command.
    pub fn has_subcommands(&self) -> bool {
        !self.subcommands.lock().unwrap().is_empty()
    }

    /// Replace the console-argument whitelist.
    pub fn set_console_arguments<I, S>(&self, arguments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subcommands
            .lock()
            .unwrap()
            .set_console_arguments(arguments);
    }

    /// Run the command, routing through sub-commands where applicable.
    ///
    /// Routing applies when sub-commands exist and `args` is non-empty:
    /// an unknown first token goes to the unknown-sub-command predicate;
    /// a console caller using a non-whitelisted token goes to the
    /// console-incompatible predicate; a matched but unpermitted
    /// sub-command deliberately falls through to this entry's own action.
    /// Faults from actions are contained by the execution-error
    /// predicate.
    pub fn dispatch(&self, caller: &dyn Caller, args: &[String]) -> Outcome {
        if !args.is_empty() {
            let route = {
                let subs = self.subcommands.lock().unwrap();
                if subs.is_empty() {
                    Route::Fallthrough
                } else {
                    let token = args[0].as_str();
                    match subs.get(token) {
                        None => Route::Unknown,
                        Some(sub) => {
                            if caller.is_console() && !subs.is_console_compatible(token) {
                                Route::ConsoleIncompatible
                            } else if sub.is_permitted(caller) {
                                Route::Dispatch(sub)
                            } else {
                                Route::Fallthrough
                            }
                        }
                    }
                }
            };

            match route {
                Route::Unknown => {
                    return Outcome::from((self.on_unknown)(caller, &args[0]));
                }
                Route::ConsoleIncompatible => {
                    return Outcome::from((self.on_console_incompatible)(caller, &args[0]));
                }
                Route::Dispatch(sub) => {
                    debug!(
                        command = %self.name,
                        sub = %sub.name(),
                        caller = %caller.name(),
                        "dispatching to sub-command"
                    );
                    return match sub.execute(caller, &args[1..]) {
                        Ok(outcome) => outcome,
                        Err(error) => Outcome::from((self.on_execution_error)(caller, &error)),
                    };
                }
                Route::Fallthrough => {}
            }
        }

        if !self.is_permitted_or_notify(caller) {
            return Outcome::Failure;
        }
        match (self.action)(caller, args) {
            Ok(outcome) => outcome,
            Err(error) => Outcome::from((self.on_execution_error)(caller, &error)),
        }
    }

    /// Produce tab-completion candidates.
    ///
    /// A configured, non-empty suggestion builder replaces the plain
    /// completion source. Completion faults go through the
    /// completion-error predicate and fall back to no suggestions, so a
    /// completion bug never breaks the caller's interactive session.
    /// Completion never mutates state and never checks permission.
    pub fn complete(&self, caller: &dyn Caller, args: &[String]) -> Vec<String> {
        match self.try_complete(caller, args) {
            Ok(candidates) => candidates,
            Err(error) => {
                (self.on_completion_error)(caller, &error);
                Vec::new()
            }
        }
    }

    fn try_complete(&self, caller: &dyn Caller, args: &[String]) -> anyhow::Result<Vec<String>> {
        if let Some(builder) = &self.suggestions {
            if !builder.is_empty() {
                return Ok(builder.build(caller, args));
            }
        }
        match &self.completions {
            Some(provider) => provider(caller, args),
            None => Ok(Vec::new()),
        }
    }

    /// Register this entry in the global table.
    ///
    /// No-op returning `false` when already registered or disabled. With
    /// the overriding flag set, an existing same-named command is
    /// captured as a displaced record and removed first. Permission
    /// nodes are withdrawn so the host re-declares them fresh; they are
    /// re-declared at unregistration. With `synchronize`, a debounced
    /// publish is requested.
    pub fn register(self: &Arc<Self>, synchronize: bool) -> bool {
        if self.is_registered() || !self.is_enabled() {
            return false;
        }

        let this = self.as_table_command();
        if self.is_overriding() {
            if let Some(existing) = self.table.get(&self.name) {
                if !same_command(&existing, &this) {
                    let record = DisplacedEntry::capture(self.table.as_ref(), Arc::clone(&existing));
                    self.table.remove(&existing);
                    info!(
                        command = %self.name,
                        prefix = %record.fallback_prefix,
                        "displaced existing command"
                    );
                    *self.displaced.lock().unwrap() = Some(record);
                }
            }
        }

        self.withdraw_permissions();
        self.table.insert(&self.namespace, this);

        if synchronize {
            self.synchronizer.request_sync();
        }
        self.registered.store(true, Ordering::SeqCst);
        info!(command = %self.name, namespace = %self.namespace, "command registered");
        true
    }

    /// Unregister this entry from the global table.
    ///
    /// No-op returning `false` when not registered. If another command
    /// has since taken the table slot, the call aborts with `false`
    /// rather than clobbering the other registration — an expected race
    /// outcome, not a fault. Permission nodes are re-declared and a held
    /// displaced command is restored under its captured prefix.
    pub fn unregister(self: &Arc<Self>, synchronize: bool) -> bool {
        if !self.is_registered() {
            return false;
        }

        let this = self.as_table_command();
        match self.table.get(&self.name) {
            Some(current) if same_command(&current, &this) => {}
            _ => {
                warn!(
                    command = %self.name,
                    "table slot no longer held by this entry; unregister aborted"
                );
                return false;
            }
        }

        self.table.remove(&this);
        self.declare_permissions();

        if let Some(record) = self.displaced.lock().unwrap().take() {
            record.restore(self.table.as_ref());
        }

        if synchronize {
            self.synchronizer.request_sync();
        }
        self.registered.store(false, Ordering::SeqCst);
        info!(command = %self.name, "command unregistered");
        true
    }

    fn as_table_command(self: &Arc<Self>) -> Arc<dyn TableCommand> {
        Arc::clone(self) as Arc<dyn TableCommand>
    }

    fn withdraw_permissions(&self) {
        self.permissions.remove_permission(&self.permission);
        let subs = self.subcommands.lock().unwrap();
        if !subs.is_empty() {
            for sub in subs.commands() {
                self.permissions.remove_permission(sub.permission());
            }
            self.permissions.remove_permission(&self.wildcard_node());
        }
    }

    fn declare_permissions(&self) {
        self.permissions.add_permission(&self.permission);
        let subs = self.subcommands.lock().unwrap();
        if !subs.is_empty() {
            for sub in subs.commands() {
                self.permissions.add_permission(sub.permission());
            }
            self.permissions.add_permission(&self.wildcard_node());
        }
    }
}

impl TableCommand for CommandEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<String> {
        self.aliases.lock().unwrap().clone()
    }

    fn namespace(&self) -> Option<&str> {
        Some(&self.namespace)
    }
}

impl Command for CommandEntry {
    fn permission(&self) -> &str {
        &self.permission
    }

    fn execute(&self, caller: &dyn Caller, args: &[String]) -> anyhow::Result<Outcome> {
        Ok(self.dispatch(caller, args))
    }

    fn tab_complete(&self, caller: &dyn Caller, args: &[String]) -> Vec<String> {
        self.complete(caller, args)
    }
}

impl PartialEq for CommandEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CommandEntry {}

impl Hash for CommandEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("registered", &self.is_registered())
            .field("overriding", &self.is_overriding())
            .finish_non_exhaustive()
    }
}
