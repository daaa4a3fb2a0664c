//! Fluent construction of command entries.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::caller::Caller;
use crate::command::{Action, Command, CompletionFn, ErrorPredicate, TokenPredicate};
use crate::entry::CommandEntry;
use crate::outcome::Outcome;
use crate::permission::PermissionRegistry;
use crate::scheduler::Scheduler;
use crate::subcommands::SubCommandRegistry;
use crate::suggest::SuggestionBuilder;
use crate::sync::{DEFAULT_SYNC_DELAY_TICKS, Synchronizer};
use crate::table::CommandTable;

/// The host collaborators a command entry needs to register itself:
/// the global command table, the permission registry, and the scheduler
/// for the designated execution context.
#[derive(Clone)]
pub struct Host {
    /// The host's global command table.
    pub table: Arc<dyn CommandTable>,
    /// The host's permission registry.
    pub permissions: Arc<dyn PermissionRegistry>,
    /// The host's execution-context scheduler.
    pub scheduler: Arc<dyn Scheduler>,
}

impl Host {
    /// Bundle the three host collaborators.
    pub fn new(
        table: Arc<dyn CommandTable>,
        permissions: Arc<dyn PermissionRegistry>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            table,
            permissions,
            scheduler,
        }
    }
}

/// Fail-fast construction errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The namespace was blank.
    #[error("command namespace cannot be blank")]
    BlankNamespace,

    /// The command name was blank.
    #[error("command name cannot be blank")]
    BlankName,

    /// No action was configured.
    #[error("command '{0}' has no action")]
    MissingAction(String),
}

/// Builder for [`CommandEntry`] values.
///
/// ```rust,ignore
/// let entry = CommandBuilder::new("myapp", "greet")
///     .alias("hello")
///     .action(|caller, _args| {
///         caller.send("Hi!");
///         Ok(Outcome::Success)
///     })
///     .build(&host)?;
///
/// entry.register(true);
/// ```
pub struct CommandBuilder {
    namespace: String,
    name: String,
    permission: Option<String>,
    aliases: Vec<String>,
    enabled: bool,
    overriding: bool,
    action: Option<Action>,
    completions: Option<CompletionFn>,
    suggestions: Option<SuggestionBuilder>,
    console_arguments: Vec<String>,
    subcommands: Vec<Arc<dyn Command>>,
    sync_delay_ticks: u64,
    on_execution_error: Option<ErrorPredicate>,
    on_completion_error: Option<ErrorPredicate>,
    on_unknown: Option<TokenPredicate>,
    on_console_incompatible: Option<TokenPredicate>,
}

impl CommandBuilder {
    /// Start building a command owned by `namespace` (lowercased).
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into().to_lowercase(),
            name: name.into(),
            permission: None,
            aliases: Vec::new(),
            enabled: true,
            overriding: true,
            action: None,
            completions: None,
            suggestions: None,
            console_arguments: Vec::new(),
            subcommands: Vec::new(),
            sync_delay_ticks: DEFAULT_SYNC_DELAY_TICKS,
            on_execution_error: None,
            on_completion_error: None,
            on_unknown: None,
            on_console_incompatible: None,
        }
    }

    /// Set the permission node. Defaults to `{namespace}.{name}`; an
    /// explicitly blank node makes the command unrestricted.
    pub fn permission(mut self, node: impl Into<String>) -> Self {
        self.permission = Some(node.into());
        self
    }

    /// Add one alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add several aliases.
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Set whether the entry starts enabled. Defaults to `true`.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set whether registration displaces an existing same-named command.
    /// Defaults to `true`.
    pub fn overriding(mut self, overriding: bool) -> Self {
        self.overriding = overriding;
        self
    }

    /// Set the executable action.
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&dyn Caller, &[String]) -> anyhow::Result<Outcome> + Send + Sync + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Set an action that always yields a constant result.
    pub fn action_value(self, value: bool) -> Self {
        self.action(move |_, _| Ok(Outcome::from(value)))
    }

    /// Set the plain tab-completion source.
    pub fn completions<F>(mut self, completions: F) -> Self
    where
        F: Fn(&dyn Caller, &[String]) -> anyhow::Result<Vec<String>> + Send + Sync + 'static,
    {
        self.completions = Some(Box::new(completions));
        self
    }

    /// Set a static tab-completion list.
    pub fn completion_list<I, S>(self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = candidates.into_iter().map(Into::into).collect();
        self.completions(move |_, _| Ok(list.clone()))
    }

    /// Set the suggestion builder. A non-empty builder replaces the
    /// plain completion source.
    pub fn suggestions(mut self, builder: SuggestionBuilder) -> Self {
        self.suggestions = Some(builder);
        self
    }

    /// Set the console-argument whitelist.
    pub fn console_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.console_arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Add a sub-command.
    pub fn subcommand(mut self, command: Arc<dyn Command>) -> Self {
        self.subcommands.push(command);
        self
    }

    /// Set the debounce delay for registry synchronization, in ticks.
    pub fn sync_delay(mut self, ticks: u64) -> Self {
        self.sync_delay_ticks = ticks;
        self
    }

    /// Set the execution-error predicate. The default notifies the
    /// caller, logs the fault, and reports it handled.
    pub fn on_execution_error<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn Caller, &anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.on_execution_error = Some(Box::new(predicate));
        self
    }

    /// Set the completion-error predicate. The default notifies the
    /// caller, logs the fault, and reports it handled.
    pub fn on_completion_error<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn Caller, &anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.on_completion_error = Some(Box::new(predicate));
        self
    }

    /// Set the unknown-sub-command predicate. The default reports the
    /// token handled without any message.
    pub fn on_unknown<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn Caller, &str) -> bool + Send + Sync + 'static,
    {
        self.on_unknown = Some(Box::new(predicate));
        self
    }

    /// Set the console-incompatible predicate. The default notifies the
    /// caller and reports failure.
    pub fn on_console_incompatible<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn Caller, &str) -> bool + Send + Sync + 'static,
    {
        self.on_console_incompatible = Some(Box::new(predicate));
        self
    }

    /// Build the entry, failing fast on blank required fields or a
    /// missing action.
    pub fn build(self, host: &Host) -> Result<Arc<CommandEntry>, BuildError> {
        if self.namespace.trim().is_empty() {
            return Err(BuildError::BlankNamespace);
        }
        if self.name.trim().is_empty() {
            return Err(BuildError::BlankName);
        }
        let action = self
            .action
            .ok_or_else(|| BuildError::MissingAction(self.name.clone()))?;

        let name = self.name;
        let permission = self
            .permission
            .unwrap_or_else(|| format!("{}.{}", self.namespace, name));

        let mut aliases = Vec::new();
        for alias in self.aliases {
            if alias != name && !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }

        let mut subcommands = SubCommandRegistry::with_console_arguments(self.console_arguments);
        for sub in self.subcommands {
            subcommands.add(sub);
        }

        let synchronizer = Synchronizer::with_delay(
            Arc::clone(&host.scheduler),
            Arc::clone(&host.table),
            self.sync_delay_ticks,
        );

        let on_execution_error = self.on_execution_error.unwrap_or_else(|| {
            let name = name.clone();
            Box::new(move |caller: &dyn Caller, fault: &anyhow::Error| {
                error!(command = %name, %fault, "error executing command");
                caller.send(&format!("An internal error occurred running /{name}."));
                true
            })
        });
        let on_completion_error = self.on_completion_error.unwrap_or_else(|| {
            let name = name.clone();
            Box::new(move |caller: &dyn Caller, fault: &anyhow::Error| {
                warn!(command = %name, %fault, "error completing command");
                caller.send(&format!("An internal error occurred completing /{name}."));
                true
            })
        });
        let on_unknown = self
            .on_unknown
            .unwrap_or_else(|| Box::new(|_: &dyn Caller, _: &str| true));
        let on_console_incompatible = self.on_console_incompatible.unwrap_or_else(|| {
            Box::new(|caller: &dyn Caller, token: &str| {
                caller.send(&format!(
                    "The '{token}' argument cannot be used from the console."
                ));
                false
            })
        });

        Ok(Arc::new(CommandEntry {
            id: Uuid::new_v4(),
            namespace: self.namespace,
            name,
            permission,
            aliases: Mutex::new(aliases),
            enabled: AtomicBool::new(self.enabled),
            overriding: AtomicBool::new(self.overriding),
            registered: AtomicBool::new(false),
            action,
            completions: self.completions,
            suggestions: self.suggestions,
            subcommands: Mutex::new(subcommands),
            synchronizer,
            displaced: Mutex::new(None),
            table: Arc::clone(&host.table),
            permissions: Arc::clone(&host.permissions),
            on_execution_error,
            on_completion_error,
            on_unknown,
            on_console_incompatible,
        }))
    }
}

impl std::fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("enabled", &self.enabled)
            .field("overriding", &self.overriding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::MemoryPermissions;
    use crate::scheduler::{Task, TaskHandle};
    use crate::table::InMemoryTable;

    struct NullScheduler;

    struct NullHandle;

    impl TaskHandle for NullHandle {
        fn cancel(self: Box<Self>) {}
    }

    impl Scheduler for NullScheduler {
        fn is_active(&self) -> bool {
            false
        }

        fn run(&self, _task: Task) {}

        fn schedule_after(&self, _ticks: u64, _task: Task) -> Box<dyn TaskHandle> {
            Box::new(NullHandle)
        }
    }

    fn host() -> Host {
        Host::new(
            Arc::new(InMemoryTable::new()),
            Arc::new(MemoryPermissions::new()),
            Arc::new(NullScheduler),
        )
    }

    #[test]
    fn test_defaults() {
        let entry = CommandBuilder::new("MyApp", "greet")
            .action_value(true)
            .build(&host())
            .unwrap();

        assert_eq!(entry.namespace(), "myapp");
        assert_eq!(crate::TableCommand::name(entry.as_ref()), "greet");
        assert_eq!(crate::Command::permission(entry.as_ref()), "myapp.greet");
        assert!(entry.is_enabled());
        assert!(entry.is_overriding());
        assert!(!entry.is_registered());
    }

    #[test]
    fn test_blank_name_fails_fast() {
        let result = CommandBuilder::new("app", "  ").action_value(true).build(&host());
        assert!(matches!(result, Err(BuildError::BlankName)));
    }

    #[test]
    fn test_blank_namespace_fails_fast() {
        let result = CommandBuilder::new("", "greet").action_value(true).build(&host());
        assert!(matches!(result, Err(BuildError::BlankNamespace)));
    }

    #[test]
    fn test_missing_action_fails_fast() {
        let result = CommandBuilder::new("app", "greet").build(&host());
        assert!(matches!(result, Err(BuildError::MissingAction(name)) if name == "greet"));
    }

    #[test]
    fn test_aliases_drop_primary_name_and_duplicates() {
        let entry = CommandBuilder::new("app", "greet")
            .aliases(["hello", "greet", "hello", "hi"])
            .action_value(true)
            .build(&host())
            .unwrap();

        assert_eq!(
            crate::TableCommand::aliases(entry.as_ref()),
            vec!["hello".to_string(), "hi".to_string()]
        );
    }

    #[test]
    fn test_explicit_permission_wins_over_default() {
        let entry = CommandBuilder::new("app", "greet")
            .permission("custom.node")
            .action_value(true)
            .build(&host())
            .unwrap();

        assert_eq!(crate::Command::permission(entry.as_ref()), "custom.node");
    }
}
