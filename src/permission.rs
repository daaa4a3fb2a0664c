//! Host permission registry contract and an in-memory implementation.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::debug;

/// Suffix appended to a command's permission node to cover the command and
/// all of its sub-commands with a single grant.
pub const WILDCARD_SUFFIX: &str = ".*";

/// The host's registry of named permission nodes.
///
/// Both operations are idempotent and tolerate blank or duplicate input
/// with a no-op rather than a fault.
pub trait PermissionRegistry: Send + Sync {
    /// Declare a permission node.
    fn add_permission(&self, node: &str);

    /// Withdraw a permission node.
    fn remove_permission(&self, node: &str);
}

/// In-memory permission registry for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryPermissions {
    nodes: Mutex<HashSet<String>>,
}

impl MemoryPermissions {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the node is currently declared.
    pub fn contains(&self, node: &str) -> bool {
        self.nodes.lock().unwrap().contains(node)
    }

    /// Number of declared nodes.
    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    /// Whether no nodes are declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.lock().unwrap().is_empty()
    }
}

impl PermissionRegistry for MemoryPermissions {
    fn add_permission(&self, node: &str) {
        if node.trim().is_empty() {
            return;
        }
        if self.nodes.lock().unwrap().insert(node.to_string()) {
            debug!(node, "permission declared");
        }
    }

    fn remove_permission(&self, node: &str) {
        if node.trim().is_empty() {
            return;
        }
        if self.nodes.lock().unwrap().remove(node) {
            debug!(node, "permission withdrawn");
        }
    }
}
