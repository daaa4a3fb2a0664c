//! Debounced synchronization of registry changes with the host.
//!
//! Many rapid registry mutations (say, registering five sub-commands in a
//! loop) must result in exactly one downstream publish, scheduled after a
//! short quiet period measured from the last mutation.

use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::scheduler::{Scheduler, TaskHandle};
use crate::table::CommandTable;

/// Default quiet period before publishing, in scheduler ticks.
pub const DEFAULT_SYNC_DELAY_TICKS: u64 = 1;

#[derive(Default)]
struct Pending {
    handle: Option<Box<dyn TaskHandle>>,
    // Bumped on every re-arm and cancel. A fired timer publishes only if
    // its generation is still current, so a timer that was cancelled
    // after firing cannot sneak a second publish onto the context.
    generation: u64,
}

struct SyncState {
    scheduler: Arc<dyn Scheduler>,
    table: Arc<dyn CommandTable>,
    delay_ticks: u64,
    pending: Mutex<Pending>,
}

/// Debounce scheduler for [`CommandTable::publish`].
///
/// At most one publish is pending at a time. [`Synchronizer::request_sync`]
/// and [`Synchronizer::cancel`] are safe to call from any thread; the
/// publish itself always runs on the scheduler's designated context.
pub struct Synchronizer {
    state: Arc<SyncState>,
}

impl Synchronizer {
    /// Create a synchronizer with the default delay.
    pub fn new(scheduler: Arc<dyn Scheduler>, table: Arc<dyn CommandTable>) -> Self {
        Self::with_delay(scheduler, table, DEFAULT_SYNC_DELAY_TICKS)
    }

    /// Create a synchronizer with a custom delay in scheduler ticks.
    pub fn with_delay(
        scheduler: Arc<dyn Scheduler>,
        table: Arc<dyn CommandTable>,
        delay_ticks: u64,
    ) -> Self {
        Self {
            state: Arc::new(SyncState {
                scheduler,
                table,
                delay_ticks,
                pending: Mutex::new(Pending::default()),
            }),
        }
    }

    /// Schedule a publish after the quiet period, replacing any pending
    /// one so the delay is measured from this call.
    ///
    /// Degrades to [`Synchronizer::cancel`] when the host scheduler is no
    /// longer active.
    pub fn request_sync(&self) {
        if !self.state.scheduler.is_active() {
            self.cancel();
            return;
        }

        let mut pending = self.state.pending.lock().unwrap();
        if let Some(handle) = pending.handle.take() {
            handle.cancel();
        }
        pending.generation = pending.generation.wrapping_add(1);
        let generation = pending.generation;

        trace!(delay_ticks = self.state.delay_ticks, "command sync scheduled");

        let state = Arc::clone(&self.state);
        pending.handle = Some(self.state.scheduler.schedule_after(
            self.state.delay_ticks,
            Box::new(move || {
                let current = {
                    let mut pending = state.pending.lock().unwrap();
                    if pending.generation != generation {
                        false
                    } else {
                        pending.handle = None;
                        true
                    }
                };
                if current {
                    debug!("publishing command table changes");
                    state.table.publish();
                }
            }),
        ));
    }

    /// Cancel any pending publish. No effect if none is pending.
    pub fn cancel(&self) {
        let mut pending = self.state.pending.lock().unwrap();
        if let Some(handle) = pending.handle.take() {
            handle.cancel();
        }
        pending.generation = pending.generation.wrapping_add(1);
    }

    /// Whether a publish is currently pending.
    pub fn is_pending(&self) -> bool {
        self.state.pending.lock().unwrap().handle.is_some()
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("delay_ticks", &self.state.delay_ticks)
            .field("pending", &self.is_pending())
            .finish()
    }
}
