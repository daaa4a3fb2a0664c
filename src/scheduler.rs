//! Designated execution context and delayed-task scheduling.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A unit of work handed to the scheduler.
pub type Task = Box<dyn FnOnce() + Send>;

/// Length of one scheduler tick for [`TokioScheduler::spawn`].
pub const TICK: Duration = Duration::from_millis(50);

/// Handle to a scheduled, not-yet-run task.
pub trait TaskHandle: Send {
    /// Cancel the task. No effect if it already ran.
    fn cancel(self: Box<Self>);
}

/// The host's execution-context scheduler.
///
/// Every task handed to [`Scheduler::run`] or fired from
/// [`Scheduler::schedule_after`] runs on one designated serial context,
/// never concurrently with another such task. Scheduling itself may be
/// invoked from any thread.
pub trait Scheduler: Send + Sync {
    /// Whether the host context is still active. An inactive scheduler
    /// drops tasks instead of running them.
    fn is_active(&self) -> bool;

    /// Run a task on the designated context as soon as possible.
    fn run(&self, task: Task);

    /// Run a task on the designated context after a delay of whole ticks.
    fn schedule_after(&self, ticks: u64, task: Task) -> Box<dyn TaskHandle>;
}

/// Tokio-backed scheduler.
///
/// The designated context is a dedicated worker task draining an unbounded
/// channel, so queued tasks run strictly one at a time in submission
/// order. Delayed tasks are timer tasks that enqueue their callback on
/// expiry; cancelling aborts the timer.
///
/// Must be created from within a Tokio runtime.
pub struct TokioScheduler {
    jobs: mpsc::UnboundedSender<Task>,
    active: AtomicBool,
    tick: Duration,
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TokioScheduler {
    /// Spawn a scheduler with the default [`TICK`] length.
    pub fn spawn() -> Self {
        Self::with_tick(TICK)
    }

    /// Spawn a scheduler with a custom tick length.
    pub fn with_tick(tick: Duration) -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Task>();
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });

        Self {
            jobs,
            active: AtomicBool::new(true),
            tick,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Mark the scheduler inactive and stop the worker.
    ///
    /// Pending and future tasks are dropped.
    pub fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.lock().unwrap().take() {
            worker.abort();
            debug!("scheduler worker stopped");
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("active", &self.is_active())
            .field("tick", &self.tick)
            .finish()
    }
}

impl Scheduler for TokioScheduler {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.jobs.is_closed()
    }

    fn run(&self, task: Task) {
        if self.jobs.send(task).is_err() {
            warn!("scheduler worker is gone; task dropped");
        }
    }

    fn schedule_after(&self, ticks: u64, task: Task) -> Box<dyn TaskHandle> {
        let jobs = self.jobs.clone();
        let delay = self
            .tick
            .saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX));

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if jobs.send(task).is_err() {
                warn!("scheduler worker is gone; delayed task dropped");
            }
        });

        Box::new(TimerHandle(timer))
    }
}

struct TimerHandle(tokio::task::JoinHandle<()>);

impl TaskHandle for TimerHandle {
    fn cancel(self: Box<Self>) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    async fn drain() {
        // Give the worker task a chance to run queued jobs.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_run_executes_on_worker() {
        let scheduler = TokioScheduler::spawn();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        scheduler.run(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_preserves_submission_order() {
        let scheduler = TokioScheduler::spawn();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            scheduler.run(Box::new(move || {
                order.lock().unwrap().push(i);
            }));
        }

        drain().await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_after_waits_for_delay() {
        let scheduler = TokioScheduler::with_tick(Duration::from_millis(50));
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        let _handle = scheduler.schedule_after(2, Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::advance(Duration::from_millis(50)).await;
        drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(60)).await;
        drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_execution() {
        let scheduler = TokioScheduler::with_tick(Duration::from_millis(50));
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        let handle = scheduler.schedule_after(1, Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        handle.cancel();
        tokio::time::advance(Duration::from_millis(200)).await;
        drain().await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_marks_inactive_and_drops_tasks() {
        let scheduler = TokioScheduler::spawn();
        assert!(scheduler.is_active());

        scheduler.shutdown();
        assert!(!scheduler.is_active());

        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        scheduler.run(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
