//! # Operation Serializer
//!
//! Applies mutations against one scope one at a time, in submission order,
//! pausing for a settle delay after each so the rendering layer can finish
//! animating before the next change lands.
//!
//! ```text
//! submit(op) ──► queue ──► drain: pop front → run → sleep(settle) → repeat
//!                   ▲                  │
//!  submit while ────┘                  └─ queue empty → drain ends
//!  draining only enqueues
//! ```
//!
//! With a zero settle delay the queue drains inline on the submitting thread.
//! Otherwise the drain runs as a tokio task whose `AbortHandle` is kept so
//! `shutdown()` can cancel the settle wait. Cancellation never interrupts an
//! operation halfway: aborts only take effect at the sleep.
//!
//! A drain that dies early (a panicking operation, or its runtime going
//! away) hands the queue back, and the next `submit` starts a new drain.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::AbortHandle;

type Operation = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Queue {
    ops: VecDeque<Operation>,
    draining: bool,
    /// Bumped each time a drain starts, so a finished drain's guard can't
    /// end its successor.
    generation: u64,
    closed: bool,
    /// Submitted but not yet run and settled.
    outstanding: usize,
    drain_task: Option<AbortHandle>,
}

struct Shared {
    queue: Mutex<Queue>,
    outstanding: watch::Sender<usize>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pops the next operation, or ends the drain when the queue is empty.
    fn next_operation(&self) -> Option<Operation> {
        let mut queue = self.lock();
        let next = queue.ops.pop_front();
        if next.is_none() {
            queue.draining = false;
            queue.drain_task = None;
        }
        next
    }

    fn finish_one(&self) {
        let mut queue = self.lock();
        queue.outstanding = queue.outstanding.saturating_sub(1);
        self.outstanding.send_replace(queue.outstanding);
    }
}

/// Held by a running drain. If the drain stops before emptying the queue
/// (an operation panicked, or the runtime dropped the task) it releases
/// the queue so the next `submit` starts a fresh drain.
struct DrainGuard {
    shared: Arc<Shared>,
    generation: u64,
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        let mut queue = self.shared.lock();
        if !queue.draining || queue.generation != self.generation {
            return;
        }
        queue.draining = false;
        queue.drain_task = None;
        // Whatever was in flight is gone; only queued operations remain.
        queue.outstanding = queue.ops.len();
        self.shared.outstanding.send_replace(queue.outstanding);
        warn!(
            "Drain stopped early, {} operations wait for the next submit",
            queue.ops.len()
        );
    }
}

fn drain_inline(guard: DrainGuard) {
    while let Some(op) = guard.shared.next_operation() {
        op();
        guard.shared.finish_one();
    }
}

/// The guard is built before the first poll, so a task that never runs
/// still releases the queue when it is dropped.
fn drain_paced(guard: DrainGuard, settle_delay: Duration) -> impl Future<Output = ()> + Send + 'static {
    async move {
        while let Some(op) = guard.shared.next_operation() {
            op();
            tokio::time::sleep(settle_delay).await;
            guard.shared.finish_one();
        }
    }
}

pub struct OperationSerializer {
    settle_delay: Duration,
    shared: Arc<Shared>,
}

impl OperationSerializer {
    pub fn new(settle_delay: Duration) -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            settle_delay,
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue::default()),
                outstanding,
            }),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Queues `op` and starts a drain if none is running.
    ///
    /// Returns `false` when the serializer has been shut down; the operation
    /// is dropped without running.
    pub fn submit(&self, op: impl FnOnce() + Send + 'static) -> bool {
        let mut queue = self.shared.lock();
        if queue.closed {
            debug!("Serializer closed, dropping submitted operation");
            return false;
        }
        queue.ops.push_back(Box::new(op));
        queue.outstanding += 1;
        self.shared.outstanding.send_replace(queue.outstanding);
        if queue.draining && queue.drain_task.as_ref().is_some_and(AbortHandle::is_finished) {
            warn!("Drain task ended without releasing the queue, restarting");
            queue.draining = false;
            queue.drain_task = None;
        }
        if queue.draining {
            return true;
        }
        queue.draining = true;
        queue.generation += 1;
        let generation = queue.generation;
        drop(queue);
        let guard = DrainGuard {
            shared: Arc::clone(&self.shared),
            generation,
        };

        if !self.settle_delay.is_zero() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    // Spawned outside the lock: a shut-down runtime drops the
                    // future, and with it the guard, before `spawn` returns.
                    let task = handle.spawn(drain_paced(guard, self.settle_delay));
                    let mut queue = self.shared.lock();
                    if queue.draining && queue.generation == generation {
                        queue.drain_task = Some(task.abort_handle());
                    }
                    return true;
                }
                Err(_) => {
                    warn!("No tokio runtime for paced drain, applying without settle delay");
                }
            }
        }

        drain_inline(guard);
        true
    }

    /// Number of operations submitted but not yet applied and settled.
    pub fn pending(&self) -> usize {
        self.shared.lock().outstanding
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Resolves once every submitted operation has run and its settle delay
    /// has elapsed, or immediately after `shutdown()`.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.outstanding.subscribe();
        let _ = rx.wait_for(|outstanding| *outstanding == 0).await;
    }

    /// Cancels any in-flight settle wait and abandons the queue.
    /// Later submissions are refused.
    pub fn shutdown(&self) {
        let abandoned = {
            let mut queue = self.shared.lock();
            queue.closed = true;
            queue.draining = false;
            queue.outstanding = 0;
            if let Some(task) = queue.drain_task.take() {
                task.abort();
            }
            self.shared.outstanding.send_replace(0);
            std::mem::take(&mut queue.ops)
        };
        if !abandoned.is_empty() {
            debug!("Serializer shut down, abandoned {} queued operations", abandoned.len());
        }
    }
}

impl Drop for OperationSerializer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
