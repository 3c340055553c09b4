//! # Scope Registry
//!
//! Live scopes in presentation order, outermost first. The UI layer
//! registers a scope when it appears and unregisters it when it goes away;
//! the most recently registered live scope is the one the user is looking at.
//!
//! Only weak handles are stored. A scope dropped without an unregister
//! leaves a dead handle behind, which every read purges before looking.
//! The optional sweeper does the same on a timer so the list can't grow
//! while nobody reads it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use log::{debug, warn};
use tokio::task::AbortHandle;

use crate::core::scope::{Router, WeakRouter};

/// How often the background sweeper purges dead scopes by default.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

pub struct ScopeRegistry<P> {
    scopes: Mutex<Vec<WeakRouter<P>>>,
}

impl<P> Default for ScopeRegistry<P> {
    fn default() -> Self {
        Self {
            scopes: Mutex::new(Vec::new()),
        }
    }
}

fn purge_dead<P>(scopes: &mut Vec<WeakRouter<P>>) -> usize {
    let before = scopes.len();
    scopes.retain(WeakRouter::is_alive);
    before - scopes.len()
}

impl<P: Send + Sync + 'static> ScopeRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WeakRouter<P>>> {
        self.scopes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `scope` as the new topmost scope. Returns `false` if it was
    /// already registered, in which case its position is unchanged.
    pub fn register(&self, scope: &Router<P>) -> bool {
        let mut scopes = self.lock();
        purge_dead(&mut scopes);
        if scopes.iter().any(|s| s.points_to(scope)) {
            return false;
        }
        scopes.push(scope.downgrade());
        debug!("Registered {} ({} live)", scope.id(), scopes.len());
        true
    }

    pub fn unregister(&self, scope: &Router<P>) {
        let mut scopes = self.lock();
        scopes.retain(|s| s.is_alive() && !s.points_to(scope));
        debug!("Unregistered {} ({} live)", scope.id(), scopes.len());
    }

    /// The frontmost live scope, if any.
    pub fn topmost(&self) -> Option<Router<P>> {
        let mut scopes = self.lock();
        purge_dead(&mut scopes);
        // A scope can still die between the purge and the upgrade.
        scopes.iter().rev().find_map(WeakRouter::upgrade)
    }

    pub fn live_scopes(&self) -> Vec<Router<P>> {
        let mut scopes = self.lock();
        purge_dead(&mut scopes);
        scopes.iter().filter_map(WeakRouter::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        let mut scopes = self.lock();
        purge_dead(&mut scopes);
        scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops dead handles. Returns how many were removed.
    pub fn purge(&self) -> usize {
        let removed = purge_dead(&mut self.lock());
        if removed > 0 {
            debug!("Purged {} dead scopes", removed);
        }
        removed
    }

    /// Starts a periodic purge on the current tokio runtime. The task only
    /// holds a weak reference and stops once the registry is dropped.
    ///
    /// Returns `None` outside a runtime or for a zero interval.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> Option<AbortHandle> {
        if interval.is_zero() {
            return None;
        }
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No tokio runtime, registry sweeper not started");
                return None;
            }
        };
        let registry: Weak<Self> = Arc::downgrade(self);
        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match registry.upgrade() {
                    Some(registry) => {
                        registry.purge();
                    }
                    None => break,
                }
            }
        });
        Some(task.abort_handle())
    }
}
