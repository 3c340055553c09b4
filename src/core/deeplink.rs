//! # Deep Link Dispatcher
//!
//! Holds destinations that arrived before anything could show them
//! (app still locked, onboarding in progress) and hands them to the
//! topmost scope, oldest first, whenever delivery is attempted.
//!
//! ```text
//! enqueue(url) ─► parser ─┬─ None ──► dropped
//!                         └─ Some ──► pending (FIFO) ─► attempt_delivery()
//!                                                           │
//!                      topmost scope? ── no ──► stays queued
//!                                     └─ yes ─► pop front, submit to scope
//!                                                   │
//!                                  refused (torn down) ──► back to front
//! ```
//!
//! An item is removed from the queue before it is routed, never after, so
//! a re-entrant or concurrent `attempt_delivery` cannot deliver it twice.
//! Delivery goes through the scope's serializer, so a link lands after any
//! action already submitted there.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::action::Action;
use crate::core::entry::NavigationEntry;
use crate::core::registry::ScopeRegistry;
use crate::core::scope::Router;

/// Turns a raw link into a destination payload. Supplied by the host app;
/// returning `None` drops the link.
pub trait LinkParser<P>: Send + Sync {
    fn parse(&self, descriptor: &str) -> Option<P>;
}

impl<P, F> LinkParser<P> for F
where
    F: Fn(&str) -> Option<P> + Send + Sync,
{
    fn parse(&self, descriptor: &str) -> Option<P> {
        self(descriptor)
    }
}

/// How a delivered destination is shown on the receiving scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStyle {
    #[default]
    Push,
    /// Full-screen overlay.
    Present,
    Sheet,
}

pub struct DeepLinkDispatcher<P> {
    registry: Arc<ScopeRegistry<P>>,
    parser: Arc<dyn LinkParser<P>>,
    pending: Mutex<VecDeque<NavigationEntry<P>>>,
    style: DeliveryStyle,
    delivered: AtomicUsize,
    dropped: AtomicUsize,
}

impl<P: Send + Sync + 'static> DeepLinkDispatcher<P> {
    pub fn new(registry: Arc<ScopeRegistry<P>>, parser: Arc<dyn LinkParser<P>>) -> Self {
        Self::with_style(registry, parser, DeliveryStyle::default())
    }

    pub fn with_style(
        registry: Arc<ScopeRegistry<P>>,
        parser: Arc<dyn LinkParser<P>>,
        style: DeliveryStyle,
    ) -> Self {
        Self {
            registry,
            parser,
            pending: Mutex::new(VecDeque::new()),
            style,
            delivered: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<NavigationEntry<P>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn style(&self) -> DeliveryStyle {
        self.style
    }

    pub fn pending_len(&self) -> usize {
        self.lock().len()
    }

    /// Links handed to a scope since construction.
    pub fn delivered_total(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Links the parser rejected since construction.
    pub fn dropped_total(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Parses `descriptor` and queues the result, then tries to deliver.
    /// Unparseable links are dropped without a trace beyond a debug log.
    pub fn enqueue(&self, descriptor: &str) {
        let Some(destination) = self.parser.parse(descriptor) else {
            debug!("Dropping unparseable link: {}", descriptor);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        let queued = {
            let mut pending = self.lock();
            pending.push_back(NavigationEntry::new(destination));
            pending.len()
        };
        debug!("Queued link {} ({} pending)", descriptor, queued);
        self.attempt_delivery();
    }

    /// Delivers pending destinations to the topmost scope until the queue
    /// is empty or no scope is available. Returns how many were delivered.
    ///
    /// A scope that refuses the link (it was torn down but not yet
    /// unregistered) ends the attempt and the link goes back to the front.
    pub fn attempt_delivery(&self) -> usize {
        let mut delivered = 0;
        while let Some(scope) = self.registry.topmost() {
            // Removed before routing: a second caller can't see it any more.
            let Some(entry) = self.lock().pop_front() else {
                break;
            };
            if !self.route(entry.clone(), &scope) {
                debug!("{} refused link {}, requeued", scope.id(), entry.id());
                self.lock().push_front(entry);
                break;
            }
            self.delivered.fetch_add(1, Ordering::Relaxed);
            delivered += 1;
        }
        if delivered > 0 {
            info!("Delivered {} deep links", delivered);
        }
        delivered
    }

    /// Submits `entry` behind whatever the scope already has queued.
    fn route(&self, entry: NavigationEntry<P>, scope: &Router<P>) -> bool {
        debug!("Routing link {} onto {} as {:?}", entry.id(), scope.id(), self.style);
        let action = match self.style {
            DeliveryStyle::Push => Action::Push(entry),
            DeliveryStyle::Present => Action::Present(entry),
            DeliveryStyle::Sheet => Action::PresentSheet(entry),
        };
        scope.submit(action)
    }
}
