//! # Router Scopes
//!
//! A `Router` is a cheap, cloneable handle to one navigation scope: its
//! `RouterState`, a weak link to the scope that presented it, a watch
//! channel observers subscribe to, and the scope's `OperationSerializer`.
//!
//! ```text
//! root Router ──sheet──► child Router ──full_screen──► grandchild Router
//!      ▲                      │                              │
//!      └──── Weak parent ─────┘◄──────── Weak parent ────────┘
//! ```
//!
//! Parents are fixed at construction, so scopes always form a forest.
//! Children never keep their parent alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::core::action::Action;
use crate::core::entry::NavigationEntry;
use crate::core::info::{NavigationInfo, Presentation};
use crate::core::serializer::OperationSerializer;
use crate::core::state::RouterState;

/// Upper bound on ancestor walks. Parents are fixed at construction so
/// cycles cannot form; this only guards against runaway nesting.
pub const MAX_SCOPE_DEPTH: usize = 64;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(u64);

impl ScopeId {
    fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// What observers receive on every change.
pub struct RouterSnapshot<P> {
    /// Increments by one per applied change.
    pub version: u64,
    pub state: RouterState<P>,
}

impl<P> Clone for RouterSnapshot<P> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            state: self.state.clone(),
        }
    }
}

impl<P> fmt::Debug for RouterSnapshot<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterSnapshot")
            .field("version", &self.version)
            .field("state", &self.state)
            .finish()
    }
}

struct Cell<P> {
    state: RouterState<P>,
    version: u64,
}

struct ScopeInner<P> {
    id: ScopeId,
    depth: usize,
    parent: Option<Weak<ScopeInner<P>>>,
    cell: Mutex<Cell<P>>,
    changes: watch::Sender<RouterSnapshot<P>>,
    serializer: OperationSerializer,
}

impl<P> ScopeInner<P> {
    fn lock(&self) -> MutexGuard<'_, Cell<P>> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Router<P> {
    inner: Arc<ScopeInner<P>>,
}

/// Non-owning handle, as held by the registry and by queued operations.
pub struct WeakRouter<P> {
    inner: Weak<ScopeInner<P>>,
}

impl<P> Clone for Router<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> Clone for WeakRouter<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<P> WeakRouter<P> {
    pub fn upgrade(&self) -> Option<Router<P>> {
        self.inner.upgrade().map(|inner| Router { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Identity comparison against a live handle.
    pub fn points_to(&self, router: &Router<P>) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Arc::as_ptr(&router.inner))
    }
}

impl<P: Send + Sync + 'static> Router<P> {
    /// A top-level scope with no settle delay.
    pub fn new(root: impl Into<NavigationEntry<P>>) -> Self {
        Self::with_settle_delay(root, Duration::ZERO)
    }

    pub fn with_settle_delay(root: impl Into<NavigationEntry<P>>, settle_delay: Duration) -> Self {
        Self::build(root.into(), None, 0, settle_delay)
    }

    /// A nested scope presented by `self`, typically rooted at the overlay
    /// entry that presented it. Inherits the parent's settle delay.
    pub fn child(&self, root: impl Into<NavigationEntry<P>>) -> Self {
        let settle_delay = self.inner.serializer.settle_delay();
        Self::build(
            root.into(),
            Some(Arc::downgrade(&self.inner)),
            self.inner.depth + 1,
            settle_delay,
        )
    }

    fn build(
        root: NavigationEntry<P>,
        parent: Option<Weak<ScopeInner<P>>>,
        depth: usize,
        settle_delay: Duration,
    ) -> Self {
        let state = RouterState::new(root);
        let (changes, _) = watch::channel(RouterSnapshot {
            version: 0,
            state: state.clone(),
        });
        let inner = Arc::new(ScopeInner {
            id: ScopeId::next(),
            depth,
            parent,
            cell: Mutex::new(Cell { state, version: 0 }),
            changes,
            serializer: OperationSerializer::new(settle_delay),
        });
        debug!("Created {} at nesting depth {}", inner.id, depth);
        Self { inner }
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    /// 0 for a top-level scope, parent's depth + 1 otherwise.
    pub fn nesting_depth(&self) -> usize {
        self.inner.depth
    }

    pub fn parent(&self) -> Option<Router<P>> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Router { inner })
    }

    pub fn downgrade(&self) -> WeakRouter<P> {
        WeakRouter {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Router<P>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn snapshot(&self) -> RouterSnapshot<P> {
        let cell = self.inner.lock();
        RouterSnapshot {
            version: cell.version,
            state: cell.state.clone(),
        }
    }

    /// Reads the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&RouterState<P>) -> R) -> R {
        f(&self.inner.lock().state)
    }

    /// Receives a new snapshot after every change to the stack or overlays.
    pub fn subscribe(&self) -> watch::Receiver<RouterSnapshot<P>> {
        self.inner.changes.subscribe()
    }

    /// Describes how `entry` is being shown from this scope.
    pub fn navigation_info(&self, entry: &NavigationEntry<P>) -> NavigationInfo {
        let is_pushed = self.with_state(|state| state.root() != Some(entry));
        let presentation = match self.parent() {
            None => Presentation::Root,
            Some(parent) => {
                if parent.with_state(|state| state.full_screen().is_some()) {
                    Presentation::FullScreen
                } else {
                    Presentation::Sheet
                }
            }
        };
        let is_presented = self
            .parent()
            .is_some_and(|parent| parent.with_state(RouterState::has_overlay));
        NavigationInfo {
            is_pushed,
            is_presented,
            presentation,
        }
    }

    // ------------------------------------------------------------------------
    // Immediate operations
    // ------------------------------------------------------------------------

    pub fn push(&self, entry: impl Into<NavigationEntry<P>>) {
        self.apply(Action::Push(entry.into()));
    }

    pub fn push_replacing_top(&self, entry: impl Into<NavigationEntry<P>>) {
        self.apply(Action::PushReplacingTop(entry.into()));
    }

    pub fn push_replacing_all(&self, entry: impl Into<NavigationEntry<P>>) {
        self.apply(Action::PushReplacingAll(entry.into()));
    }

    pub fn pop(&self) {
        self.apply(Action::Pop);
    }

    pub fn pop_to_root(&self) {
        self.apply(Action::PopToRoot);
    }

    pub fn present(&self, entry: impl Into<NavigationEntry<P>>) {
        self.apply(Action::Present(entry.into()));
    }

    pub fn present_sheet(&self, entry: impl Into<NavigationEntry<P>>) {
        self.apply(Action::PresentSheet(entry.into()));
    }

    pub fn dismiss(&self) {
        self.apply(Action::Dismiss);
    }

    pub fn dismiss_to_root(&self) {
        self.apply(Action::DismissToRoot);
    }

    pub fn dismiss_presented(&self) {
        self.apply(Action::DismissPresented);
    }

    /// Applies `action` now, on the calling thread. Returns whether any
    /// scope changed.
    pub fn apply(&self, action: Action<P>) -> bool {
        debug!("{} apply {:?}", self.inner.id, action);
        match action {
            Action::Push(entry) => self.mutate(|s| s.push(entry)),
            Action::PushReplacingTop(entry) => self.mutate(|s| s.push_replacing_top(entry)),
            Action::PushReplacingAll(entry) => self.mutate(|s| s.push_replacing_all(entry)),
            Action::Pop => self.mutate(RouterState::pop),
            Action::PopToRoot => self.mutate(RouterState::pop_to_root),
            Action::Present(entry) => self.mutate(|s| s.present(entry)),
            Action::PresentSheet(entry) => self.mutate(|s| s.present_sheet(entry)),
            Action::Dismiss => self.dismiss_on_parent(),
            Action::DismissToRoot => self.unwind_to_root(),
            Action::DismissPresented => self.mutate(RouterState::dismiss_presented),
        }
    }

    /// Single hop: closes the parent's overlay, sheet first. A scope
    /// without a live parent has nothing to dismiss.
    fn dismiss_on_parent(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.mutate(RouterState::dismiss_presented),
            None => {
                debug!("{} has no parent, dismiss ignored", self.inner.id);
                false
            }
        }
    }

    fn unwind_to_root(&self) -> bool {
        let mut changed = false;
        let mut current = Some(self.clone());
        let mut visited = 0;
        while let Some(scope) = current {
            if visited > MAX_SCOPE_DEPTH {
                warn!(
                    "dismiss_to_root from {} stopped after {} scopes",
                    self.inner.id, MAX_SCOPE_DEPTH
                );
                break;
            }
            changed |= scope.mutate(RouterState::reset_to_root);
            current = scope.parent();
            visited += 1;
        }
        changed
    }

    fn mutate(&self, f: impl FnOnce(&mut RouterState<P>) -> bool) -> bool {
        let mut cell = self.inner.lock();
        if !f(&mut cell.state) {
            return false;
        }
        cell.version += 1;
        self.inner.changes.send_replace(RouterSnapshot {
            version: cell.version,
            state: cell.state.clone(),
        });
        true
    }

    // ------------------------------------------------------------------------
    // Paced operations
    // ------------------------------------------------------------------------

    /// Queues `action` on this scope's serializer. Actions submitted here
    /// apply in submission order, one settle delay apart. Queued actions
    /// do not keep the scope alive.
    ///
    /// Returns `false` if the scope has been torn down.
    pub fn submit(&self, action: Action<P>) -> bool {
        let scope = self.downgrade();
        self.inner.serializer.submit(move || match scope.upgrade() {
            Some(router) => {
                router.apply(action);
            }
            None => debug!("Scope dropped before queued {:?} ran", action),
        })
    }

    /// Number of submitted actions not yet applied and settled.
    pub fn pending(&self) -> usize {
        self.inner.serializer.pending()
    }

    /// Waits until every submitted action has been applied and settled.
    pub async fn settled(&self) {
        self.inner.serializer.wait_idle().await;
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Called when the scope leaves the view hierarchy: clears its overlays
    /// so no presentation is left dangling, then abandons queued actions.
    pub fn teardown(&self) {
        self.mutate(RouterState::clear_overlays);
        self.inner.serializer.shutdown();
        info!("{} torn down", self.inner.id);
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.serializer.is_closed()
    }
}

impl<P> fmt::Debug for Router<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("id", &self.inner.id)
            .field("depth", &self.inner.depth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::Transition;
    use crate::test_support::{payloads, root_router};

    #[test]
    fn test_push_pop_scenario() {
        let router = root_router();
        router.push("a");
        router.push("b");
        router.pop();
        assert_eq!(payloads(&router), vec!["root", "a"]);

        router.pop_to_root();
        assert_eq!(payloads(&router), vec!["root"]);

        router.pop();
        assert_eq!(payloads(&router), vec!["root"]);
    }

    #[test]
    fn test_snapshot_version_counts_changes_only() {
        let router = root_router();
        router.pop(); // no-op
        assert_eq!(router.snapshot().version, 0);
        router.push("a");
        router.present_sheet("s");
        assert_eq!(router.snapshot().version, 2);
    }

    #[test]
    fn test_subscribers_see_latest_state() {
        let router = root_router();
        let mut rx = router.subscribe();
        router.push("a");
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.state.depth(), 2);

        router.pop_to_root();
        router.pop_to_root(); // second call changes nothing
        assert_eq!(rx.borrow_and_update().version, 2);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_present_sheet_replaces_full_screen() {
        let router = root_router();
        router.present("x");
        router.present_sheet("y");
        router.with_state(|s| {
            assert!(s.full_screen().is_none());
            assert_eq!(s.sheet().map(|e| *e.payload()), Some("y"));
        });
    }

    #[test]
    fn test_child_dismiss_closes_parent_sheet() {
        let parent = root_router();
        parent.present_sheet("w");
        let overlay = parent.with_state(|s| s.sheet().cloned()).unwrap();
        let child = parent.child(overlay);
        child.push("inside");
        let before = child.snapshot();

        child.dismiss();

        assert!(parent.with_state(|s| s.sheet().is_none()));
        let after = child.snapshot();
        assert_eq!(after.version, before.version);
        assert_eq!(payloads(&child), vec!["w", "inside"]);
    }

    #[test]
    fn test_dismiss_prefers_parent_sheet_and_is_single_hop() {
        let grandparent = root_router();
        grandparent.present("outer");
        let parent = grandparent.child("outer");
        let child = parent.child("inner");

        // Parent has nothing presented: no bubbling to the grandparent.
        child.dismiss();
        assert!(grandparent.with_state(|s| s.full_screen().is_some()));
    }

    #[test]
    fn test_dismiss_without_parent_is_noop() {
        let router = root_router();
        router.present("x");
        router.dismiss();
        assert!(router.with_state(|s| s.full_screen().is_some()));
    }

    #[test]
    fn test_dismiss_to_root_unwinds_every_ancestor() {
        let root = root_router();
        root.push("list");
        root.present_sheet("s1");
        let middle = root.child("s1");
        middle.push("m1");
        middle.present("f1");
        let leaf = middle.child("f1");
        leaf.push("l1");

        leaf.dismiss_to_root();

        for scope in [&root, &middle, &leaf] {
            scope.with_state(|s| {
                assert_eq!(s.depth(), 1);
                assert!(!s.has_overlay());
            });
        }
    }

    #[test]
    fn test_dismiss_presented_acts_on_self() {
        let parent = root_router();
        parent.present_sheet("p");
        let child = parent.child("p");
        child.present("c");

        child.dismiss_presented();

        assert!(!child.with_state(RouterState::has_overlay));
        assert!(parent.with_state(|s| s.sheet().is_some()));
    }

    #[test]
    fn test_child_does_not_keep_parent_alive() {
        let parent = root_router();
        let child = parent.child("c");
        assert!(child.parent().is_some());
        drop(parent);
        assert!(child.parent().is_none());
        assert_eq!(child.nesting_depth(), 1);
    }

    #[test]
    fn test_child_root_keeps_overlay_identity() {
        let parent = root_router();
        parent.present("x");
        let overlay = parent.with_state(|s| s.full_screen().cloned()).unwrap();
        let child = parent.child(overlay.clone());
        let root = child.with_state(|s| s.root().cloned()).unwrap();
        assert_eq!(root, overlay);
        assert_eq!(root.transition(), Transition::Root);
    }

    #[test]
    fn test_navigation_info() {
        let parent = root_router();
        let root_entry = parent.with_state(|s| s.root().cloned()).unwrap();
        let info = parent.navigation_info(&root_entry);
        assert!(!info.is_pushed);
        assert!(!info.is_presented);
        assert_eq!(info.presentation, Presentation::Root);

        parent.present("modal");
        let child = parent.child("modal");
        child.push("detail");
        let top = child.with_state(|s| s.top().cloned()).unwrap();
        let info = child.navigation_info(&top);
        assert!(info.is_pushed);
        assert!(info.is_presented);
        assert_eq!(info.presentation, Presentation::FullScreen);

        parent.present_sheet("sheet");
        assert_eq!(child.navigation_info(&top).presentation, Presentation::Sheet);
    }

    #[test]
    fn test_teardown_clears_overlays_and_refuses_submissions() {
        let router = root_router();
        router.present_sheet("s");
        router.teardown();
        assert!(!router.with_state(RouterState::has_overlay));
        assert!(router.is_torn_down());
        assert!(!router.submit(Action::Pop));
    }

    #[test]
    fn test_submit_with_zero_delay_applies_immediately() {
        let router = root_router();
        assert!(router.submit(Action::Push(NavigationEntry::new("a"))));
        assert_eq!(payloads(&router), vec!["root", "a"]);
        assert_eq!(router.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_paces_actions() {
        let router = Router::with_settle_delay("root", Duration::from_millis(300));
        router.submit(Action::Push(NavigationEntry::new("a")));
        router.submit(Action::Push(NavigationEntry::new("b")));
        router.submit(Action::Pop);
        assert_eq!(router.pending(), 3);

        router.settled().await;
        let names: Vec<&str> = router.with_state(|s| s.stack().iter().map(|e| *e.payload()).collect());
        assert_eq!(names, vec!["root", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_scope_skips_queued_actions() {
        let router = Router::with_settle_delay("root", Duration::from_millis(100));
        let mut rx = router.subscribe();
        router.submit(Action::Push(NavigationEntry::new("a")));
        router.submit(Action::Push(NavigationEntry::new("b")));
        tokio::task::yield_now().await;
        drop(router);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rx.borrow_and_update().version, 1);
    }
}
