//! # Stress Harness
//!
//! Drives a `Navigator` the way a hurried user would, with nobody watching
//! the screen. The harness plays the UI layer: whenever a scope shows an
//! overlay it creates and registers a child scope for it, and whenever the
//! overlay goes away the child disappears again.
//!
//! ```text
//! pick action ─► top.submit() ─► top.settled() ─► sync presentations ─► check invariants
//!      ▲                                                                     │
//!      └─────────────────────────────── next step ◄──────────────────────────┘
//! ```
//!
//! Every step checks that no stack is empty, that no scope shows a sheet and
//! a full-screen overlay at once, and that the registry's topmost scope is
//! the innermost presented one.

use log::{debug, info, warn};
use serde::Serialize;
use tokio::time::Instant;

use crate::core::action::Action;
use crate::core::config::ResolvedConfig;
use crate::core::entry::{EntryId, NavigationEntry};
use crate::core::navigator::{Navigator, NavigatorOptions};
use crate::core::scope::Router;
use crate::demo::{Screen, link_parser};

pub use crate::core::config::StressMode;

#[derive(Debug, Default, Clone, Serialize)]
pub struct StressReport {
    pub mode: StressMode,
    pub seed: u64,
    pub operations: usize,
    pub pushes: usize,
    pub pops: usize,
    pub sheets: usize,
    pub full_screens: usize,
    pub dismissals: usize,
    pub resets: usize,
    pub links_enqueued: usize,
    pub links_delivered: usize,
    pub links_dropped: usize,
    pub scopes_created: usize,
    pub max_stack_depth: usize,
    pub max_nesting: usize,
    pub violations: Vec<String>,
    pub elapsed_ms: u128,
}

impl StressReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    fn record(&mut self, action: &Action<Screen>) {
        self.operations += 1;
        match action {
            Action::Push(_) | Action::PushReplacingTop(_) | Action::PushReplacingAll(_) => {
                self.pushes += 1
            }
            Action::Pop => self.pops += 1,
            Action::PresentSheet(_) => self.sheets += 1,
            Action::Present(_) => self.full_screens += 1,
            Action::Dismiss | Action::DismissPresented => self.dismissals += 1,
            Action::PopToRoot | Action::DismissToRoot => self.resets += 1,
        }
    }
}

/// A scope the harness created for an overlay.
struct Layer {
    scope: Router<Screen>,
    /// The overlay entry on the parent scope this layer shows.
    presented_for: EntryId,
}

pub struct StressHarness {
    navigator: Navigator<Screen>,
    root: Router<Screen>,
    /// Presented scopes, outermost first. `layers[i]` was presented by
    /// the scope at level `i` (level 0 is `root`).
    layers: Vec<Layer>,
    rng: fastrand::Rng,
    max_depth: usize,
    steps: usize,
    report: StressReport,
}

impl StressHarness {
    pub fn new(config: &ResolvedConfig) -> Self {
        let navigator = Navigator::new(link_parser(), NavigatorOptions::from(config));
        let root = navigator.root_scope(Screen::Home);
        let seed = config.stress_seed.unwrap_or_else(|| fastrand::u64(..));
        Self {
            navigator,
            root,
            layers: Vec::new(),
            rng: fastrand::Rng::with_seed(seed),
            max_depth: config.stress_max_depth,
            steps: config.stress_operations,
            report: StressReport {
                mode: config.stress_mode,
                seed,
                ..Default::default()
            },
        }
    }

    pub fn navigator(&self) -> &Navigator<Screen> {
        &self.navigator
    }

    /// Queues a link as if it arrived before the app was ready.
    pub fn enqueue_link(&mut self, raw: &str) {
        self.navigator.enqueue_link(raw);
        self.report.links_enqueued += 1;
    }

    pub async fn run(mut self) -> StressReport {
        let started = Instant::now();
        info!(
            "Stress run: mode={:?} steps={} max_depth={} seed={}",
            self.report.mode, self.steps, self.max_depth, self.report.seed
        );

        self.navigator.scope_did_appear(&self.root);
        self.navigator.notify_scope_available();
        self.root.settled().await;
        self.sync_presentations();

        for step in 0..self.steps {
            match self.next_action(step) {
                Some(action) => self.perform(action).await,
                None => self.send_link(step).await,
            }
            self.check_invariants(step);
        }

        // Leave everything the way the app started.
        self.perform(Action::DismissToRoot).await;
        self.check_invariants(self.steps);

        self.report.links_delivered = self.navigator.links().delivered_total();
        self.report.links_dropped = self.navigator.links().dropped_total();
        self.report.elapsed_ms = started.elapsed().as_millis();
        if self.report.is_clean() {
            info!("Stress run finished cleanly after {} operations", self.report.operations);
        } else {
            warn!("Stress run found {} violations", self.report.violations.len());
        }
        self.report
    }

    fn top(&self) -> &Router<Screen> {
        self.layers.last().map_or(&self.root, |layer| &layer.scope)
    }

    fn scope_at(&self, level: usize) -> Option<&Router<Screen>> {
        match level {
            0 => Some(&self.root),
            n => self.layers.get(n - 1).map(|layer| &layer.scope),
        }
    }

    /// `None` means "send a deep link" instead of a scope action.
    fn next_action(&mut self, step: usize) -> Option<Action<Screen>> {
        let top = self.top().clone();
        let depth = top.with_state(|s| s.depth());
        let nesting = self.layers.len();
        let screen = NavigationEntry::new(Screen::Step { step });

        let action = match self.report.mode {
            StressMode::Navigation if depth < self.max_depth => Action::Push(screen),
            StressMode::Navigation => Action::PopToRoot,
            StressMode::Sheet if nesting < self.max_depth => Action::PresentSheet(screen),
            StressMode::FullScreen if nesting < self.max_depth => Action::Present(screen),
            StressMode::Sheet | StressMode::FullScreen => Action::DismissToRoot,
            StressMode::Mixed => match self.rng.u8(0..5) {
                0 if depth < self.max_depth => Action::Push(screen),
                1 if nesting < self.max_depth => Action::PresentSheet(screen),
                2 if nesting < self.max_depth => Action::Present(screen),
                4 => return None,
                _ => {
                    let shown = top.with_state(|s| s.top().cloned());
                    let is_pushed = shown.is_some_and(|entry| top.navigation_info(&entry).is_pushed);
                    if is_pushed { Action::Pop } else { Action::Dismiss }
                }
            },
        };
        Some(action)
    }

    async fn perform(&mut self, action: Action<Screen>) {
        let top = self.top().clone();
        self.report.record(&action);
        debug!("Step on {}: {:?}", top.id(), action);
        if !top.submit(action) {
            self.report
                .violations
                .push(format!("{} refused an action while on screen", top.id()));
        }
        top.settled().await;
        self.sync_presentations();
    }

    async fn send_link(&mut self, step: usize) {
        // Every third link is malformed and must be dropped.
        let link = if step % 3 == 0 {
            format!("navstack://detail/not-a-number-{step}")
        } else {
            Screen::Detail { id: step as u32 }.link()
        };
        self.enqueue_link(&link);
        self.navigator.notify_scope_available();
        // Delivered links queue behind the scope's own actions.
        self.top().clone().settled().await;
        self.sync_presentations();
    }

    /// Makes the layer list mirror the overlays currently set, the way a
    /// UI framework would mount and unmount presented screens.
    fn sync_presentations(&mut self) {
        let mut level = 0;
        while let Some(scope) = self.scope_at(level).cloned() {
            let overlay = scope.with_state(|s| s.overlay().map(|(_, entry)| entry.clone()));
            let shown = self.layers.get(level).map(|layer| layer.presented_for);
            if overlay.as_ref().map(NavigationEntry::id) != shown {
                self.close_layers_from(level);
                if let Some(entry) = overlay {
                    let presented_for = entry.id();
                    let child = scope.child(entry);
                    self.navigator.scope_did_appear(&child);
                    self.report.scopes_created += 1;
                    self.layers.push(Layer {
                        scope: child,
                        presented_for,
                    });
                }
            }
            level += 1;
        }
        self.report.max_nesting = self.report.max_nesting.max(self.layers.len());
    }

    fn close_layers_from(&mut self, level: usize) {
        while self.layers.len() > level {
            if let Some(layer) = self.layers.pop() {
                self.navigator.scope_did_disappear(&layer.scope);
            }
        }
    }

    fn check_invariants(&mut self, step: usize) {
        let mut level = 0;
        while let Some(scope) = self.scope_at(level).cloned() {
            let (depth, both_overlays) =
                scope.with_state(|s| (s.depth(), s.sheet().is_some() && s.full_screen().is_some()));
            if depth == 0 {
                self.report
                    .violations
                    .push(format!("step {step}: {} has an empty stack", scope.id()));
            }
            if both_overlays {
                self.report
                    .violations
                    .push(format!("step {step}: {} shows a sheet and a full-screen overlay", scope.id()));
            }
            self.report.max_stack_depth = self.report.max_stack_depth.max(depth);
            level += 1;
        }

        let top = self.top().clone();
        let topmost_matches = self
            .navigator
            .topmost()
            .is_some_and(|topmost| topmost.ptr_eq(&top));
        if !topmost_matches {
            self.report
                .violations
                .push(format!("step {step}: registry topmost is not {}", top.id()));
        }
    }
}

/// Runs one stress session. `links` are queued before the root scope
/// appears and are delivered once it does.
pub async fn run(config: &ResolvedConfig, links: &[String]) -> StressReport {
    let mut harness = StressHarness::new(config);
    for link in links {
        harness.enqueue_link(link);
    }
    harness.run().await
}
