//! # Router State
//!
//! The navigation state of a single scope. Domain logic only: no locking,
//! no parent links, no notifications. Those live on the `Router` handle.
//!
//! ```text
//! RouterState
//! ├── stack: Vec<NavigationEntry>         // push stack, root at index 0
//! ├── sheet: Option<NavigationEntry>      // sheet overlay
//! └── full_screen: Option<NavigationEntry> // full-screen overlay
//! ```
//!
//! Invariants held by every method:
//! - `stack` is never empty.
//! - `sheet` and `full_screen` are never both set.
//!
//! Mutators return `true` when something changed, so the caller knows
//! whether observers need a new snapshot. None of them can fail; invalid
//! requests (popping the root, dismissing nothing) are no-ops.

use std::fmt;

use serde::Serialize;

use crate::core::entry::{NavigationEntry, Transition};

/// Which overlay slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Sheet,
    FullScreen,
}

pub struct RouterState<P> {
    stack: Vec<NavigationEntry<P>>,
    sheet: Option<NavigationEntry<P>>,
    full_screen: Option<NavigationEntry<P>>,
}

impl<P> RouterState<P> {
    pub fn new(root: NavigationEntry<P>) -> Self {
        Self {
            stack: vec![root.marked(Transition::Root)],
            sheet: None,
            full_screen: None,
        }
    }

    pub fn stack(&self) -> &[NavigationEntry<P>] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn root(&self) -> Option<&NavigationEntry<P>> {
        self.stack.first()
    }

    pub fn top(&self) -> Option<&NavigationEntry<P>> {
        self.stack.last()
    }

    pub fn sheet(&self) -> Option<&NavigationEntry<P>> {
        self.sheet.as_ref()
    }

    pub fn full_screen(&self) -> Option<&NavigationEntry<P>> {
        self.full_screen.as_ref()
    }

    /// The occupied overlay slot, sheet first.
    pub fn overlay(&self) -> Option<(OverlayKind, &NavigationEntry<P>)> {
        self.sheet
            .as_ref()
            .map(|e| (OverlayKind::Sheet, e))
            .or_else(|| self.full_screen.as_ref().map(|e| (OverlayKind::FullScreen, e)))
    }

    pub fn has_overlay(&self) -> bool {
        self.sheet.is_some() || self.full_screen.is_some()
    }

    pub fn contains(&self, entry: &NavigationEntry<P>) -> bool {
        self.stack.contains(entry)
    }

    // ------------------------------------------------------------------------
    // Stack
    // ------------------------------------------------------------------------

    pub fn push(&mut self, entry: NavigationEntry<P>) -> bool {
        self.stack.push(entry.marked(Transition::Push));
        true
    }

    pub fn push_replacing_top(&mut self, entry: NavigationEntry<P>) -> bool {
        self.stack.pop();
        self.stack.push(entry.marked(Transition::ReplaceTop));
        true
    }

    pub fn push_replacing_all(&mut self, entry: NavigationEntry<P>) -> bool {
        self.stack.clear();
        self.stack.push(entry.marked(Transition::ReplaceAll));
        true
    }

    /// Removes the top entry unless it is the root.
    pub fn pop(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.pop();
            true
        } else {
            false
        }
    }

    pub fn pop_to_root(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.truncate(1);
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------------
    // Overlays
    // ------------------------------------------------------------------------

    pub fn present(&mut self, entry: NavigationEntry<P>) -> bool {
        self.sheet = None;
        self.full_screen = Some(entry.marked(Transition::FullScreen));
        true
    }

    pub fn present_sheet(&mut self, entry: NavigationEntry<P>) -> bool {
        self.full_screen = None;
        self.sheet = Some(entry.marked(Transition::Sheet));
        true
    }

    /// Clears whichever overlay is set, sheet first.
    pub fn dismiss_presented(&mut self) -> bool {
        if self.sheet.take().is_some() {
            return true;
        }
        self.full_screen.take().is_some()
    }

    pub fn clear_overlays(&mut self) -> bool {
        let had_sheet = self.sheet.take().is_some();
        let had_full_screen = self.full_screen.take().is_some();
        had_sheet || had_full_screen
    }

    /// Clears both overlays and truncates the stack to its root.
    pub fn reset_to_root(&mut self) -> bool {
        let cleared = self.clear_overlays();
        let popped = self.pop_to_root();
        cleared || popped
    }
}

impl<P> Clone for RouterState<P> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            sheet: self.sheet.clone(),
            full_screen: self.full_screen.clone(),
        }
    }
}

impl<P> fmt::Debug for RouterState<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterState")
            .field("stack", &self.stack)
            .field("sheet", &self.sheet)
            .field("full_screen", &self.full_screen)
            .finish()
    }
}
