//! # Actions
//!
//! Everything a UI can ask a scope to do becomes an `Action`.
//! User taps a row? That's `Action::Push(entry)`.
//! Close button on a sheet? That's `Action::Dismiss`.
//!
//! `Router::apply()` runs an action immediately; `Router::submit()` hands
//! it to the scope's serializer so bursts are applied one at a time.
//!
//! ```text
//! Router + Action  →  apply()  →  new RouterState  →  watch snapshot
//! ```

use std::fmt;

use crate::core::entry::NavigationEntry;

pub enum Action<P> {
    Push(NavigationEntry<P>),
    PushReplacingTop(NavigationEntry<P>),
    PushReplacingAll(NavigationEntry<P>),
    Pop,
    PopToRoot,
    /// Full-screen overlay.
    Present(NavigationEntry<P>),
    PresentSheet(NavigationEntry<P>),
    /// Closes the overlay on the parent scope that presented this one.
    Dismiss,
    /// Resets every scope from this one up to the outermost ancestor.
    DismissToRoot,
    /// Closes this scope's own overlay.
    DismissPresented,
}

impl<P> Action<P> {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Push(_) => "push",
            Action::PushReplacingTop(_) => "push_replacing_top",
            Action::PushReplacingAll(_) => "push_replacing_all",
            Action::Pop => "pop",
            Action::PopToRoot => "pop_to_root",
            Action::Present(_) => "present",
            Action::PresentSheet(_) => "present_sheet",
            Action::Dismiss => "dismiss",
            Action::DismissToRoot => "dismiss_to_root",
            Action::DismissPresented => "dismiss_presented",
        }
    }

    pub fn entry(&self) -> Option<&NavigationEntry<P>> {
        match self {
            Action::Push(e)
            | Action::PushReplacingTop(e)
            | Action::PushReplacingAll(e)
            | Action::Present(e)
            | Action::PresentSheet(e) => Some(e),
            _ => None,
        }
    }
}

impl<P> fmt::Debug for Action<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry() {
            Some(entry) => write!(f, "{}({})", self.name(), entry.id()),
            None => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_includes_entry_id() {
        let entry = NavigationEntry::new("detail");
        let id = entry.id();
        let action = Action::Push(entry);
        assert_eq!(format!("{:?}", action), format!("push({id})"));
        assert_eq!(format!("{:?}", Action::<&str>::Pop), "pop");
    }

    #[test]
    fn test_entry_only_for_carrying_actions() {
        assert!(Action::PresentSheet(NavigationEntry::new(1)).entry().is_some());
        assert!(Action::<i32>::DismissToRoot.entry().is_none());
    }
}
