//! # Navigation Entries
//!
//! A `NavigationEntry` wraps an opaque screen payload with a stable identity.
//! Two entries are equal when their ids match, nothing else is compared.
//! The payload is shared behind an `Arc`, so cloning an entry (into a
//! snapshot, a child scope, a log line) never duplicates the screen itself.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique, stable identifier of a live entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an entry reached the slot it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// First entry of a scope.
    Root,
    Push,
    /// Replaced the previous top of the stack.
    ReplaceTop,
    /// Replaced the whole stack.
    ReplaceAll,
    FullScreen,
    Sheet,
}

pub struct NavigationEntry<P> {
    id: EntryId,
    payload: Arc<P>,
    transition: Transition,
}

impl<P> NavigationEntry<P> {
    /// Wraps `payload` in a fresh entry. The transition defaults to `Push`
    /// and is re-marked by whichever operation installs the entry.
    pub fn new(payload: P) -> Self {
        Self::from_shared(Arc::new(payload))
    }

    pub fn from_shared(payload: Arc<P>) -> Self {
        Self {
            id: EntryId::new(),
            payload,
            transition: Transition::Push,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn shared_payload(&self) -> Arc<P> {
        Arc::clone(&self.payload)
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    /// True for entries installed by `push_replacing_all`.
    pub fn is_root_replacement(&self) -> bool {
        self.transition == Transition::ReplaceAll
    }

    /// Same identity and payload, new transition marker.
    pub(crate) fn marked(self, transition: Transition) -> Self {
        Self { transition, ..self }
    }
}

impl<P> From<P> for NavigationEntry<P> {
    fn from(payload: P) -> Self {
        Self::new(payload)
    }
}

// Manual impls: none of these should require anything of `P`.

impl<P> Clone for NavigationEntry<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            payload: Arc::clone(&self.payload),
            transition: self.transition,
        }
    }
}

impl<P> PartialEq for NavigationEntry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<P> Eq for NavigationEntry<P> {}

impl<P> Hash for NavigationEntry<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<P> fmt::Debug for NavigationEntry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationEntry")
            .field("id", &self.id)
            .field("transition", &self.transition)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_entries_with_equal_payloads_are_distinct() {
        let a = NavigationEntry::new("home");
        let b = NavigationEntry::new("home");
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clone_keeps_identity_and_shares_payload() {
        let a = NavigationEntry::new(String::from("detail"));
        let b = a.clone();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.shared_payload(), &b.shared_payload()));
    }

    #[test]
    fn test_hash_uses_id_only() {
        let a = NavigationEntry::new(1u32);
        let remarked = a.clone().marked(Transition::Sheet);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(remarked));
    }

    #[test]
    fn test_root_replacement_flag_follows_transition() {
        let entry = NavigationEntry::new(());
        assert_eq!(entry.transition(), Transition::Push);
        assert!(!entry.is_root_replacement());
        assert!(entry.marked(Transition::ReplaceAll).is_root_replacement());
    }

    #[test]
    fn test_from_payload() {
        let entry: NavigationEntry<&str> = "settings".into();
        assert_eq!(*entry.payload(), "settings");
    }
}
