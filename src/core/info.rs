//! Per-entry presentation details for the rendering layer.

use serde::Serialize;

/// How the scope showing an entry was itself presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Top-level scope.
    Root,
    FullScreen,
    Sheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationInfo {
    /// The entry sits above its scope's root.
    pub is_pushed: bool,
    /// The scope's parent currently has an overlay up.
    pub is_presented: bool,
    pub presentation: Presentation,
}

impl NavigationInfo {
    /// Whether a "back" control should pop rather than dismiss.
    pub fn prefers_pop(&self) -> bool {
        self.is_pushed || !self.is_presented
    }
}
