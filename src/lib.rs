//! navstack library exports

pub mod core;
pub mod demo;
pub mod stress;

#[cfg(test)]
pub mod test_support;

pub use crate::core::{Action, NavigationEntry, Navigator, Router, ScopeRegistry};
