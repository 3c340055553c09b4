//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;

use crate::core::deeplink::LinkParser;
use crate::core::scope::Router;

/// A top-level scope rooted at `"root"` with no settle delay.
pub fn root_router() -> Router<&'static str> {
    Router::new("root")
}

/// The payloads on a scope's stack, root first.
pub fn payloads(router: &Router<&'static str>) -> Vec<&'static str> {
    router.with_state(|s| s.stack().iter().map(|e| *e.payload()).collect())
}

/// Accepts `app://<name>` and yields `<name>`; rejects everything else.
pub fn static_parser() -> Arc<dyn LinkParser<&'static str>> {
    Arc::new(|raw: &str| {
        let name = raw.strip_prefix("app://")?;
        if name.is_empty() {
            return None;
        }
        // Leaked so payloads can stay `&'static str` like the rest of the tests.
        Some(&*Box::leak(name.to_string().into_boxed_str()))
    })
}
