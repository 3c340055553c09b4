//! # Navigator
//!
//! One per app instance. Wires the registry and the deep-link dispatcher
//! together and exposes the hooks the UI layer calls:
//!
//! | UI event                    | Navigator call               |
//! |-----------------------------|------------------------------|
//! | scope enters the hierarchy  | `scope_did_appear`           |
//! | scope leaves the hierarchy  | `scope_did_disappear`        |
//! | URL opened / notification   | `enqueue_link`               |
//! | login / onboarding finished | `notify_scope_available`     |

use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::task::AbortHandle;

use crate::core::config::ResolvedConfig;
use crate::core::deeplink::{DeepLinkDispatcher, DeliveryStyle, LinkParser};
use crate::core::entry::NavigationEntry;
use crate::core::registry::ScopeRegistry;
use crate::core::scope::Router;

/// The subset of configuration the navigator itself needs.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorOptions {
    pub settle_delay: Duration,
    /// Zero disables the background sweep.
    pub sweep_interval: Duration,
    pub delivery: DeliveryStyle,
    /// Attempt deep-link delivery whenever a scope appears, instead of
    /// waiting for `notify_scope_available`.
    pub deliver_on_appear: bool,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            sweep_interval: Duration::ZERO,
            delivery: DeliveryStyle::default(),
            deliver_on_appear: false,
        }
    }
}

impl From<&ResolvedConfig> for NavigatorOptions {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            settle_delay: config.settle_delay,
            sweep_interval: config.sweep_interval,
            delivery: config.delivery,
            deliver_on_appear: config.deliver_on_appear,
        }
    }
}

pub struct Navigator<P> {
    registry: Arc<ScopeRegistry<P>>,
    links: DeepLinkDispatcher<P>,
    options: NavigatorOptions,
    sweeper: Option<AbortHandle>,
}

impl<P: Send + Sync + 'static> Navigator<P> {
    pub fn new(parser: Arc<dyn LinkParser<P>>, options: NavigatorOptions) -> Self {
        let registry = Arc::new(ScopeRegistry::new());
        let sweeper = registry.spawn_sweeper(options.sweep_interval);
        let links = DeepLinkDispatcher::with_style(Arc::clone(&registry), parser, options.delivery);
        Self {
            registry,
            links,
            options,
            sweeper,
        }
    }

    pub fn options(&self) -> &NavigatorOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<ScopeRegistry<P>> {
        &self.registry
    }

    pub fn links(&self) -> &DeepLinkDispatcher<P> {
        &self.links
    }

    /// Creates a top-level scope paced with the configured settle delay.
    /// It is not registered until the UI reports it on screen.
    pub fn root_scope(&self, root: impl Into<NavigationEntry<P>>) -> Router<P> {
        Router::with_settle_delay(root, self.options.settle_delay)
    }

    pub fn topmost(&self) -> Option<Router<P>> {
        self.registry.topmost()
    }

    pub fn scope_did_appear(&self, scope: &Router<P>) {
        if self.registry.register(scope) {
            info!("{} appeared", scope.id());
        }
        if self.options.deliver_on_appear {
            self.links.attempt_delivery();
        }
    }

    pub fn scope_did_disappear(&self, scope: &Router<P>) {
        scope.teardown();
        self.registry.unregister(scope);
        info!("{} disappeared", scope.id());
    }

    pub fn enqueue_link(&self, descriptor: &str) {
        self.links.enqueue(descriptor);
    }

    /// Retries delivery of queued links. Returns how many were delivered.
    pub fn notify_scope_available(&self) -> usize {
        self.links.attempt_delivery()
    }

    pub fn pending_links(&self) -> usize {
        self.links.pending_len()
    }
}

impl<P> Drop for Navigator<P> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::RouterState;
    use crate::test_support::{payloads, static_parser};

    fn navigator(options: NavigatorOptions) -> Navigator<&'static str> {
        Navigator::new(static_parser(), options)
    }

    #[test]
    fn test_links_wait_for_explicit_notification() {
        let nav = navigator(NavigatorOptions::default());
        nav.enqueue_link("app://inbox");
        let root = nav.root_scope("home");

        nav.scope_did_appear(&root);
        assert_eq!(nav.pending_links(), 1);

        assert_eq!(nav.notify_scope_available(), 1);
        assert_eq!(payloads(&root), vec!["home", "inbox"]);
    }

    #[test]
    fn test_deliver_on_appear() {
        let nav = navigator(NavigatorOptions {
            deliver_on_appear: true,
            ..Default::default()
        });
        nav.enqueue_link("app://inbox");
        let root = nav.root_scope("home");
        nav.scope_did_appear(&root);
        assert_eq!(nav.pending_links(), 0);
        assert_eq!(payloads(&root), vec!["home", "inbox"]);
    }

    #[test]
    fn test_disappear_clears_overlays_and_unregisters() {
        let nav = navigator(NavigatorOptions::default());
        let root = nav.root_scope("home");
        nav.scope_did_appear(&root);
        root.present_sheet("compose");
        let child = root.child("compose");
        nav.scope_did_appear(&child);
        child.present("camera");
        assert!(nav.topmost().unwrap().ptr_eq(&child));

        nav.scope_did_disappear(&child);

        assert!(!child.with_state(RouterState::has_overlay));
        assert!(child.is_torn_down());
        assert!(nav.topmost().unwrap().ptr_eq(&root));
    }

    #[test]
    fn test_options_from_resolved_config() {
        let config = crate::core::config::resolve(
            &Default::default(),
            &Default::default(),
            &mut Default::default(),
        );
        let options = NavigatorOptions::from(&config);
        assert_eq!(options.delivery, config.delivery);
        assert_eq!(options.settle_delay, config.settle_delay);
    }
}
