//! # Core Navigation Logic
//!
//! This module contains navstack's state machine and delivery queue.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • RouterState (stack)  │
//!                    │  • Action (requests)    │
//!                    │  • Router (scope handle)│
//!                    │  • ScopeRegistry        │
//!                    │  • DeepLinkDispatcher   │
//!                    │                         │
//!                    │  No rendering. No I/O.  │
//!                    └───────────┬─────────────┘
//!                                │ watch snapshots
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │  Stress    │      │  Native UI │      │    Web     │
//!     │  harness   │      │  adapter   │      │  adapter   │
//!     │ (headless) │      │  (future)  │      │  (future)  │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`entry`]: `NavigationEntry`, an identified wrapper around a screen payload
//! - [`state`]: `RouterState`, the stack and overlay slots of one scope
//! - [`action`]: `Action`, everything a UI can ask a scope to do
//! - [`scope`]: `Router`, the shared handle with parent links and observers
//! - [`serializer`]: `OperationSerializer`, paced in-order application
//! - [`registry`]: `ScopeRegistry`, which scope is frontmost
//! - [`deeplink`]: `DeepLinkDispatcher`, deferred link delivery
//! - [`navigator`]: `Navigator`, the lifecycle hooks tying it together
//! - [`info`]: `NavigationInfo`, how a given entry is being shown
//! - [`config`]: layered configuration (defaults, file, env, CLI)

pub mod action;
pub mod config;
pub mod deeplink;
pub mod entry;
pub mod info;
pub mod navigator;
pub mod registry;
pub mod scope;
pub mod serializer;
pub mod state;

// Re-export commonly used types for convenience
pub use action::Action;
pub use deeplink::{DeepLinkDispatcher, DeliveryStyle, LinkParser};
pub use entry::{EntryId, NavigationEntry, Transition};
pub use info::{NavigationInfo, Presentation};
pub use navigator::{Navigator, NavigatorOptions};
pub use registry::ScopeRegistry;
pub use scope::{Router, RouterSnapshot, ScopeId, WeakRouter};
pub use serializer::OperationSerializer;
pub use state::{OverlayKind, RouterState};
