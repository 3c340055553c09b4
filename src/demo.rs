//! # Demo Screens
//!
//! A small host-side destination type and link parser, used by the stress
//! harness and the CLI. Links look like `navstack://<screen>[/<arg>]`:
//!
//! ```text
//! navstack://home
//! navstack://inbox
//! navstack://settings
//! navstack://detail/42
//! navstack://profile/ada
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::core::deeplink::LinkParser;

pub const LINK_SCHEME: &str = "navstack";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Home,
    Inbox,
    Settings,
    Detail { id: u32 },
    Profile { user: String },
    /// Generated by the stress harness, numbered by step.
    Step { step: usize },
}

impl Screen {
    /// Parses a `navstack://` link. Anything else, including unknown
    /// screens or malformed arguments, yields `None`.
    pub fn from_link(raw: &str) -> Option<Screen> {
        let url = Url::parse(raw).ok()?;
        if url.scheme() != LINK_SCHEME {
            return None;
        }
        let arg = url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|segment| !segment.is_empty());

        match (url.host_str()?, arg) {
            ("home", None) => Some(Screen::Home),
            ("inbox", None) => Some(Screen::Inbox),
            ("settings", None) => Some(Screen::Settings),
            ("detail", Some(id)) => id.parse().ok().map(|id| Screen::Detail { id }),
            ("profile", Some(user)) => Some(Screen::Profile {
                user: user.to_string(),
            }),
            _ => None,
        }
    }

    pub fn link(&self) -> String {
        match self {
            Screen::Home => format!("{LINK_SCHEME}://home"),
            Screen::Inbox => format!("{LINK_SCHEME}://inbox"),
            Screen::Settings => format!("{LINK_SCHEME}://settings"),
            Screen::Detail { id } => format!("{LINK_SCHEME}://detail/{id}"),
            Screen::Profile { user } => format!("{LINK_SCHEME}://profile/{user}"),
            Screen::Step { step } => format!("{LINK_SCHEME}://step/{step}"),
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Home => f.write_str("Home"),
            Screen::Inbox => f.write_str("Inbox"),
            Screen::Settings => f.write_str("Settings"),
            Screen::Detail { id } => write!(f, "Detail #{id}"),
            Screen::Profile { user } => write!(f, "Profile @{user}"),
            Screen::Step { step } => write!(f, "Step {step}"),
        }
    }
}

pub fn link_parser() -> Arc<dyn LinkParser<Screen>> {
    Arc::new(Screen::from_link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_known_screens() {
        assert_eq!(Screen::from_link("navstack://home"), Some(Screen::Home));
        assert_eq!(Screen::from_link("navstack://inbox/"), Some(Screen::Inbox));
        assert_eq!(
            Screen::from_link("navstack://detail/42"),
            Some(Screen::Detail { id: 42 })
        );
        assert_eq!(
            Screen::from_link("navstack://profile/ada"),
            Some(Screen::Profile {
                user: "ada".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_unsupported_links() {
        assert_eq!(Screen::from_link("https://home"), None);
        assert_eq!(Screen::from_link("navstack://detail/abc"), None);
        assert_eq!(Screen::from_link("navstack://detail"), None);
        assert_eq!(Screen::from_link("navstack://unknown"), None);
        assert_eq!(Screen::from_link("not a url"), None);
        // Step screens are harness-internal and never reachable by link.
        assert_eq!(Screen::from_link("navstack://step/3"), None);
    }

    #[test]
    fn test_link_round_trips_for_public_screens() {
        for screen in [
            Screen::Home,
            Screen::Settings,
            Screen::Detail { id: 7 },
            Screen::Profile {
                user: "grace".to_string(),
            },
        ] {
            assert_eq!(Screen::from_link(&screen.link()), Some(screen));
        }
    }

    #[test]
    fn test_parser_trait_object() {
        let parser = link_parser();
        assert_eq!(parser.parse("navstack://inbox"), Some(Screen::Inbox));
    }
}
