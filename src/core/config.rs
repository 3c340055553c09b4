//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.navstack/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::Level;
use serde::{Deserialize, Serialize};
use simplelog::LevelFilter;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::deeplink::DeliveryStyle;
use crate::core::registry::DEFAULT_SWEEP_INTERVAL;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NavConfig {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub deep_link: DeepLinkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub stress: StressConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RouterConfig {
    pub settle_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// 0 disables the background sweep.
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DeepLinkConfig {
    pub delivery: Option<DeliveryStyle>,
    pub deliver_on_appear: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StressConfig {
    pub mode: Option<StressMode>,
    pub operations: Option<usize>,
    pub max_depth: Option<usize>,
    pub seed: Option<u64>,
}

/// Scenario the stress harness drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StressMode {
    /// Push until the stack is `max_depth` deep, then pop to root.
    Navigation,
    /// Nest sheets `max_depth` deep, then dismiss to root.
    Sheet,
    /// Nest full-screen overlays `max_depth` deep, then dismiss to root.
    FullScreen,
    /// Random pushes, presentations, pops, dismissals and deep links.
    #[default]
    Mixed,
}

/// Values passed on the command line. `None` = flag not given.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub settle_delay_ms: Option<u64>,
    pub delivery: Option<DeliveryStyle>,
    pub mode: Option<StressMode>,
    pub operations: Option<usize>,
    pub max_depth: Option<usize>,
    pub seed: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SETTLE_DELAY_MS: u64 = 0;
pub const DEFAULT_LOG_FILE: &str = "navstack.log";
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;
pub const DEFAULT_STRESS_OPERATIONS: usize = 100;
pub const DEFAULT_STRESS_MAX_DEPTH: usize = 20;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub settle_delay: Duration,
    pub sweep_interval: Duration,
    pub delivery: DeliveryStyle,
    pub deliver_on_appear: bool,
    pub log_level: LevelFilter,
    pub log_file: String,
    pub stress_mode: StressMode,
    pub stress_operations: usize,
    pub stress_max_depth: usize,
    /// `None` = pick a fresh seed per run.
    pub stress_seed: Option<u64>,
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Messages raised while loading and resolving config. The logger's level
/// and file come from the config itself, so these are held until `replay`
/// is called after the logger is installed.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<(Level, String)>,
}

impl Diagnostics {
    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        self.entries.push((level, message.into()));
    }

    pub fn entries(&self) -> &[(Level, String)] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(level, _)| *level <= Level::Warn)
            .map(|(_, message)| message.as_str())
    }

    /// Emits every held message through the `log` facade, in order.
    pub fn replay(&self) {
        for (level, message) in &self.entries {
            log::log!(*level, "{}", message);
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.navstack/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".navstack").join("config.toml"))
}

/// Load config from `~/.navstack/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `NavConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config(diagnostics: &mut Diagnostics) -> Result<NavConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            diagnostics.push(Level::Warn, "Could not determine home directory, using default config");
            return Ok(NavConfig::default());
        }
    };

    if !path.exists() {
        diagnostics.push(
            Level::Info,
            format!("No config file found, generating default at {}", path.display()),
        );
        generate_default_config(&path, diagnostics);
        return Ok(NavConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: NavConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    diagnostics.push(Level::Info, format!("Loaded config from {}", path.display()));
    diagnostics.push(Level::Debug, format!("Config: {:?}", config));
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf, diagnostics: &mut Diagnostics) {
    let default_content = r#"# navstack configuration
# All settings are optional, defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [router]
# settle_delay_ms = 0                # Pause between serialized actions (NAVSTACK_SETTLE_DELAY_MS)

# [registry]
# sweep_interval_secs = 5            # Background purge of dead scopes, 0 disables

# [deep_link]
# delivery = "push"                  # "push", "present" or "sheet" (NAVSTACK_DELIVERY)
# deliver_on_appear = false          # Deliver queued links as soon as a scope appears

# [logging]
# level = "debug"                    # "off", "error", "warn", "info", "debug", "trace"
# file = "navstack.log"

# [stress]
# mode = "mixed"                     # "navigation", "sheet", "full_screen", "mixed"
# operations = 100
# max_depth = 20
# seed = 42
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            diagnostics.push(Level::Warn, format!("Failed to create config directory: {}", e));
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        diagnostics.push(Level::Warn, format!("Failed to write default config: {}", e));
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn env_parse<T: std::str::FromStr>(key: &str, diagnostics: &mut Diagnostics) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            diagnostics.push(Level::Warn, format!("Ignoring unparseable {}={}", key, raw));
            None
        }
    }
}

fn parse_delivery(raw: &str, diagnostics: &mut Diagnostics) -> Option<DeliveryStyle> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "push" => Some(DeliveryStyle::Push),
        "present" | "full_screen" => Some(DeliveryStyle::Present),
        "sheet" => Some(DeliveryStyle::Sheet),
        other => {
            diagnostics.push(Level::Warn, format!("Unknown delivery style {:?}, ignoring", other));
            None
        }
    }
}

fn parse_level(raw: &str, diagnostics: &mut Diagnostics) -> Option<LevelFilter> {
    match raw.parse::<LevelFilter>() {
        Ok(level) => Some(level),
        Err(_) => {
            diagnostics.push(Level::Warn, format!("Unknown log level {:?}, ignoring", raw));
            None
        }
    }
}

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(
    config: &NavConfig,
    cli: &CliOverrides,
    diagnostics: &mut Diagnostics,
) -> ResolvedConfig {
    // Settle delay: CLI → env → config → default
    let settle_delay_ms = cli
        .settle_delay_ms
        .or_else(|| env_parse("NAVSTACK_SETTLE_DELAY_MS", diagnostics))
        .or(config.router.settle_delay_ms)
        .unwrap_or(DEFAULT_SETTLE_DELAY_MS);

    // Sweep interval: env → config → default
    let sweep_interval = env_parse("NAVSTACK_SWEEP_INTERVAL_SECS", diagnostics)
        .or(config.registry.sweep_interval_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_SWEEP_INTERVAL);

    // Delivery: CLI → env → config → default
    let delivery = cli
        .delivery
        .or_else(|| {
            std::env::var("NAVSTACK_DELIVERY")
                .ok()
                .and_then(|raw| parse_delivery(&raw, diagnostics))
        })
        .or(config.deep_link.delivery)
        .unwrap_or_default();

    // Log level: env → config → default
    let log_level = std::env::var("NAVSTACK_LOG_LEVEL")
        .ok()
        .or_else(|| config.logging.level.clone())
        .and_then(|raw| parse_level(&raw, diagnostics))
        .unwrap_or(DEFAULT_LOG_LEVEL);

    ResolvedConfig {
        settle_delay: Duration::from_millis(settle_delay_ms),
        sweep_interval,
        delivery,
        deliver_on_appear: config.deep_link.deliver_on_appear.unwrap_or(false),
        log_level,
        log_file: config
            .logging
            .file
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
        stress_mode: cli.mode.or(config.stress.mode).unwrap_or_default(),
        stress_operations: cli
            .operations
            .or(config.stress.operations)
            .unwrap_or(DEFAULT_STRESS_OPERATIONS),
        stress_max_depth: cli
            .max_depth
            .or(config.stress.max_depth)
            .unwrap_or(DEFAULT_STRESS_MAX_DEPTH)
            .max(1),
        stress_seed: cli.seed.or(config.stress.seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = NavConfig::default();
        assert!(config.router.settle_delay_ms.is_none());
        assert!(config.deep_link.delivery.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let config = NavConfig::default();
        let resolved = resolve(&config, &CliOverrides::default(), &mut Diagnostics::default());
        assert_eq!(resolved.stress_operations, DEFAULT_STRESS_OPERATIONS);
        assert_eq!(resolved.stress_max_depth, DEFAULT_STRESS_MAX_DEPTH);
        assert_eq!(resolved.stress_mode, StressMode::Mixed);
        assert_eq!(resolved.log_file, DEFAULT_LOG_FILE);
        assert!(!resolved.deliver_on_appear);
        assert!(resolved.stress_seed.is_none());
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = NavConfig {
            deep_link: DeepLinkConfig {
                deliver_on_appear: Some(true),
                ..Default::default()
            },
            logging: LoggingConfig {
                level: None,
                file: Some("/tmp/nav.log".to_string()),
            },
            stress: StressConfig {
                mode: Some(StressMode::Sheet),
                operations: Some(12),
                max_depth: Some(4),
                seed: Some(7),
            },
            ..Default::default()
        };
        let resolved = resolve(&config, &CliOverrides::default(), &mut Diagnostics::default());
        assert!(resolved.deliver_on_appear);
        assert_eq!(resolved.log_file, "/tmp/nav.log");
        assert_eq!(resolved.stress_mode, StressMode::Sheet);
        assert_eq!(resolved.stress_operations, 12);
        assert_eq!(resolved.stress_max_depth, 4);
        assert_eq!(resolved.stress_seed, Some(7));
    }

    #[test]
    fn test_resolve_cli_wins() {
        let config = NavConfig {
            router: RouterConfig {
                settle_delay_ms: Some(250),
            },
            deep_link: DeepLinkConfig {
                delivery: Some(DeliveryStyle::Sheet),
                ..Default::default()
            },
            stress: StressConfig {
                operations: Some(10),
                ..Default::default()
            },
            ..Default::default()
        };
        let cli = CliOverrides {
            settle_delay_ms: Some(5),
            delivery: Some(DeliveryStyle::Present),
            operations: Some(3),
            max_depth: Some(0),
            ..Default::default()
        };
        let resolved = resolve(&config, &cli, &mut Diagnostics::default());
        assert_eq!(resolved.settle_delay, Duration::from_millis(5));
        assert_eq!(resolved.delivery, DeliveryStyle::Present);
        assert_eq!(resolved.stress_operations, 3);
        // Depth is clamped so a harness always has room for one push.
        assert_eq!(resolved.stress_max_depth, 1);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[router]
settle_delay_ms = 350

[registry]
sweep_interval_secs = 0

[deep_link]
delivery = "present"
deliver_on_appear = true

[logging]
level = "info"

[stress]
mode = "full_screen"
operations = 40
"#;
        let config: NavConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.router.settle_delay_ms, Some(350));
        assert_eq!(config.registry.sweep_interval_secs, Some(0));
        assert_eq!(config.deep_link.delivery, Some(DeliveryStyle::Present));
        assert_eq!(config.deep_link.deliver_on_appear, Some(true));
        assert_eq!(config.logging.level.as_deref(), Some("info"));
        assert_eq!(config.stress.mode, Some(StressMode::FullScreen));
        assert_eq!(config.stress.operations, Some(40));
        assert!(config.stress.seed.is_none());
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing, everything else stays default
        let toml_str = r#"
[deep_link]
delivery = "sheet"
"#;
        let config: NavConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.deep_link.delivery, Some(DeliveryStyle::Sheet));
        assert!(config.router.settle_delay_ms.is_none());
        assert!(config.stress.mode.is_none());
    }

    #[test]
    fn test_unknown_delivery_is_rejected_by_toml() {
        let toml_str = r#"
[deep_link]
delivery = "teleport"
"#;
        assert!(toml::from_str::<NavConfig>(toml_str).is_err());
    }

    #[test]
    fn test_parse_helpers() {
        let mut diagnostics = Diagnostics::default();
        assert_eq!(parse_delivery(" Sheet ", &mut diagnostics), Some(DeliveryStyle::Sheet));
        assert_eq!(parse_delivery("full_screen", &mut diagnostics), Some(DeliveryStyle::Present));
        assert_eq!(parse_level("warn", &mut diagnostics), Some(LevelFilter::Warn));
        assert!(diagnostics.entries().is_empty());

        assert_eq!(parse_delivery("nope", &mut diagnostics), None);
        assert_eq!(parse_level("loud", &mut diagnostics), None);
        assert_eq!(diagnostics.warnings().count(), 2);
    }

    #[test]
    fn test_resolve_holds_warnings_until_replayed() {
        let config = NavConfig {
            logging: LoggingConfig {
                level: Some("loud".to_string()),
                file: None,
            },
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::default();
        let resolved = resolve(&config, &CliOverrides::default(), &mut diagnostics);

        assert_eq!(resolved.log_level, DEFAULT_LOG_LEVEL);
        let warnings: Vec<&str> = diagnostics.warnings().collect();
        assert_eq!(warnings, vec![r#"Unknown log level "loud", ignoring"#]);
        assert_eq!(diagnostics.entries()[0].0, Level::Warn);
        // No logger is installed in tests; replaying must not consume the entries.
        diagnostics.replay();
        assert_eq!(diagnostics.entries().len(), 1);
    }
}
