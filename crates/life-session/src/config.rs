//! Configuration loading and typed config structures for Sparse Life.
//!
//! The configuration lives in `life-config.yaml` next to the binary's
//! working directory. Every field has a default, so an empty file (or no
//! file at all) yields a runnable setup.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 6080
//! session:
//!   initial_delay_ms: 800.0
//!   frame_buffer: 1
//! engine:
//!   workers: 0
//! seed:
//!   pattern: r_pentomino
//! ```

use std::path::Path;

use life_core::{EngineConfig, Pattern, RandomSoup, Universe};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The values parsed but cannot be used together.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors the structure of `life-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LifeConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Per-session defaults.
    #[serde(default)]
    pub session: SessionConfig,

    /// Generation engine tuning.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Starting universe for new sessions.
    #[serde(default)]
    pub seed: SeedConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LifeConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `LIFE_HOST` overrides `server.host`
    /// - `LIFE_PORT` overrides `server.port` (ignored if not a port number)
    /// - `LIFE_LOG_JSON` overrides `logging.json` (`1` or `true`)
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.session.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults (plus env overrides) otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            config.session.validate()?;
            Ok(config)
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LIFE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("LIFE_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Ok(json) = std::env::var("LIFE_LOG_JSON") {
            self.logging.json = matches!(json.as_str(), "1" | "true");
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Per-session defaults and limits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
    /// Inter-generation target interval a new session starts with.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: f64,

    /// Lower clamp for `delayLess`.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: f64,

    /// Upper clamp for `delayMore`.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: f64,

    /// Generations the producer may run ahead of viewers (clamped to 1..=10).
    #[serde(default = "default_frame_buffer")]
    pub frame_buffer: usize,

    /// Lifetime the transport should give the session token.
    #[serde(default = "default_token_max_age_secs")]
    pub token_max_age_secs: u64,
}

impl SessionConfig {
    /// The handoff channel capacity actually used.
    pub fn effective_frame_buffer(&self) -> usize {
        self.frame_buffer.clamp(1, 10)
    }

    /// Check the delay settings.
    ///
    /// All three must be finite, the minimum must be positive and at most
    /// the maximum, and the initial delay must lie between them. Otherwise
    /// `delayLess` could raise the delay or `delayMore` lower it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("initial_delay_ms", self.initial_delay_ms),
            ("min_delay_ms", self.min_delay_ms),
            ("max_delay_ms", self.max_delay_ms),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid {
                reason: format!("session.{name} must be finite, got {value}"),
            });
        }
        if self.min_delay_ms <= 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!("session.min_delay_ms must be positive, got {}", self.min_delay_ms),
            });
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "session.min_delay_ms ({}) exceeds session.max_delay_ms ({})",
                    self.min_delay_ms, self.max_delay_ms
                ),
            });
        }
        if !(self.min_delay_ms..=self.max_delay_ms).contains(&self.initial_delay_ms) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "session.initial_delay_ms ({}) outside [{}, {}]",
                    self.initial_delay_ms, self.min_delay_ms, self.max_delay_ms
                ),
            });
        }
        Ok(())
    }

    /// `(min, max, initial)` delays a session actually uses.
    ///
    /// Always ordered and finite, even for a config that would fail
    /// [`SessionConfig::validate`]: unusable values fall back to the
    /// defaults and the initial delay is pulled into range.
    pub fn delay_range(&self) -> (f64, f64, f64) {
        let min = if self.min_delay_ms.is_finite() && self.min_delay_ms > 0.0 {
            self.min_delay_ms
        } else {
            default_min_delay_ms()
        };
        let max = if self.max_delay_ms.is_finite() {
            self.max_delay_ms.max(min)
        } else {
            default_max_delay_ms().max(min)
        };
        let initial = if self.initial_delay_ms.is_finite() {
            self.initial_delay_ms
        } else {
            default_initial_delay_ms()
        };
        (min, max, initial.max(min).min(max))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            frame_buffer: default_frame_buffer(),
            token_max_age_secs: default_token_max_age_secs(),
        }
    }
}

/// Which universe new sessions start from.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeedConfig {
    /// Named pattern (`r_pentomino`, `glider`, ..., `random`).
    #[serde(default)]
    pub pattern: Pattern,

    /// Soup parameters, used when `pattern` is `random`.
    #[serde(default)]
    pub random: RandomSoup,
}

impl SeedConfig {
    /// Build the generation-0 universe.
    pub fn universe(&self) -> Universe {
        self.pattern.seed_with(&self.random)
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    6080
}

const fn default_initial_delay_ms() -> f64 {
    800.0
}

const fn default_min_delay_ms() -> f64 {
    12.5
}

const fn default_max_delay_ms() -> f64 {
    60_000.0
}

const fn default_frame_buffer() -> usize {
    1
}

const fn default_token_max_age_secs() -> u64 {
    3600
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = LifeConfig::parse("").unwrap();
        assert!((config.session.initial_delay_ms - 800.0).abs() < f64::EPSILON);
        assert_eq!(config.session.frame_buffer, 1);
        assert_eq!(config.engine.workers, 0);
        assert_eq!(config.seed.pattern, Pattern::RPentomino);
    }

    #[test]
    fn shipped_config_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../life-config.yaml");
        let config = LifeConfig::from_file(&path).unwrap();
        assert_eq!(config.seed.pattern, Pattern::RPentomino);
        assert_eq!(config.session.token_max_age_secs, 3600);
        assert_eq!(config.engine.max_retries, 3);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "
session:
  frame_buffer: 4
engine:
  workers: 2
seed:
  pattern: gosper_glider_gun
";
        let config = LifeConfig::parse(yaml).unwrap();
        assert_eq!(config.session.frame_buffer, 4);
        assert_eq!(config.session.token_max_age_secs, 3600);
        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.engine.channel_capacity, 1024);
        assert_eq!(config.seed.pattern, Pattern::GosperGliderGun);
        assert_eq!(config.seed.universe().len(), 36);
    }

    #[test]
    fn random_seed_parameters_parse() {
        let yaml = "
seed:
  pattern: random
  random:
    seed: 9
    width: 8
    height: 8
    density: 1.0
";
        let config = LifeConfig::parse(yaml).unwrap();
        assert_eq!(config.seed.universe().len(), 64);
    }

    #[test]
    fn frame_buffer_is_clamped() {
        let mut session = SessionConfig::default();
        session.frame_buffer = 0;
        assert_eq!(session.effective_frame_buffer(), 1);
        session.frame_buffer = 50;
        assert_eq!(session.effective_frame_buffer(), 10);
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let result = LifeConfig::parse("session: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    fn session_yaml(body: &str) -> Result<LifeConfig, ConfigError> {
        LifeConfig::parse(&format!("session:\n{body}"))
    }

    #[test]
    fn non_finite_delay_is_rejected() {
        let nan = session_yaml("  min_delay_ms: .nan\n");
        assert!(matches!(nan, Err(ConfigError::Invalid { .. })));
        let inf = session_yaml("  max_delay_ms: .inf\n");
        assert!(matches!(inf, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn non_positive_minimum_is_rejected() {
        let zero = session_yaml("  min_delay_ms: 0.0\n");
        assert!(matches!(zero, Err(ConfigError::Invalid { .. })));
        let negative = session_yaml("  min_delay_ms: -5.0\n");
        assert!(matches!(negative, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let result = session_yaml("  min_delay_ms: 2000.0\n  max_delay_ms: 1000.0\n  initial_delay_ms: 1500.0\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn initial_delay_outside_range_is_rejected() {
        let result = session_yaml("  min_delay_ms: 1000.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn delay_range_never_inverts_halving() {
        let session = SessionConfig {
            min_delay_ms: 1000.0,
            ..SessionConfig::default()
        };
        let (min, max, initial) = session.delay_range();
        assert!((min - 1000.0).abs() < f64::EPSILON);
        assert!((max - 60_000.0).abs() < f64::EPSILON);
        assert!((initial - 1000.0).abs() < f64::EPSILON);

        let broken = SessionConfig {
            min_delay_ms: f64::NAN,
            max_delay_ms: f64::INFINITY,
            initial_delay_ms: f64::NAN,
            ..SessionConfig::default()
        };
        let (min, max, initial) = broken.delay_range();
        assert!(min.is_finite() && max.is_finite() && initial.is_finite());
        assert!(min <= initial && initial <= max);
    }
}
