//! Application-level configuration loading: phase timings, capacity and seed prompts.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DOODLE_PARTY_BACK_CONFIG_PATH";

const DEFAULT_WHITEBOARD_SECS: u64 = 10;
const DEFAULT_GRACE_SECS: u64 = 10;
const DEFAULT_VOTING_SECS: u64 = 60;
const DEFAULT_RESULTS_SECS: u64 = 30;
const DEFAULT_SCAN_INTERVAL_MS: u64 = 1_000;
const DEFAULT_CAPACITY: u32 = 20;
const DEFAULT_TRANSITION_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    whiteboard_duration: Duration,
    grace_window: Duration,
    voting_window: Duration,
    results_window: Duration,
    scan_interval: Duration,
    default_capacity: u32,
    transition_timeout: Duration,
    seed_prompts: Vec<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        whiteboard_secs = app_config.whiteboard_duration.as_secs(),
                        grace_secs = app_config.grace_window.as_secs(),
                        prompts = app_config.seed_prompts.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Length of the drawing phase.
    pub fn whiteboard_duration(&self) -> Duration {
        self.whiteboard_duration
    }

    /// Delay between entering Submission and opening the vote.
    pub fn grace_window(&self) -> Duration {
        self.grace_window
    }

    /// How long voting stays open when the host does not move on.
    pub fn voting_window(&self) -> Duration {
        self.voting_window
    }

    /// How long results stay on screen before the game closes by itself.
    pub fn results_window(&self) -> Duration {
        self.results_window
    }

    /// Period of the scheduler scan.
    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    /// Players allowed in a new game, host included.
    pub fn default_capacity(&self) -> u32 {
        self.default_capacity
    }

    /// Upper bound on the persistence work backing a single transition.
    pub fn transition_timeout(&self) -> Duration {
        self.transition_timeout
    }

    /// Prompts inserted on startup when the repository has none.
    pub fn seed_prompts(&self) -> &[String] {
        &self.seed_prompts
    }

    /// Lobby size used for new games.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.default_capacity = capacity.max(1);
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            whiteboard_duration: Duration::from_secs(DEFAULT_WHITEBOARD_SECS),
            grace_window: Duration::from_secs(DEFAULT_GRACE_SECS),
            voting_window: Duration::from_secs(DEFAULT_VOTING_SECS),
            results_window: Duration::from_secs(DEFAULT_RESULTS_SECS),
            scan_interval: Duration::from_millis(DEFAULT_SCAN_INTERVAL_MS),
            default_capacity: DEFAULT_CAPACITY,
            transition_timeout: Duration::from_millis(DEFAULT_TRANSITION_TIMEOUT_MS),
            seed_prompts: default_prompts(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
///
/// Every field is optional; absent ones keep their default.
struct RawConfig {
    whiteboard_secs: Option<u64>,
    grace_secs: Option<u64>,
    voting_secs: Option<u64>,
    results_secs: Option<u64>,
    scan_interval_ms: Option<u64>,
    capacity: Option<u32>,
    transition_timeout_ms: Option<u64>,
    prompts: Option<Vec<String>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let prompts = value
            .prompts
            .map(|prompts| {
                prompts
                    .into_iter()
                    .map(|prompt| prompt.trim().to_owned())
                    .filter(|prompt| !prompt.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.seed_prompts);

        Self {
            whiteboard_duration: value
                .whiteboard_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.whiteboard_duration),
            grace_window: value
                .grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.grace_window),
            voting_window: value
                .voting_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.voting_window),
            results_window: value
                .results_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.results_window),
            scan_interval: value
                .scan_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.scan_interval),
            default_capacity: value
                .capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.default_capacity),
            transition_timeout: value
                .transition_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.transition_timeout),
            seed_prompts: prompts,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in prompts shipped with the binary.
fn default_prompts() -> Vec<String> {
    [
        "A cat riding a skateboard",
        "A castle made of cheese",
        "An octopus playing drums",
        "A snowman on vacation",
        "A robot watering flowers",
        "A dragon baking bread",
        "A giraffe in a phone booth",
        "A haunted lighthouse",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{ "whiteboard_secs": 30, "capacity": 0 }"#)
            .expect("valid json");
        let config = AppConfig::from(raw);

        assert_eq!(config.whiteboard_duration(), Duration::from_secs(30));
        assert_eq!(config.grace_window(), Duration::from_secs(DEFAULT_GRACE_SECS));
        assert_eq!(config.results_window(), Duration::from_secs(DEFAULT_RESULTS_SECS));
        assert_eq!(config.default_capacity(), DEFAULT_CAPACITY);
        assert!(!config.seed_prompts().is_empty());
    }

    #[test]
    fn blank_prompts_are_dropped() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "prompts": ["  A pirate ship ", "", "   "] }"#).unwrap();
        assert_eq!(AppConfig::from(raw).seed_prompts(), ["A pirate ship"]);
    }
}
