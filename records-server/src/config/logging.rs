use serde::Deserialize;
use std::collections::BTreeMap;

/// Configuration for the process-wide logger
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level for every target without an override (default: debug)
    #[serde(default = "default_level")]
    pub level: String,

    /// Per-namespace level overrides, e.g. `{"hyper": "info"}`
    #[serde(default = "default_overrides")]
    pub overrides: BTreeMap<String, String>,

    /// Append-only log file next to console output; `None` logs to the console only
    #[serde(default = "default_file")]
    pub file: Option<String>,
}

fn default_level() -> String {
    "debug".to_string()
}

fn default_overrides() -> BTreeMap<String, String> {
    ["hyper", "hyper_util", "reqwest", "tower_http", "h2"]
        .into_iter()
        .map(|namespace| (namespace.to_string(), "info".to_string()))
        .collect()
}

fn default_file() -> Option<String> {
    Some("../ResourceServerLogs.txt".to_string())
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            overrides: default_overrides(),
            file: default_file(),
        }
    }
}
