use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::EngineConfig;

/// Runtime configuration for reviewd.
///
/// Values come from the environment (a `.env` file is honored via dotenvy in
/// `main`) with CLI flags layered on top by the caller.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub environment: String,
    pub dev_mode: bool,
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: PathBuf::from("reviewd.db"),
            environment: "development".to_string(),
            dev_mode: false,
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Build configuration from the process environment, falling back to
    /// defaults for anything unset or unparseable.
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            port: parse_or(std::env::var("REVIEWD_PORT").ok(), defaults.port),
            db_path: std::env::var("REVIEWD_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            dev_mode: false,
            engine: EngineConfig {
                max_reviewers: parse_or(
                    std::env::var("REVIEWD_MAX_REVIEWERS").ok(),
                    defaults.engine.max_reviewers,
                ),
                bulk_latency_budget: Duration::from_millis(parse_or(
                    std::env::var("REVIEWD_BULK_BUDGET_MS").ok(),
                    defaults.engine.bulk_latency_budget.as_millis() as u64,
                )),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
