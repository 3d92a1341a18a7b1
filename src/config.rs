use crate::stats::MissingDayLimit;
use std::{env, path::PathBuf};
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_PATH: &str = "data/state.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub missing_day_limit: MissingDayLimit,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            missing_day_limit: MissingDayLimit::default(),
        }
    }
}

impl Config {
    /// Reads `PORT`, `APP_DATA_PATH` and `TREND_MISSING_LIMIT`. Values that
    /// don't parse keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT").and_then(|value| value.parse::<u16>().ok()) {
            config.port = port;
        }
        if let Some(path) = lookup("APP_DATA_PATH").filter(|value| !value.is_empty()) {
            config.data_path = PathBuf::from(path);
        }
        if let Some(value) = lookup("TREND_MISSING_LIMIT") {
            match MissingDayLimit::parse(&value) {
                Some(policy) => config.missing_day_limit = policy,
                None => warn!("ignoring TREND_MISSING_LIMIT={value}, expected 'zero' or 'latest'"),
            }
        }

        config
    }
}
