use std::str::FromStr;

use tracing::warn;

const LOG_LEVEL: &str = "LOG_LEVEL";

const DEFAULT_LOG_LEVEL: tracing::Level = tracing::Level::INFO;

pub fn get_log_level() -> tracing::Level {
    let level_from_env = std::env::var(LOG_LEVEL);
    level_from_env.map_or(DEFAULT_LOG_LEVEL, |res| {
        res.parse().unwrap_or(DEFAULT_LOG_LEVEL)
    })
}

/// Read a variable from the process environment
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Look up and parse a variable, warning (and ignoring it) when it does not parse
pub fn parse_env<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key).filter(|v| !v.trim().is_empty())?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("invalid value for {key}: {raw}, keeping configured value");
            None
        }
    }
}
