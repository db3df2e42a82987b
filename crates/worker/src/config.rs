//! Worker configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;

/// Worker configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `WORKFLOW_INTERVAL_SECS`: pause between batch rounds (default: `300`)
/// - `INACTIVE_SESSION_MINUTES`: in-progress sessions idle this long are deleted (default: `30`)
/// - `ANONYMOUS_DEACTIVATE_MINUTES`: idle anonymous sessions are closed (default: `60`)
/// - `ANONYMOUS_DELETE_MINUTES`: done anonymous askers are deleted (default: `1440`)
/// - `REGISTERED_ONLY_DELETE_DAYS`: askers without sessions are deleted (default: `30`)
/// - `ANONYMOUS_USERNAME_PREFIX`: prefix of generated usernames (default: `"Ratsuchende "`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub interval_secs: u32,
    pub inactive_session_minutes: u32,
    pub anonymous_deactivate_minutes: u32,
    pub anonymous_delete_minutes: u32,
    pub registered_only_delete_days: u32,
    pub anonymous_username_prefix: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(lookup("PORT"), defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            interval_secs: parse_positive(
                lookup("WORKFLOW_INTERVAL_SECS"),
                defaults.interval_secs,
            ),
            inactive_session_minutes: parse_positive(
                lookup("INACTIVE_SESSION_MINUTES"),
                defaults.inactive_session_minutes,
            ),
            anonymous_deactivate_minutes: parse_positive(
                lookup("ANONYMOUS_DEACTIVATE_MINUTES"),
                defaults.anonymous_deactivate_minutes,
            ),
            anonymous_delete_minutes: parse_positive(
                lookup("ANONYMOUS_DELETE_MINUTES"),
                defaults.anonymous_delete_minutes,
            ),
            registered_only_delete_days: parse_positive(
                lookup("REGISTERED_ONLY_DELETE_DAYS"),
                defaults.registered_only_delete_days,
            ),
            anonymous_username_prefix: lookup("ANONYMOUS_USERNAME_PREFIX")
                .unwrap_or(defaults.anonymous_username_prefix),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn interval(&self) -> StdDuration {
        StdDuration::from_secs(u64::from(self.interval_secs))
    }

    pub fn inactive_session_threshold(&self) -> Duration {
        Duration::minutes(i64::from(self.inactive_session_minutes))
    }

    pub fn anonymous_deactivate_threshold(&self) -> Duration {
        Duration::minutes(i64::from(self.anonymous_deactivate_minutes))
    }

    pub fn anonymous_delete_threshold(&self) -> Duration {
        Duration::minutes(i64::from(self.anonymous_delete_minutes))
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Durations must be positive; zero, negative and out-of-range values fall
/// back to the default.
fn parse_positive(value: Option<String>, default: u32) -> u32 {
    match parse_or(value, 0) {
        0 => default,
        parsed => parsed,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            interval_secs: 300,
            inactive_session_minutes: 30,
            anonymous_deactivate_minutes: 60,
            anonymous_delete_minutes: 1440,
            registered_only_delete_days: 30,
            anonymous_username_prefix: "Ratsuchende ".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.anonymous_username_prefix, "Ratsuchende ");
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn test_values_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("INACTIVE_SESSION_MINUTES", "45"),
            ("REGISTERED_ONLY_DELETE_DAYS", "7"),
            ("ANONYMOUS_USERNAME_PREFIX", "Guest "),
        ]));

        assert_eq!(config.port, 8080);
        assert_eq!(config.inactive_session_threshold(), Duration::minutes(45));
        assert_eq!(config.registered_only_delete_days, 7);
        assert_eq!(config.anonymous_username_prefix, "Guest ");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("WORKFLOW_INTERVAL_SECS", "0"),
            ("ANONYMOUS_DELETE_MINUTES", "soon"),
        ]));

        assert_eq!(config.port, 3000);
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.anonymous_delete_minutes, 1440);
    }

    #[test]
    fn test_negative_thresholds_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("INACTIVE_SESSION_MINUTES", "-30"),
            ("ANONYMOUS_DEACTIVATE_MINUTES", "-1"),
            ("REGISTERED_ONLY_DELETE_DAYS", "-7"),
            ("WORKFLOW_INTERVAL_SECS", "-5"),
        ]));

        assert_eq!(config.inactive_session_threshold(), Duration::minutes(30));
        assert_eq!(config.anonymous_deactivate_threshold(), Duration::minutes(60));
        assert_eq!(config.registered_only_delete_days, 30);
        assert_eq!(config.interval(), StdDuration::from_secs(300));
    }

    #[test]
    fn test_overflowing_thresholds_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("INACTIVE_SESSION_MINUTES", "9223372036854775807"),
            ("REGISTERED_ONLY_DELETE_DAYS", "100000000000"),
            ("WORKFLOW_INTERVAL_SECS", "18446744073709551615"),
        ]));

        assert_eq!(config.inactive_session_threshold(), Duration::minutes(30));
        assert_eq!(config.registered_only_delete_days, 30);
        assert_eq!(config.interval(), StdDuration::from_secs(300));
    }

    #[test]
    fn test_largest_accepted_threshold_does_not_panic() {
        let max = u32::MAX.to_string();
        let config = Config::from_lookup(lookup(&[("ANONYMOUS_DELETE_MINUTES", max.as_str())]));

        assert_eq!(
            config.anonymous_delete_threshold(),
            Duration::minutes(i64::from(u32::MAX))
        );
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
