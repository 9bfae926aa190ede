use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Parsing/validation decoupled from the process environment so tests can
/// drive it from a plain map.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let places_api_key = require("GOOGLE_PLACES_API_KEY")?;
    let env = parse_environment(&or_default("LOCALRANK_ENV", "development"))?;
    let bind_addr = parse_or(&lookup, "LOCALRANK_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("LOCALRANK_LOG_LEVEL", "info");

    let places_base_url = or_default(
        "LOCALRANK_PLACES_BASE_URL",
        "https://maps.googleapis.com/maps/api/place/",
    );
    let performance_base_url = or_default(
        "LOCALRANK_PERFORMANCE_BASE_URL",
        "https://businessprofileperformance.googleapis.com/v1/",
    );
    let user_agent = or_default("LOCALRANK_USER_AGENT", "localrank/0.1 (local-seo)");

    let request_timeout_secs = parse_or(&lookup, "LOCALRANK_REQUEST_TIMEOUT_SECS", "15")?;
    let probe_timeout_ms = parse_or(&lookup, "LOCALRANK_PROBE_TIMEOUT_MS", "10000")?;
    let probe_delay_ms = parse_or(&lookup, "LOCALRANK_PROBE_DELAY_MS", "100")?;
    let backoff_max_delay_ms = parse_or(&lookup, "LOCALRANK_BACKOFF_MAX_DELAY_MS", "5000")?;
    let max_consecutive_failures = parse_or(&lookup, "LOCALRANK_MAX_CONSECUTIVE_FAILURES", "5")?;
    let max_retries = parse_or(&lookup, "LOCALRANK_MAX_RETRIES", "0")?;
    let retry_backoff_base_ms = parse_or(&lookup, "LOCALRANK_RETRY_BACKOFF_BASE_MS", "500")?;
    let default_num_points = parse_or(&lookup, "LOCALRANK_DEFAULT_NUM_POINTS", "50")?;
    let default_radius_meters: f64 = parse_or(&lookup, "LOCALRANK_DEFAULT_RADIUS_METERS", "3000")?;
    let max_num_points = parse_or(&lookup, "LOCALRANK_MAX_NUM_POINTS", "200")?;

    if !default_radius_meters.is_finite() || default_radius_meters <= 0.0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "LOCALRANK_DEFAULT_RADIUS_METERS".to_string(),
            reason: "must be a positive number of meters".to_string(),
        });
    }
    if max_consecutive_failures == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "LOCALRANK_MAX_CONSECUTIVE_FAILURES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if default_num_points == 0 || default_num_points > max_num_points {
        return Err(ConfigError::InvalidEnvVar {
            var: "LOCALRANK_DEFAULT_NUM_POINTS".to_string(),
            reason: format!("must be between 1 and LOCALRANK_MAX_NUM_POINTS ({max_num_points})"),
        });
    }

    Ok(AppConfig {
        places_api_key,
        env,
        bind_addr,
        log_level,
        places_base_url,
        performance_base_url,
        user_agent,
        request_timeout_secs,
        probe_timeout_ms,
        probe_delay_ms,
        backoff_max_delay_ms,
        max_consecutive_failures,
        max_retries,
        retry_backoff_base_ms,
        default_num_points,
        default_radius_meters,
        max_num_points,
    })
}

fn parse_or<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LOCALRANK_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    fn full_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("GOOGLE_PLACES_API_KEY", "test-key");
        m
    }

    #[test]
    fn parse_environment_known_values() {
        assert_eq!(
            parse_environment("development").unwrap(),
            Environment::Development
        );
        assert_eq!(parse_environment("test").unwrap(), Environment::Test);
        assert_eq!(
            parse_environment("production").unwrap(),
            Environment::Production
        );
    }

    #[test]
    fn parse_environment_unknown_fails() {
        let err = parse_environment("staging").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "LOCALRANK_ENV"));
    }

    #[test]
    fn build_app_config_fails_without_places_key() {
        let map: HashMap<&str, &str> = HashMap::new();
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "GOOGLE_PLACES_API_KEY"),
            "expected MissingEnvVar(GOOGLE_PLACES_API_KEY), got: {result:?}"
        );
    }

    #[test]
    fn blank_places_key_counts_as_missing() {
        let mut map = HashMap::new();
        map.insert("GOOGLE_PLACES_API_KEY", "   ");
        let result = build_app_config(lookup_from_map(&map));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn build_app_config_applies_defaults() {
        let map = full_env();
        let cfg = build_app_config(lookup_from_map(&map)).expect("config");
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(
            cfg.places_base_url,
            "https://maps.googleapis.com/maps/api/place/"
        );
        assert_eq!(cfg.request_timeout_secs, 15);
        assert_eq!(cfg.probe_timeout_ms, 10_000);
        assert_eq!(cfg.probe_delay_ms, 100);
        assert_eq!(cfg.backoff_max_delay_ms, 5_000);
        assert_eq!(cfg.max_consecutive_failures, 5);
        assert_eq!(cfg.max_retries, 0);
        assert_eq!(cfg.default_num_points, 50);
        assert!((cfg.default_radius_meters - 3000.0).abs() < f64::EPSILON);
        assert_eq!(cfg.max_num_points, 200);
    }

    #[test]
    fn probe_delay_override() {
        let mut map = full_env();
        map.insert("LOCALRANK_PROBE_DELAY_MS", "250");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.probe_delay_ms, 250);
    }

    #[test]
    fn invalid_bind_addr_is_reported() {
        let mut map = full_env();
        map.insert("LOCALRANK_BIND_ADDR", "not-a-socket-addr");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LOCALRANK_BIND_ADDR"),
            "got: {result:?}"
        );
    }

    #[test]
    fn invalid_number_is_reported() {
        let mut map = full_env();
        map.insert("LOCALRANK_MAX_CONSECUTIVE_FAILURES", "lots");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LOCALRANK_MAX_CONSECUTIVE_FAILURES"),
            "got: {result:?}"
        );
    }

    #[test]
    fn zero_failure_budget_is_rejected() {
        let mut map = full_env();
        map.insert("LOCALRANK_MAX_CONSECUTIVE_FAILURES", "0");
        assert!(build_app_config(lookup_from_map(&map)).is_err());
    }

    #[test]
    fn negative_default_radius_is_rejected() {
        let mut map = full_env();
        map.insert("LOCALRANK_DEFAULT_RADIUS_METERS", "-10");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LOCALRANK_DEFAULT_RADIUS_METERS")
        );
    }

    #[test]
    fn default_points_above_max_is_rejected() {
        let mut map = full_env();
        map.insert("LOCALRANK_DEFAULT_NUM_POINTS", "80");
        map.insert("LOCALRANK_MAX_NUM_POINTS", "60");
        assert!(build_app_config(lookup_from_map(&map)).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let map = full_env();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("test-key"));
        assert!(debug.contains("[redacted]"));
    }
}
