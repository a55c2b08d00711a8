//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RelaySettings::default()`]
//! 2. If a settings file is given (`RELAY_SETTINGS` or the caller's path)
//!    and exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::RelaySettings;

/// Env var holding the HS256 token signing secret.
pub const SECRET_ENV: &str = "SECRET_KEY_WS";

/// Env var pointing at an optional JSON settings file.
pub const SETTINGS_PATH_ENV: &str = "RELAY_SETTINGS";

/// Accepted range for `server.max_send_queue`.
pub const SEND_QUEUE_RANGE: (usize, usize) = (1, 65_536);

/// Accepted range for `server.max_message_size`, in bytes.
pub const MESSAGE_SIZE_RANGE: (usize, usize) = (64, 16 * 1024 * 1024);

/// Accepted range for `auth.token_max_age_secs`.
pub const TOKEN_MAX_AGE_RANGE: (u64, u64) = (1, 86_400);

/// Load settings from `RELAY_SETTINGS` (if set) with env var overrides.
pub fn load_settings() -> Result<RelaySettings> {
    match read_env_string(SETTINGS_PATH_ENV) {
        Some(path) => load_settings_from_path(Path::new(&path)),
        None => {
            let mut settings = RelaySettings::default();
            apply_env_overrides(&mut settings, process_env);
            validate_settings(&settings)?;
            Ok(settings)
        }
    }
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    let defaults = serde_json::to_value(RelaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        warn!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RelaySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, process_env);
    validate_settings(&settings)?;
    Ok(settings)
}

/// Reject values outside the ranges the server can run with.
///
/// Env overrides are range-checked as they are read; file values are only
/// checked here, after the merge.
pub fn validate_settings(settings: &RelaySettings) -> Result<()> {
    check_range(
        "server.max_send_queue",
        settings.server.max_send_queue,
        SEND_QUEUE_RANGE,
    )?;
    check_range(
        "server.max_message_size",
        settings.server.max_message_size,
        MESSAGE_SIZE_RANGE,
    )?;
    check_range(
        "auth.token_max_age_secs",
        settings.auth.token_max_age_secs,
        TOKEN_MAX_AGE_RANGE,
    )?;
    if settings.server.host.trim().is_empty() {
        return Err(SettingsError::InvalidValue(
            "server.host must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn check_range<T>(key: &str, value: T, (min, max): (T, T)) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(SettingsError::InvalidValue(format!(
            "{key} = {value} is outside {min}..={max}"
        )));
    }
    Ok(())
}

/// Read the token signing secret from [`SECRET_ENV`].
pub fn read_signing_secret() -> Result<String> {
    signing_secret_from(process_env)
}

/// Signing secret lookup over an arbitrary environment. Empty counts as unset.
pub fn signing_secret_from(env: impl Fn(&str) -> Option<String>) -> Result<String> {
    env(SECRET_ENV)
        .filter(|v| !v.is_empty())
        .ok_or(SettingsError::MissingSecret(SECRET_ENV))
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// `env` resolves a variable name to its value. Invalid values are ignored
/// with a warning (falling back to file/default).
pub fn apply_env_overrides(settings: &mut RelaySettings, env: impl Fn(&str) -> Option<String>) {
    // ── Server settings ─────────────────────────────────────────────
    if let Some(v) = read_string(&env, "RELAY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_parsed(&env, "PORT", |s| parse_u16_range(s, 1, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = read_parsed(&env, "RELAY_MAX_SEND_QUEUE", |s| {
        parse_usize_range(s, SEND_QUEUE_RANGE.0, SEND_QUEUE_RANGE.1)
    }) {
        settings.server.max_send_queue = v;
    }
    if let Some(v) = read_parsed(&env, "RELAY_MAX_MESSAGE_SIZE", |s| {
        parse_usize_range(s, MESSAGE_SIZE_RANGE.0, MESSAGE_SIZE_RANGE.1)
    }) {
        settings.server.max_message_size = v;
    }

    // ── Auth settings ───────────────────────────────────────────────
    if let Some(v) = read_parsed(&env, "RELAY_TOKEN_MAX_AGE_SECS", |s| {
        parse_u64_range(s, TOKEN_MAX_AGE_RANGE.0, TOKEN_MAX_AGE_RANGE.1)
    }) {
        settings.auth.token_max_age_secs = v;
    }

    // ── Logging settings ────────────────────────────────────────────
    if let Some(v) = read_parsed(&env, "RELAY_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env readers ─────────────────────────────────────────────────────────────

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn read_env_string(name: &str) -> Option<String> {
    read_string(process_env, name)
}

fn read_string(env: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name).filter(|v| !v.is_empty())
}

fn read_parsed<T>(
    env: impl Fn(&str) -> Option<String>,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let val = env(name)?;
    let result = parse(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8000, "host": "0.0.0.0"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn port_override() {
        let mut s = RelaySettings::default();
        apply_env_overrides(&mut s, env_of(&[("PORT", "9000")]));
        assert_eq!(s.server.port, 9000);
    }

    #[test]
    fn invalid_port_ignored() {
        let mut s = RelaySettings::default();
        apply_env_overrides(&mut s, env_of(&[("PORT", "0")]));
        assert_eq!(s.server.port, 8000);
        apply_env_overrides(&mut s, env_of(&[("PORT", "http")]));
        assert_eq!(s.server.port, 8000);
        apply_env_overrides(&mut s, env_of(&[("PORT", "70000")]));
        assert_eq!(s.server.port, 8000);
    }

    #[test]
    fn all_overrides_applied() {
        let mut s = RelaySettings::default();
        apply_env_overrides(
            &mut s,
            env_of(&[
                ("RELAY_HOST", "127.0.0.1"),
                ("RELAY_MAX_SEND_QUEUE", "8"),
                ("RELAY_MAX_MESSAGE_SIZE", "1024"),
                ("RELAY_TOKEN_MAX_AGE_SECS", "300"),
                ("RELAY_LOG_JSON", "yes"),
            ]),
        );
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.server.max_send_queue, 8);
        assert_eq!(s.server.max_message_size, 1024);
        assert_eq!(s.auth.token_max_age_secs, 300);
        assert!(s.logging.json);
    }

    #[test]
    fn empty_host_ignored() {
        let mut s = RelaySettings::default();
        apply_env_overrides(&mut s, env_of(&[("RELAY_HOST", "")]));
        assert_eq!(s.server.host, "0.0.0.0");
    }

    #[test]
    fn no_env_keeps_defaults() {
        let mut s = RelaySettings::default();
        apply_env_overrides(&mut s, env_of(&[]));
        assert_eq!(s.server.port, 8000);
        assert_eq!(s.auth.token_max_age_secs, 60);
    }

    // ── signing secret ──────────────────────────────────────────────

    #[test]
    fn secret_present() {
        let secret = signing_secret_from(env_of(&[("SECRET_KEY_WS", "s3cret")])).unwrap();
        assert_eq!(secret, "s3cret");
    }

    #[test]
    fn secret_missing_or_empty() {
        assert_matches!(
            signing_secret_from(env_of(&[])),
            Err(SettingsError::MissingSecret("SECRET_KEY_WS"))
        );
        assert_matches!(
            signing_secret_from(env_of(&[("SECRET_KEY_WS", "")])),
            Err(SettingsError::MissingSecret(_))
        );
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("Off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range(" 80 ", 1, 100), Some(80));
        assert_eq!(parse_u16_range("101", 1, 100), None);
        assert_eq!(parse_u64_range("1", 1, 1), Some(1));
        assert_eq!(parse_usize_range("-1", 0, 10), None);
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn load_from_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, r#"{"auth":{"token_max_age_secs":120}}"#).unwrap();

        let s = load_settings_from_path(&path).unwrap();
        assert_eq!(s.auth.token_max_age_secs, 120);
        assert_eq!(s.server.max_send_queue, 64);
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(s.logging.level, "info");
    }

    fn load_json(json: &str) -> Result<RelaySettings> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, json).unwrap();
        load_settings_from_path(&path)
    }

    #[test]
    fn file_zero_send_queue_rejected() {
        let err = load_json(r#"{"server":{"max_send_queue":0}}"#).unwrap_err();
        assert_matches!(err, SettingsError::InvalidValue(ref msg) if msg.contains("max_send_queue"));
    }

    #[test]
    fn file_send_queue_above_range_rejected() {
        assert_matches!(
            load_json(r#"{"server":{"max_send_queue":65537}}"#),
            Err(SettingsError::InvalidValue(_))
        );
    }

    #[test]
    fn file_message_size_out_of_range_rejected() {
        let err = load_json(r#"{"server":{"max_message_size":0}}"#).unwrap_err();
        assert_matches!(err, SettingsError::InvalidValue(ref msg) if msg.contains("max_message_size"));
        assert_matches!(
            load_json(r#"{"server":{"max_message_size":16777217}}"#),
            Err(SettingsError::InvalidValue(_))
        );
    }

    #[test]
    fn file_token_max_age_out_of_range_rejected() {
        let err = load_json(r#"{"auth":{"token_max_age_secs":0}}"#).unwrap_err();
        assert_matches!(err, SettingsError::InvalidValue(ref msg) if msg.contains("token_max_age_secs"));
        assert_matches!(
            load_json(r#"{"auth":{"token_max_age_secs":86401}}"#),
            Err(SettingsError::InvalidValue(_))
        );
    }

    #[test]
    fn file_values_at_range_edges_accepted() {
        let s = load_json(
            r#"{"server":{"max_send_queue":1,"max_message_size":64},"auth":{"token_max_age_secs":86400}}"#,
        )
        .unwrap();
        assert_eq!(s.server.max_send_queue, 1);
        assert_eq!(s.server.max_message_size, 64);
        assert_eq!(s.auth.token_max_age_secs, 86_400);
    }

    #[test]
    fn empty_host_rejected() {
        let mut s = RelaySettings::default();
        s.server.host = " ".to_string();
        assert_matches!(validate_settings(&s), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn defaults_validate() {
        validate_settings(&RelaySettings::default()).unwrap();
    }

    #[test]
    fn load_invalid_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }
}
