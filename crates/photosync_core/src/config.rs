//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_PREVIEW_DEBOUNCE_MS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SERVER_URL,
};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Runtime configuration for a photosync client session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub preview_debounce_ms: u64,
    pub request_timeout_secs: u64,
    /// Send the folder path with every fingerprint check instead of relying on
    /// the server remembering the active folder.
    pub stateless_poll: bool,
    pub input_folder: Option<String>,
    pub preview_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: normalize_server(DEFAULT_SERVER_URL.to_string()),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            preview_debounce_ms: DEFAULT_PREVIEW_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            stateless_poll: false,
            input_folder: None,
            preview_path: None,
        }
    }
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Normalize a server base URL.
///
/// Plain-http `localhost` is pinned to `127.0.0.1` and trailing slashes are
/// dropped so path segments can be appended uniformly. Unparseable input is
/// returned unchanged and rejected later when the client is built.
pub fn normalize_server(server: String) -> String {
    let trimmed = server.trim();
    let Some((scheme, rest)) = trimmed.split_once("://") else {
        return server;
    };
    let mut rest = rest.to_string();
    let is_localhost =
        rest == "localhost" || rest.starts_with("localhost:") || rest.starts_with("localhost/");
    if scheme.eq_ignore_ascii_case("http") && is_localhost {
        rest = rest.replacen("localhost", "127.0.0.1", 1);
    }
    let mut normalized = format!("{}://{}", scheme, rest);
    while normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

fn parse_or_default<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("Invalid {}='{}'; using default", key, value);
                default
            }
        },
        None => default,
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Arguments
    /// - `lookup`: Returns the raw value for a variable name, if set.
    ///
    /// # Returns
    /// A populated [`Config`]; invalid numbers fall back to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let stateless_poll = lookup("STATELESS_POLL")
            .and_then(|value| parse_env_flag(&value))
            .unwrap_or(false);
        Self {
            server_url: non_empty(lookup("PHOTOSYNC_SERVER"))
                .map(normalize_server)
                .unwrap_or(defaults.server_url),
            poll_interval_ms: parse_or_default(
                "POLL_INTERVAL_MS",
                lookup("POLL_INTERVAL_MS"),
                defaults.poll_interval_ms,
            )
            .max(1),
            preview_debounce_ms: parse_or_default(
                "PREVIEW_DEBOUNCE_MS",
                lookup("PREVIEW_DEBOUNCE_MS"),
                defaults.preview_debounce_ms,
            ),
            request_timeout_secs: parse_or_default(
                "REQUEST_TIMEOUT_SECS",
                lookup("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout_secs,
            ),
            stateless_poll,
            input_folder: non_empty(lookup("PHOTOSYNC_INPUT_FOLDER")),
            preview_path: non_empty(lookup("PHOTOSYNC_PREVIEW_PATH")),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_server, parse_env_flag, Config};
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_env_flag_accepts_truthy_values() {
        for value in ["1", "true", "TRUE", " yes ", "on"] {
            assert_eq!(parse_env_flag(value), Some(true), "value: {}", value);
        }
    }

    #[test]
    fn parse_env_flag_accepts_falsy_values() {
        for value in ["", "0", "false", "FALSE", " no ", "off"] {
            assert_eq!(parse_env_flag(value), Some(false), "value: {}", value);
        }
    }

    #[test]
    fn parse_env_flag_rejects_unknown_values() {
        assert_eq!(parse_env_flag("maybe"), None);
        assert_eq!(parse_env_flag("enabled"), None);
    }

    #[test]
    fn normalize_server_matrix() {
        let cases = [
            ("http://localhost:3300", "http://127.0.0.1:3300"),
            ("https://localhost:3300", "https://localhost:3300"),
            ("http://127.0.0.1:3300/", "http://127.0.0.1:3300"),
            ("not a url", "not a url"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_server(input.to_string()), expected);
        }
    }

    #[test]
    fn from_lookup_applies_defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.server_url, "http://127.0.0.1:3300");
        assert_eq!(config.poll_interval().as_millis(), 2000);
        assert_eq!(config.preview_debounce().as_millis(), 100);
    }

    #[test]
    fn from_lookup_reads_overrides_and_ignores_garbage_numbers() {
        let config = Config::from_lookup(lookup_from(&[
            ("PHOTOSYNC_SERVER", "http://192.168.1.20:3300/"),
            ("POLL_INTERVAL_MS", "500"),
            ("PREVIEW_DEBOUNCE_MS", "fast"),
            ("STATELESS_POLL", "yes"),
            ("PHOTOSYNC_INPUT_FOLDER", "  "),
            ("PHOTOSYNC_PREVIEW_PATH", "/tmp/preview.jpg"),
        ]));
        assert_eq!(config.server_url, "http://192.168.1.20:3300");
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.preview_debounce_ms, 100);
        assert!(config.stateless_poll);
        assert_eq!(config.input_folder, None);
        assert_eq!(config.preview_path.as_deref(), Some("/tmp/preview.jpg"));
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let config = Config::from_lookup(lookup_from(&[("POLL_INTERVAL_MS", "0")]));
        assert_eq!(config.poll_interval_ms, 1);
    }
}
