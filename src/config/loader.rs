//! Configuration loading from the environment.
//!
//! The front-end hands everything over through `CRSH_*` environment
//! variables; there is no config file. Attributes arrive as indexed
//! `CRSH_ATTR_KEY_<i>` / `CRSH_ATTR_VALUE_<i>` pairs so the front-end can
//! forward an arbitrary attribute list without quoting concerns. Unknown
//! attribute keys and malformed `header` values are dropped silently; the
//! front-end relies on forward-compatible attributes.
//!
//! `CRSH_LOGFILE` is not handled here: the logger consumes it directly so
//! it can come up before configuration parsing and record parse failures.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::{Config, UrlLayout};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is missing or empty.
    #[error("{0} not set")]
    Missing(String),

    /// A numeric variable did not parse.
    #[error("{0} must be a non-negative integer")]
    InvalidInteger(String),

    /// The base URL did not parse.
    #[error("CRSH_URL is not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Load configuration from the process environment.
pub fn from_env() -> Result<Config, ConfigError> {
    load_with(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
///
/// The indirection keeps parsing testable without touching process-global
/// environment state.
pub(crate) fn load_with<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let ipc_endpoint = require(&lookup, "CRSH_IPC_ENDPOINT")?;
    let url = require(&lookup, "CRSH_URL")?;

    // Reject a base URL that cannot be parsed at all; the raw string is kept
    // for path composition so its exact shape survives.
    url::Url::parse(&url)?;

    let idle_timeout_seconds = non_negative(&lookup, "CRSH_IDLE_TIMEOUT")?;
    let num_attr = non_negative(&lookup, "CRSH_NUM_ATTR")?;

    let mut bearer_token = None;
    let mut layout = UrlLayout::default();
    let mut headers = Vec::new();

    for i in 0..num_attr {
        let key_var = format!("CRSH_ATTR_KEY_{i}");
        let value_var = format!("CRSH_ATTR_VALUE_{i}");
        let key = lookup(&key_var).ok_or(ConfigError::Missing(key_var))?;
        let value = lookup(&value_var).ok_or(ConfigError::Missing(value_var))?;

        match key.as_str() {
            "bearer-token" => bearer_token = Some(value),
            "layout" => layout = parse_layout(&value),
            "header" => {
                if let Some((name, val)) = value.split_once('=') {
                    headers.push((name.to_string(), val.to_string()));
                }
                // No '=': dropped without complaint.
            }
            _ => {} // Unknown attribute keys are ignored.
        }
    }

    Ok(Config {
        ipc_endpoint: native_endpoint(&ipc_endpoint),
        url,
        idle_timeout_seconds,
        bearer_token,
        layout,
        headers,
    })
}

fn require<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::Missing(name.to_string()))
}

fn non_negative<F>(lookup: &F, name: &str) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name).filter(|value| !value.is_empty());
    match raw {
        None => Ok(0),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidInteger(name.to_string())),
    }
}

fn parse_layout(value: &str) -> UrlLayout {
    match value {
        "bazel" => UrlLayout::Bazel,
        "flat" => UrlLayout::Flat,
        _ => UrlLayout::Subdirs,
    }
}

#[cfg(windows)]
fn native_endpoint(name: &str) -> PathBuf {
    PathBuf::from(format!(r"\\.\pipe\{name}"))
}

#[cfg(not(windows))]
fn native_endpoint(name: &str) -> PathBuf {
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_with(|name| map.get(name).cloned())
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("CRSH_IPC_ENDPOINT", "/tmp/crsh.sock"),
            ("CRSH_URL", "http://cache.example.com"),
        ]
    }

    #[test]
    fn minimal_configuration_uses_defaults() {
        let config = load(&minimal()).unwrap();
        assert_eq!(config.url, "http://cache.example.com");
        assert_eq!(config.idle_timeout_seconds, 0);
        assert_eq!(config.layout, UrlLayout::Subdirs);
        assert!(config.bearer_token.is_none());
        assert!(config.headers.is_empty());
    }

    #[test]
    fn missing_endpoint_is_an_error() {
        let err = load(&[("CRSH_URL", "http://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref v) if v == "CRSH_IPC_ENDPOINT"));
    }

    #[test]
    fn empty_required_variable_counts_as_missing() {
        let mut vars = minimal();
        vars[1] = ("CRSH_URL", "");
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref v) if v == "CRSH_URL"));
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        let mut vars = minimal();
        vars[1] = ("CRSH_URL", "not a url");
        assert!(matches!(load(&vars), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn idle_timeout_must_be_an_integer() {
        let mut vars = minimal();
        vars.push(("CRSH_IDLE_TIMEOUT", "soon"));
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInteger(ref v) if v == "CRSH_IDLE_TIMEOUT"));
    }

    #[test]
    fn attributes_populate_token_layout_and_headers() {
        let mut vars = minimal();
        vars.extend([
            ("CRSH_NUM_ATTR", "4"),
            ("CRSH_ATTR_KEY_0", "bearer-token"),
            ("CRSH_ATTR_VALUE_0", "s3cret"),
            ("CRSH_ATTR_KEY_1", "layout"),
            ("CRSH_ATTR_VALUE_1", "bazel"),
            ("CRSH_ATTR_KEY_2", "header"),
            ("CRSH_ATTR_VALUE_2", "X-First=one"),
            ("CRSH_ATTR_KEY_3", "header"),
            ("CRSH_ATTR_VALUE_3", "X-Second=two=halves"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.bearer_token.as_deref(), Some("s3cret"));
        assert_eq!(config.layout, UrlLayout::Bazel);
        assert_eq!(
            config.headers,
            vec![
                ("X-First".to_string(), "one".to_string()),
                // Split at the first '=' only.
                ("X-Second".to_string(), "two=halves".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_layout_value_falls_back_to_subdirs() {
        let mut vars = minimal();
        vars.extend([
            ("CRSH_NUM_ATTR", "1"),
            ("CRSH_ATTR_KEY_0", "layout"),
            ("CRSH_ATTR_VALUE_0", "pyramid"),
        ]);
        assert_eq!(load(&vars).unwrap().layout, UrlLayout::Subdirs);
    }

    #[test]
    fn header_without_equals_is_dropped() {
        let mut vars = minimal();
        vars.extend([
            ("CRSH_NUM_ATTR", "1"),
            ("CRSH_ATTR_KEY_0", "header"),
            ("CRSH_ATTR_VALUE_0", "NoSeparator"),
        ]);
        assert!(load(&vars).unwrap().headers.is_empty());
    }

    #[test]
    fn unknown_attribute_keys_are_ignored() {
        let mut vars = minimal();
        vars.extend([
            ("CRSH_NUM_ATTR", "1"),
            ("CRSH_ATTR_KEY_0", "future-knob"),
            ("CRSH_ATTR_VALUE_0", "whatever"),
        ]);
        assert!(load(&vars).is_ok());
    }

    #[test]
    fn attribute_key_without_value_is_an_error() {
        let mut vars = minimal();
        vars.extend([("CRSH_NUM_ATTR", "1"), ("CRSH_ATTR_KEY_0", "layout")]);
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref v) if v == "CRSH_ATTR_VALUE_0"));
    }
}
