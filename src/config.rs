use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/";
pub const DEFAULT_CURRENCY: &str = "RWF";

/// Client settings for talking to the platform API.
/// Defaults match a local backend; `from_env` overlays `DONOR_LINK_*` variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    /// TCP + TLS establishment limit
    pub connect_timeout_ms: u64,
    /// Whole-request limit (send + server time + body)
    pub request_timeout_ms: u64,
    /// Currency attached to every payment intent
    pub currency: String,
    /// Optional JSON file backing the token slot; in-memory when None
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            currency: DEFAULT_CURRENCY.to_string(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    pub fn connect_timeout(&self) -> Duration { Duration::from_millis(self.connect_timeout_ms) }
    pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms) }

    /// Defaults overlaid with process environment.
    pub fn from_env() -> Self {
        Self::default().overlay(|k| std::env::var(k).ok())
    }

    /// Overlay values from a lookup function (env in production, a map in tests).
    pub fn overlay<F: Fn(&str) -> Option<String>>(mut self, lookup: F) -> Self {
        if let Some(v) = lookup("DONOR_LINK_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.base_url = v.trim().to_string();
        }
        if let Some(v) = lookup("DONOR_LINK_CONNECT_TIMEOUT_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) => self.connect_timeout_ms = ms,
                Err(_) => tracing::warn!(value = %v, "ignoring unparsable DONOR_LINK_CONNECT_TIMEOUT_MS"),
            }
        }
        if let Some(v) = lookup("DONOR_LINK_REQUEST_TIMEOUT_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) => self.request_timeout_ms = ms,
                Err(_) => tracing::warn!(value = %v, "ignoring unparsable DONOR_LINK_REQUEST_TIMEOUT_MS"),
            }
        }
        if let Some(v) = lookup("DONOR_LINK_CURRENCY").filter(|v| !v.trim().is_empty()) {
            self.currency = v.trim().to_uppercase();
        }
        if let Some(v) = lookup("DONOR_LINK_SESSION_FILE").filter(|v| !v.trim().is_empty()) {
            self.session_file = Some(PathBuf::from(v.trim()));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.connect_timeout(), Duration::from_secs(10));
        assert_eq!(c.request_timeout(), Duration::from_secs(30));
        assert_eq!(c.currency, "RWF");
        assert!(c.session_file.is_none());
    }

    #[test]
    fn overlay_applies_valid_values_and_keeps_defaults_for_bad_numbers() {
        let mut env = HashMap::new();
        env.insert("DONOR_LINK_BASE_URL", "https://api.example.org/");
        env.insert("DONOR_LINK_CONNECT_TIMEOUT_MS", "2500");
        env.insert("DONOR_LINK_REQUEST_TIMEOUT_MS", "soon");
        env.insert("DONOR_LINK_CURRENCY", "usd");
        env.insert("DONOR_LINK_SESSION_FILE", "/tmp/s.json");
        let c = ClientConfig::default().overlay(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.base_url, "https://api.example.org/");
        assert_eq!(c.connect_timeout_ms, 2500);
        assert_eq!(c.request_timeout_ms, 30_000);
        assert_eq!(c.currency, "USD");
        assert_eq!(c.session_file, Some(PathBuf::from("/tmp/s.json")));
    }
}
