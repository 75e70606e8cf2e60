//! HTTP transport shared by the auth and payment calls.
//! Converts reqwest outcomes into `ApiFailure` so the operation layers only decide how a
//! failure maps onto their own error kinds.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;

/// Why a call did not produce a usable 2xx body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFailure {
    /// Request never got an HTTP answer (connect refused, DNS, timeout, reset).
    Network(String),
    /// Server answered with a non-2xx status; `message` is what its body said, if anything.
    Status { status: u16, message: Option<String> },
    /// 2xx answer whose body did not have the expected shape.
    Decode(String),
    /// Endpoint URL could not be built from the configured base; nothing was sent.
    Endpoint(String),
}

impl ApiFailure {
    pub fn status(&self) -> Option<u16> {
        match self { ApiFailure::Status { status, .. } => Some(*status), _ => None }
    }

    pub fn server_message(&self) -> Option<&str> {
        match self { ApiFailure::Status { message, .. } => message.as_deref(), _ => None }
    }

    pub fn is_network(&self) -> bool { matches!(self, ApiFailure::Network(_)) }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiFailure::Network(m) => write!(f, "network: {}", m),
            ApiFailure::Status { status, message } => write!(f, "HTTP {}: {}", status, message.as_deref().unwrap_or("<no message>")),
            ApiFailure::Decode(m) => write!(f, "decode: {}", m),
            ApiFailure::Endpoint(m) => write!(f, "endpoint: {}", m),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> std::result::Result<T, ApiFailure> {
        serde_json::from_value(self.body).map_err(|e| ApiFailure::Decode(e.to_string()))
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut base = Url::parse(&cfg.base_url).context("invalid base URL")?;
        // endpoint paths are joined relative to the base, keep any path prefix it carries
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        let http = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.request_timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { base, http })
    }

    pub fn base(&self) -> &Url { &self.base }

    pub fn endpoint(&self, path: &str) -> std::result::Result<Url, ApiFailure> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiFailure::Endpoint(format!("invalid endpoint {} for base {}: {}", path, self.base, e)))
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B, bearer: Option<&str>) -> std::result::Result<ApiResponse, ApiFailure> {
        let url = self.endpoint(path)?;
        let mut req = self.http.post(url).json(body);
        if let Some(t) = bearer { req = req.bearer_auth(t); }
        Self::dispatch(path, req).await
    }

    pub async fn post_empty(&self, path: &str, bearer: Option<&str>) -> std::result::Result<ApiResponse, ApiFailure> {
        let url = self.endpoint(path)?;
        let mut req = self.http.post(url);
        if let Some(t) = bearer { req = req.bearer_auth(t); }
        Self::dispatch(path, req).await
    }

    async fn dispatch(path: &str, req: reqwest::RequestBuilder) -> std::result::Result<ApiResponse, ApiFailure> {
        let resp = req.send().await.map_err(|e| {
            let msg = if e.is_timeout() { "request timed out".to_string() } else { e.to_string() };
            tracing::debug!(path, error = %msg, "api: request failed before a response");
            ApiFailure::Network(msg)
        })?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| ApiFailure::Network(e.to_string()))?;
        if !status.is_success() {
            tracing::debug!(path, status = status.as_u16(), "api: non-success status");
            return Err(ApiFailure::Status { status: status.as_u16(), message: extract_message(&text) });
        }
        // a plain-text acknowledgement ("OK") is still a success; typed decoding
        // through `ApiResponse::json` rejects it where a JSON body is required
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| serde_json::Value::String(text.trim().to_string()))
        };
        Ok(ApiResponse { status: status.as_u16(), body })
    }
}

const MAX_TEXT_MESSAGE: usize = 200;

/// Pull a human-readable message out of an error body: JSON `message`/`error`/`detail`,
/// else short plain text. HTML error pages are not worth showing to a user.
pub fn extract_message(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() { return None; }
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["message", "error", "detail"] {
            if let Some(s) = v.get(key).and_then(|x| x.as_str()) {
                if !s.trim().is_empty() { return Some(s.trim().to_string()); }
            }
        }
        return None;
    }
    if trimmed.starts_with('<') { return None; }
    Some(trimmed.chars().take(MAX_TEXT_MESSAGE).collect())
}
