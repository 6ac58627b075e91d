//! Settings - 起動時に一度だけ構築する不変の設定
//!
//! # Fail-fast 設計
//! - token / domain / 2 つの signing key が空なら起動時に `ConfigError`
//! - コンポーネントは `Arc<Settings>` を受け取り、環境変数を直接読まない
//!
//! 読み込み順: defaults → 設定ファイル（任意）→ `COURIER_*` 環境変数

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "COURIER";
pub const DEFAULT_WEBHOOK_PATH: &str = "/qstash/webhook/";
pub const DEFAULT_BASE_URL: &str = "https://qstash.upstash.io";
pub const DEFAULT_RESULT_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    #[error("invalid setting '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// The two keys accepted for inbound signatures.
///
/// Rotation: publish with `next` while `current` is still accepted, then
/// promote. Debug output never prints key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKeys {
    pub current: String,
    pub next: String,
}

impl SigningKeys {
    pub fn new(current: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            next: next.into(),
        }
    }

    /// Keys in verification order.
    pub fn in_order(&self) -> [&str; 2] {
        [&self.current, &self.next]
    }
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("current", &"<redacted>")
            .field("next", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawSettings {
    #[serde(default)]
    token: String,
    #[serde(default)]
    current_signing_key: String,
    #[serde(default)]
    next_signing_key: String,
    #[serde(default)]
    domain: String,
    webhook_path: String,
    force_https: bool,
    result_ttl_secs: u64,
    store_results: bool,
    base_url: String,
    qstash_url: Option<String>,
    bind: String,
}

/// Process-wide configuration.
#[derive(Clone)]
pub struct Settings {
    token: String,
    signing_keys: SigningKeys,
    domain: String,
    webhook_path: String,
    force_https: bool,
    result_ttl: Duration,
    store_results: bool,
    base_url: String,
    base_url_override: Option<String>,
    bind: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("token", &"<redacted>")
            .field("signing_keys", &self.signing_keys)
            .field("domain", &self.domain)
            .field("webhook_path", &self.webhook_path)
            .field("force_https", &self.force_https)
            .field("result_ttl", &self.result_ttl)
            .field("store_results", &self.store_results)
            .field("base_url", &self.base_url)
            .field("base_url_override", &self.base_url_override)
            .field("bind", &self.bind)
            .finish()
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Loads from `COURIER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Loads from an optional file (any format `config` understands),
    /// then environment variables on top.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("webhook_path", DEFAULT_WEBHOOK_PATH)?
            .set_default("force_https", true)?
            .set_default("result_ttl_secs", DEFAULT_RESULT_TTL_SECS as i64)?
            .set_default("store_results", true)?
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("bind", DEFAULT_BIND)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let raw: RawSettings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        SettingsBuilder {
            token: raw.token,
            current_signing_key: raw.current_signing_key,
            next_signing_key: raw.next_signing_key,
            domain: raw.domain,
            webhook_path: raw.webhook_path,
            force_https: raw.force_https,
            result_ttl: Duration::from_secs(raw.result_ttl_secs),
            store_results: raw.store_results,
            base_url: raw.base_url,
            base_url_override: raw.qstash_url.filter(|u| !u.trim().is_empty()),
            bind: raw.bind,
        }
        .build()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn signing_keys(&self) -> &SigningKeys {
        &self.signing_keys
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn force_https(&self) -> bool {
        self.force_https
    }

    pub fn result_ttl(&self) -> Duration {
        self.result_ttl
    }

    pub fn store_results(&self) -> bool {
        self.store_results
    }

    pub fn bind(&self) -> &str {
        &self.bind
    }

    /// Development override of the delivery service URL, if any.
    pub fn base_url_override(&self) -> Option<&str> {
        self.base_url_override.as_deref()
    }

    /// Delivery service URL actually used.
    pub fn delivery_base_url(&self) -> &str {
        self.base_url_override().unwrap_or(&self.base_url)
    }

    /// Route path the webhook is mounted on, e.g. `/qstash/webhook/`.
    pub fn webhook_route(&self) -> String {
        let path = self.webhook_path.trim_matches('/');
        if path.is_empty() {
            "/".to_string()
        } else {
            format!("/{path}/")
        }
    }

    /// Public callback URL the delivery service posts to.
    ///
    /// The domain defaults to `https://` when it carries no scheme.
    pub fn callback_url(&self) -> String {
        let mut domain = self.domain.trim_end_matches('/').to_string();
        if !domain.starts_with("http://") && !domain.starts_with("https://") {
            domain = format!("https://{domain}");
        }
        let path = self.webhook_path.trim_matches('/');
        if path.is_empty() {
            format!("{domain}/")
        } else {
            format!("{domain}/{path}/")
        }
    }

    /// 署名の `sub` と照合する URL。
    ///
    /// host と path は設定値のみから組み立てる。リクエストから取るのは scheme だけ。
    pub fn webhook_url(&self, scheme: &str) -> String {
        format!("{scheme}://{}{}", self.domain_host(), self.webhook_route())
    }

    /// Host part of the configured domain (no scheme, no trailing slash).
    pub fn domain_host(&self) -> &str {
        let domain = self.domain.trim_end_matches('/');
        domain
            .strip_prefix("https://")
            .or_else(|| domain.strip_prefix("http://"))
            .unwrap_or(domain)
    }
}

/// Builder used by `Settings::load` and by embedders / tests.
#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    token: String,
    current_signing_key: String,
    next_signing_key: String,
    domain: String,
    webhook_path: String,
    force_https: bool,
    result_ttl: Duration,
    store_results: bool,
    base_url: String,
    base_url_override: Option<String>,
    bind: String,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            token: String::new(),
            current_signing_key: String::new(),
            next_signing_key: String::new(),
            domain: String::new(),
            webhook_path: DEFAULT_WEBHOOK_PATH.to_string(),
            force_https: true,
            result_ttl: Duration::from_secs(DEFAULT_RESULT_TTL_SECS),
            store_results: true,
            base_url: DEFAULT_BASE_URL.to_string(),
            base_url_override: None,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl SettingsBuilder {
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn signing_keys(mut self, current: impl Into<String>, next: impl Into<String>) -> Self {
        self.current_signing_key = current.into();
        self.next_signing_key = next.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn webhook_path(mut self, path: impl Into<String>) -> Self {
        self.webhook_path = path.into();
        self
    }

    pub fn force_https(mut self, force: bool) -> Self {
        self.force_https = force;
        self
    }

    pub fn result_ttl(mut self, ttl: Duration) -> Self {
        self.result_ttl = ttl;
        self
    }

    pub fn store_results(mut self, enabled: bool) -> Self {
        self.store_results = enabled;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url_override(mut self, url: impl Into<String>) -> Self {
        self.base_url_override = Some(url.into());
        self
    }

    pub fn bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    pub fn build(self) -> Result<Settings, ConfigError> {
        let required = [
            ("token", &self.token),
            ("current_signing_key", &self.current_signing_key),
            ("next_signing_key", &self.next_signing_key),
            ("domain", &self.domain),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(key));
            }
        }
        if self.result_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                key: "result_ttl_secs",
                reason: "must be positive".to_string(),
            });
        }
        for (key, url) in [("base_url", Some(&self.base_url)), ("qstash_url", self.base_url_override.as_ref())] {
            if let Some(url) = url
                && !url.starts_with("http://")
                && !url.starts_with("https://")
            {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("'{url}' is not an http(s) URL"),
                });
            }
        }

        Ok(Settings {
            token: self.token,
            signing_keys: SigningKeys::new(self.current_signing_key, self.next_signing_key),
            domain: self.domain,
            webhook_path: self.webhook_path,
            force_https: self.force_https,
            result_ttl: self.result_ttl,
            store_results: self.store_results,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            base_url_override: self.base_url_override.map(|u| u.trim_end_matches('/').to_string()),
            bind: self.bind,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub const CURRENT_KEY: &str = "sig_current_key";
    pub const NEXT_KEY: &str = "sig_next_key";

    pub fn settings() -> Settings {
        Settings::builder()
            .token("qstash_token")
            .signing_keys(CURRENT_KEY, NEXT_KEY)
            .domain("example.com")
            .build()
            .unwrap()
    }
}
