//! Resolver configuration loaded through figment.
//!
//! Sources, later overriding earlier:
//! 1. Built-in defaults
//! 2. An optional TOML, YAML, or JSON file (format chosen by extension)
//! 3. `INPUTSPEC_`-prefixed environment variables; `__` separates nested keys,
//!    so `INPUTSPEC_HEADERS__AUTHORIZATION` sets `headers.authorization`

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;

/// Prefix of environment variables read by [`ResolverConfig::load`].
pub const ENV_PREFIX: &str = "INPUTSPEC_";

/// Page size used when neither the caller nor the domain sets one.
pub const DEFAULT_LIMIT: u32 = 50;
/// Debounce interval for remote domains that do not declare one.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub default_limit: u32,
    pub default_page: u32,
    pub default_debounce_ms: u64,
    /// Per-request timeout for the HTTP transport; none by default.
    pub request_timeout_ms: Option<u64>,
    /// Base URL that relative domain URIs are joined onto.
    pub base_url: Option<String>,
    /// Headers sent with every remote request.
    pub headers: HashMap<String, String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            default_page: 1,
            default_debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_ms: None,
            base_url: None,
            headers: HashMap::new(),
        }
    }
}

impl ResolverConfig {
    /// Load defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: ResolverConfig = Self::figment(path).extract()?;
        debug!(
            default_limit = config.default_limit,
            default_debounce_ms = config.default_debounce_ms,
            base_url = config.base_url.as_deref().unwrap_or_default(),
            "loaded resolver configuration"
        );
        Ok(config)
    }

    /// The layered sources, for callers that want to merge in their own.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(ResolverConfig::default()));
        if let Some(path) = path {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn default_debounce(&self) -> Duration {
        Duration::from_millis(self.default_debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
