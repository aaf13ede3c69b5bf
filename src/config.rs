//! # Configuration Module
//!
//! Router settings, loaded from YAML and overridable from the environment.
//!
//! ```yaml
//! caseless: true
//! reroute_trailing_slash: true
//! base: ""
//! quiet: false
//! xframe: SAMEORIGIN
//! cors:
//!   origin: https://app.example.com
//!   credentials: true
//!   headers: [Content-Type, X-Token]
//!   expose: [X-Total-Count]
//!   ttl: 600
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `ROUTEWEAVE_CASELESS` | `caseless` |
//! | `ROUTEWEAVE_REROUTE_TRAILING_SLASH` | `reroute_trailing_slash` |
//! | `ROUTEWEAVE_BASE` | `base` |
//! | `ROUTEWEAVE_QUIET` | `quiet` |
//! | `ROUTEWEAVE_CORS_ORIGIN` | `cors.origin` |
//!
//! Booleans accept `1/0`, `true/false`, `yes/no`, `on/off`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{debug, warn};

use crate::cors::CorsPolicy;

fn default_true() -> bool {
    true
}

fn default_xframe() -> String {
    "SAMEORIGIN".to_string()
}

/// Router settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Case-insensitive pattern matching
    #[serde(default = "default_true")]
    pub caseless: bool,
    /// Redirect `GET /path/` to `/path`
    #[serde(default = "default_true")]
    pub reroute_trailing_slash: bool,
    /// Cross-origin policy
    pub cors: CorsPolicy,
    /// Mount point prepended to absolute reroute targets and stripped before matching
    pub base: String,
    /// Suppress response bodies
    pub quiet: bool,
    /// `X-Frame-Options` value (empty disables the header)
    #[serde(default = "default_xframe")]
    pub xframe: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            caseless: true,
            reroute_trailing_slash: true,
            cors: CorsPolicy::default(),
            base: String::new(),
            quiet: false,
            xframe: default_xframe(),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            warn!(variable = name, value = other, "Ignoring non-boolean environment override");
            None
        }
    }
}

impl RouterConfig {
    /// Read a YAML file.
    ///
    /// # Errors
    ///
    /// The file cannot be read or is not valid YAML for this struct.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read router config {}", path.display()))?;
        let config: RouterConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse router config {}", path.display()))?;
        debug!(path = %path.display(), "Loaded router config");
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `ROUTEWEAVE_*` overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| lookup(name).and_then(|v| parse_bool(name, &v));
        if let Some(v) = flag("ROUTEWEAVE_CASELESS") {
            self.caseless = v;
        }
        if let Some(v) = flag("ROUTEWEAVE_REROUTE_TRAILING_SLASH") {
            self.reroute_trailing_slash = v;
        }
        if let Some(v) = flag("ROUTEWEAVE_QUIET") {
            self.quiet = v;
        }
        if let Some(v) = lookup("ROUTEWEAVE_BASE") {
            self.base = v;
        }
        if let Some(v) = lookup("ROUTEWEAVE_CORS_ORIGIN") {
            self.cors.origin = if v.is_empty() { None } else { Some(v) };
        }
        self
    }

    /// Base path without a trailing slash (`""` for the root).
    #[must_use]
    pub fn base(&self) -> &str {
        self.base.trim_end_matches('/')
    }
}
