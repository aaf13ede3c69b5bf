//! # CORS Module
//!
//! Cross-origin policy applied by the router's dispatch loop.
//!
//! When a request carries an `Origin` header and the policy has an origin
//! configured, the router adds `Access-Control-Allow-Origin` and
//! `Access-Control-Allow-Credentials` before anything else runs. Responses
//! that reach a handler also get `Access-Control-Expose-Headers`. A preflight
//! (`OPTIONS` with `Access-Control-Request-Method`) never reaches a handler;
//! it is answered with the allowed methods, headers and max age.

mod builder;
mod error;
#[cfg(test)]
mod tests;

pub use builder::CorsPolicyBuilder;
pub use error::CorsConfigError;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::server::Response;

/// Cross-origin policy.
///
/// Disabled when `origin` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsPolicy {
    /// Value of `Access-Control-Allow-Origin`
    pub origin: Option<String>,
    /// Value of `Access-Control-Allow-Credentials`
    pub credentials: bool,
    /// `Access-Control-Expose-Headers` entries
    pub expose: Vec<String>,
    /// `Access-Control-Allow-Headers` entries for preflight responses
    pub headers: Vec<String>,
    /// `Access-Control-Max-Age` for preflight responses (0 = omitted)
    pub ttl: u32,
}

impl CorsPolicy {
    /// Start building a policy.
    pub fn builder() -> CorsPolicyBuilder {
        CorsPolicyBuilder::new()
    }

    /// Check the policy for invalid combinations.
    ///
    /// # Errors
    ///
    /// See [`CorsConfigError`].
    pub fn validate(&self) -> Result<(), CorsConfigError> {
        validate_policy(self)
    }

    /// `true` when an origin is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.origin.as_deref().is_some_and(|o| !o.is_empty())
    }

    /// `true` when the policy applies to a request with this `Origin` header.
    #[must_use]
    pub fn applies(&self, request_origin: Option<&str>) -> bool {
        self.is_enabled() && request_origin.is_some_and(|o| !o.is_empty())
    }

    /// Add the allow-origin and allow-credentials headers.
    #[must_use]
    pub fn apply_origin(&self, res: Response) -> Response {
        let Some(origin) = self.origin.as_deref() else {
            return res;
        };
        res.with_header("Access-Control-Allow-Origin", origin)
            .with_header(
                "Access-Control-Allow-Credentials",
                if self.credentials { "true" } else { "false" },
            )
    }

    /// Add `Access-Control-Expose-Headers` when any are configured.
    #[must_use]
    pub fn apply_expose(&self, res: Response) -> Response {
        if self.expose.is_empty() {
            return res;
        }
        res.with_header("Access-Control-Expose-Headers", self.expose.join(","))
    }

    /// Add the preflight headers for the verbs allowed at the path.
    #[must_use]
    pub fn apply_preflight(&self, res: Response, verbs: &str) -> Response {
        let mut res = res.with_header("Access-Control-Allow-Methods", format!("OPTIONS,{verbs}"));
        if !self.headers.is_empty() {
            res = res.with_header("Access-Control-Allow-Headers", self.headers.join(","));
        }
        if self.ttl > 0 {
            res = res.with_header("Access-Control-Max-Age", self.ttl.to_string());
        }
        res
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

fn is_valid_origin(origin: &str) -> bool {
    if origin == "*" {
        return true;
    }
    if origin.ends_with('/') {
        return false;
    }
    match Url::parse(origin) {
        Ok(url) => {
            url.host_str().is_some()
                && url.path() == "/"
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}

pub(crate) fn validate_policy(policy: &CorsPolicy) -> Result<(), CorsConfigError> {
    if let Some(origin) = policy.origin.as_deref().filter(|o| !o.is_empty()) {
        if !is_valid_origin(origin) {
            return Err(CorsConfigError::InvalidOriginFormat {
                origin: origin.to_string(),
            });
        }
        if origin == "*" && policy.credentials {
            return Err(CorsConfigError::WildcardWithCredentials);
        }
    }
    if let Some(bad) = policy
        .headers
        .iter()
        .chain(policy.expose.iter())
        .find(|h| h.is_empty() || !h.chars().all(is_token_char))
    {
        return Err(CorsConfigError::InvalidHeaderName { header: bad.clone() });
    }
    Ok(())
}
