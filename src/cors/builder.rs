use super::{validate_policy, CorsConfigError, CorsPolicy};

/// Builder for [`CorsPolicy`] with a fluent API
///
/// # Example
///
/// ```rust
/// use routeweave::cors::CorsPolicyBuilder;
///
/// let cors = CorsPolicyBuilder::new()
///     .origin("https://app.example.com")
///     .credentials(true)
///     .headers(&["Content-Type", "X-Token"])
///     .expose(&["X-Total-Count"])
///     .ttl(600)
///     .build()
///     .unwrap();
/// assert!(cors.is_enabled());
/// ```
#[derive(Debug, Default)]
pub struct CorsPolicyBuilder {
    policy: CorsPolicy,
}

impl CorsPolicyBuilder {
    /// Start from a disabled policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Origin sent in `Access-Control-Allow-Origin` (`*` or `scheme://host[:port]`).
    pub fn origin(mut self, origin: &str) -> Self {
        self.policy.origin = Some(origin.to_string());
        self
    }

    /// Send `Access-Control-Allow-Credentials: true`.
    ///
    /// Cannot be combined with the wildcard origin; `build()` rejects it.
    pub fn credentials(mut self, allow: bool) -> Self {
        self.policy.credentials = allow;
        self
    }

    /// Headers listed in `Access-Control-Expose-Headers`.
    pub fn expose(mut self, headers: &[&str]) -> Self {
        self.policy.expose = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Headers listed in `Access-Control-Allow-Headers` on preflight.
    pub fn headers(mut self, headers: &[&str]) -> Self {
        self.policy.headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Preflight cache duration in seconds (0 omits `Access-Control-Max-Age`).
    pub fn ttl(mut self, seconds: u32) -> Self {
        self.policy.ttl = seconds;
        self
    }

    /// Validate and return the policy.
    ///
    /// # Errors
    ///
    /// See [`CorsConfigError`].
    pub fn build(self) -> Result<CorsPolicy, CorsConfigError> {
        validate_policy(&self.policy)?;
        Ok(self.policy)
    }
}
