use std::fmt;

/// CORS configuration error
///
/// Returned by [`super::CorsPolicyBuilder::build`] when the policy is
/// invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfigError {
    /// Wildcard origin (`*`) cannot be used with credentials
    WildcardWithCredentials,
    /// Invalid origin format
    ///
    /// The origin is neither `*` nor `scheme://host[:port]`.
    InvalidOriginFormat {
        /// The invalid origin string
        origin: String,
    },
    /// A header name contains characters that are not valid in a token
    InvalidHeaderName {
        /// The rejected header name
        header: String,
    },
}

impl fmt::Display for CorsConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorsConfigError::WildcardWithCredentials => write!(
                f,
                "CORS configuration error: Cannot use wildcard origin (*) with credentials. \
                When credentials is true, you must specify an exact origin."
            ),
            CorsConfigError::InvalidOriginFormat { origin } => write!(
                f,
                "CORS configuration error: Invalid origin format '{origin}'. \
                Expected format: scheme://host[:port] (e.g., https://example.com)"
            ),
            CorsConfigError::InvalidHeaderName { header } => {
                write!(f, "CORS configuration error: Invalid header name '{header}'")
            }
        }
    }
}

impl std::error::Error for CorsConfigError {}
