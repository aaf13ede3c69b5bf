//! Error types for route registration and request dispatch.
//!
//! Registration problems are programmer errors and surface as [`RouteError`]
//! before any request is served. [`DispatchError`] covers the few request-time
//! conditions that cannot be expressed as a normal response (a handler that
//! broke its contract, an unresolvable handler, a reroute loop, an I/O failure
//! while emitting). Not-found, method-not-allowed and not-modified are ordinary
//! responses and never appear here.

use std::fmt;
use std::io;

use crate::cors::CorsConfigError;

/// Registration-time error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The pattern (or the whole route expression) could not be parsed.
    InvalidPattern {
        /// The offending pattern or expression
        pattern: String,
        /// What is wrong with it
        reason: String,
    },
    /// `@name` referenced an alias that was never declared.
    UndefinedAlias {
        /// The alias name
        name: String,
    },
    /// An inline alias declaration used a name that is not a word identifier.
    InvalidAlias {
        /// The rejected alias name
        name: String,
    },
    /// An alias with this name already exists.
    DuplicateAlias {
        /// The alias name
        name: String,
    },
    /// A verb token is not part of the supported method set.
    InvalidVerb {
        /// The rejected verb token
        verb: String,
    },
    /// Middleware was added to a group after a route was registered under it.
    GroupSealed {
        /// The group prefix
        prefix: String,
    },
    /// The handler can not be resolved or does not expose the named method.
    InvalidHandler {
        /// Identifier or description of the handler
        handler: String,
    },
    /// A reroute hook is already installed.
    RerouteHookBusy,
    /// The CORS policy is invalid.
    InvalidCors(CorsConfigError),
}

impl RouteError {
    /// HTTP status class associated with the error.
    ///
    /// Unknown verbs are reported as 501 Not Implemented; every other
    /// registration error is an internal server error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            RouteError::InvalidVerb { .. } => 501,
            _ => 500,
        }
    }

    pub(crate) fn pattern(pattern: &str, reason: impl Into<String>) -> Self {
        RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid routing pattern '{pattern}': {reason}")
            }
            RouteError::UndefinedAlias { name } => write!(f, "Named route does not exist: {name}"),
            RouteError::InvalidAlias { name } => write!(f, "Invalid named route alias: {name}"),
            RouteError::DuplicateAlias { name } => write!(f, "Named route already defined: {name}"),
            RouteError::InvalidVerb { verb } => write!(f, "Unsupported HTTP method: {verb}"),
            RouteError::GroupSealed { prefix } => write!(
                f,
                "Route group '{prefix}': middleware can not be added after a route was registered"
            ),
            RouteError::InvalidHandler { handler } => write!(
                f,
                "Invalid route handler '{handler}': use a closure or a resolvable (target, method) pair"
            ),
            RouteError::RerouteHookBusy => write!(f, "Router reroute hook already installed"),
            RouteError::InvalidCors(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::InvalidCors(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CorsConfigError> for RouteError {
    fn from(err: CorsConfigError) -> Self {
        RouteError::InvalidCors(err)
    }
}

/// Request-time failure that aborts dispatch.
#[derive(Debug)]
pub enum DispatchError {
    /// `dispatch` was called on a router without any route.
    NoRoutes,
    /// The handler returned something that is neither a response nor a body.
    InvalidResponse {
        /// The matched pattern
        pattern: String,
    },
    /// A `(target, method)` handler could not be resolved at dispatch time.
    UnresolvedHandler {
        /// The target identifier
        target: String,
    },
    /// Internal CLI reroutes exceeded the hop limit.
    RerouteLoop {
        /// The last reroute target
        url: String,
    },
    /// Writing the response failed.
    Io(io::Error),
}

impl DispatchError {
    /// HTTP status class of the failure; always 500.
    #[must_use]
    pub fn status(&self) -> u16 {
        500
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoRoutes => write!(f, "No routes specified"),
            DispatchError::InvalidResponse { pattern } => write!(
                f,
                "Invalid response from handler for '{pattern}': expected a response or a body"
            ),
            DispatchError::UnresolvedHandler { target } => {
                write!(f, "Route target '{target}' could not be resolved")
            }
            DispatchError::RerouteLoop { url } => write!(f, "Too many internal reroutes (last: {url})"),
            DispatchError::Io(err) => write!(f, "Failed to emit response: {err}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DispatchError {
    fn from(err: io::Error) -> Self {
        DispatchError::Io(err)
    }
}
