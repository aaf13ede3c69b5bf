use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{DispatchError, RouteError};
use crate::pattern::Params;
use crate::server::{Request, Response};

/// What a handler produced.
///
/// `Nothing` is a contract violation: the router turns it into
/// [`DispatchError::InvalidResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutput {
    /// A complete response
    Response(Response),
    /// A body to place in the current response
    Body(String),
    /// Neither; reported as an invalid response
    Nothing,
}

impl From<Response> for HandlerOutput {
    fn from(res: Response) -> Self {
        HandlerOutput::Response(res)
    }
}

impl From<String> for HandlerOutput {
    fn from(body: String) -> Self {
        HandlerOutput::Body(body)
    }
}

impl From<&str> for HandlerOutput {
    fn from(body: &str) -> Self {
        HandlerOutput::Body(body.to_string())
    }
}

impl From<()> for HandlerOutput {
    fn from(_: ()) -> Self {
        HandlerOutput::Nothing
    }
}

/// Closure handler signature.
pub type HandlerFn = dyn Fn(&Request, Response, &Params) -> HandlerOutput + Send + Sync;

/// An object exposing named route methods.
///
/// Lifecycle per request: [`RouteTarget::before_route`], the method, then
/// [`RouteTarget::after_route`]. Returning `false` from `before_route` skips
/// the method and `after_route` and leaves the response unchanged.
pub trait RouteTarget: Send + Sync {
    /// `true` if `method` can be called on this target.
    fn responds_to(&self, method: &str) -> bool;

    /// Run `method`.
    fn call(&self, method: &str, req: &Request, res: Response, params: &Params) -> HandlerOutput;

    /// Pre-route hook.
    fn before_route(&self, _req: &Request, _res: &Response, _params: &Params) -> bool {
        true
    }

    /// Post-route hook.
    fn after_route(&self, _req: &Request, _res: &Response, _params: &Params) {}
}

/// Resolves target identifiers to instances.
///
/// Passed to the router at construction; consulted when a route is
/// registered with a named target and again on every dispatch.
pub trait HandlerRegistry: Send + Sync {
    /// Instance for `id`, if known.
    fn resolve(&self, id: &str) -> Option<Arc<dyn RouteTarget>>;
}

/// Registry backed by a fixed map of shared instances.
#[derive(Default)]
pub struct StaticRegistry {
    targets: HashMap<String, Arc<dyn RouteTarget>>,
}

impl fmt::Debug for StaticRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("StaticRegistry").field("targets", &ids).finish()
    }
}

impl StaticRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` under `id`, replacing any previous instance.
    pub fn register(&mut self, id: &str, target: Arc<dyn RouteTarget>) {
        self.targets.insert(id.to_string(), target);
    }

    /// Builder-style [`StaticRegistry::register`].
    #[must_use]
    pub fn with(mut self, id: &str, target: Arc<dyn RouteTarget>) -> Self {
        self.register(id, target);
        self
    }
}

impl HandlerRegistry for StaticRegistry {
    fn resolve(&self, id: &str) -> Option<Arc<dyn RouteTarget>> {
        self.targets.get(id).cloned()
    }
}

/// Target of a `(target, method)` handler.
#[derive(Clone)]
pub enum TargetRef {
    /// A concrete instance
    Instance(Arc<dyn RouteTarget>),
    /// An identifier resolved through the [`HandlerRegistry`]
    Named(String),
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Instance(_) => write!(f, "Instance(<target>)"),
            TargetRef::Named(id) => f.debug_tuple("Named").field(id).finish(),
        }
    }
}

/// A route handler.
#[derive(Clone)]
pub enum Handler {
    /// A closure
    Func(Arc<HandlerFn>),
    /// A method on a target object
    Target {
        /// Instance or identifier
        target: TargetRef,
        /// Method name
        method: String,
    },
    /// Reroute to another URL or `@alias`
    Redirect {
        /// URL, path or `@alias(...)` expression
        target: String,
        /// 301 when `true`, 302 otherwise
        permanent: bool,
    },
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Func(_) => write!(f, "Func(<closure>)"),
            Handler::Target { target, method } => f
                .debug_struct("Target")
                .field("target", target)
                .field("method", method)
                .finish(),
            Handler::Redirect { target, permanent } => f
                .debug_struct("Redirect")
                .field("target", target)
                .field("permanent", permanent)
                .finish(),
        }
    }
}

impl Handler {
    /// Wrap a closure.
    pub fn func<F, O>(f: F) -> Self
    where
        F: Fn(&Request, Response, &Params) -> O + Send + Sync + 'static,
        O: Into<HandlerOutput>,
    {
        Handler::Func(Arc::new(move |req: &Request, res: Response, params: &Params| {
            f(req, res, params).into()
        }))
    }

    /// Method on a concrete instance.
    pub fn target(target: Arc<dyn RouteTarget>, method: &str) -> Self {
        Handler::Target {
            target: TargetRef::Instance(target),
            method: method.to_string(),
        }
    }

    /// Method on an instance resolved by identifier.
    pub fn named(id: &str, method: &str) -> Self {
        Handler::Target {
            target: TargetRef::Named(id.to_string()),
            method: method.to_string(),
        }
    }

    /// Reroute handler.
    pub fn redirect(target: &str, permanent: bool) -> Self {
        Handler::Redirect {
            target: target.to_string(),
            permanent,
        }
    }

    /// Check that a `(target, method)` handler can be called.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidHandler`] when the identifier does not resolve or
    /// the target does not expose the method.
    pub fn validate(&self, registry: &dyn HandlerRegistry) -> Result<(), RouteError> {
        let Handler::Target { target, method } = self else {
            return Ok(());
        };
        let (instance, label) = match target {
            TargetRef::Instance(t) => (Some(Arc::clone(t)), format!("<instance>::{method}")),
            TargetRef::Named(id) => (registry.resolve(id), format!("{id}::{method}")),
        };
        match instance {
            Some(t) if !method.is_empty() && t.responds_to(method) => Ok(()),
            _ => Err(RouteError::InvalidHandler { handler: label }),
        }
    }
}

/// Performs reroutes requested by [`Handler::Redirect`].
pub trait Rerouter {
    /// Reroute the current request to `target`.
    ///
    /// # Errors
    ///
    /// Propagates dispatch failures of internal reroutes.
    fn reroute_from(
        &self,
        req: &Request,
        res: Response,
        params: &Params,
        target: &str,
        permanent: bool,
    ) -> Result<Response, DispatchError>;
}

/// Shared state needed to run a handler.
pub struct Invocation<'a> {
    /// Registry for named targets
    pub registry: &'a dyn HandlerRegistry,
    /// Performs redirects
    pub rerouter: &'a dyn Rerouter,
    /// Matched pattern, for diagnostics
    pub pattern: &'a str,
}

impl Invocation<'_> {
    /// Run `handler` and normalise its output to a response.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidResponse`] when the handler returned
    /// [`HandlerOutput::Nothing`]; [`DispatchError::UnresolvedHandler`] when
    /// a named target no longer resolves.
    pub fn run(
        &self,
        handler: &Handler,
        req: &Request,
        res: Response,
        params: &Params,
    ) -> Result<Response, DispatchError> {
        match handler {
            Handler::Func(f) => {
                let out = f(req, res.clone(), params);
                self.finish(out, res)
            }
            Handler::Target { target, method } => {
                let instance = match target {
                    TargetRef::Instance(t) => Arc::clone(t),
                    TargetRef::Named(id) => self.registry.resolve(id).ok_or_else(|| {
                        error!(target = %id, "Route target could not be resolved");
                        DispatchError::UnresolvedHandler { target: id.clone() }
                    })?,
                };
                if !instance.before_route(req, &res, params) {
                    debug!(method = %method, "before_route declined the request");
                    return Ok(res);
                }
                let out = instance.call(method, req, res.clone(), params);
                instance.after_route(req, &res, params);
                self.finish(out, res)
            }
            Handler::Redirect { target, permanent } => {
                self.rerouter.reroute_from(req, res, params, target, *permanent)
            }
        }
    }

    fn finish(&self, out: HandlerOutput, res: Response) -> Result<Response, DispatchError> {
        match out {
            HandlerOutput::Response(r) => Ok(r),
            HandlerOutput::Body(body) => Ok(res.with_body(body)),
            HandlerOutput::Nothing => {
                error!(pattern = %self.pattern, "Handler returned neither a response nor a body");
                Err(DispatchError::InvalidResponse {
                    pattern: self.pattern.to_string(),
                })
            }
        }
    }
}
