use chrono::Utc;
use http::Method;
use smallvec::SmallVec;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::alias::{AliasRegistry, AliasTarget};
use super::group::{join_path, GroupHandle, GroupScope, IntoPrefix};
use super::render::error_page;
use super::table::{find_verb, Channel, Expression, RouteEntry, RouteOptions, RouteSet, RouteTable};
use crate::cache::{expire, page_key, parse_http_date, CacheBackend, CachedPage, MemoryCache};
use crate::config::RouterConfig;
use crate::dispatcher::{Handler, HandlerRegistry, Invocation, Rerouter, StaticRegistry};
use crate::error::{DispatchError, RouteError};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::pattern::{build, CompiledPattern, Params};
use crate::server::{ConnectionState, Request, Response};

/// Internal CLI reroutes allowed before the request is failed.
pub const MAX_REROUTE_HOPS: u8 = 8;

/// Matching slower than this is logged.
const SLOW_MATCH: Duration = Duration::from_millis(1);

/// Reroute interception hook: `(request, url, permanent)`.
///
/// Returning a response takes over the reroute; `None` lets the router
/// continue with its own redirect.
pub type RerouteHook = dyn Fn(&Request, &str, bool) -> Option<Response> + Send + Sync;

/// Pattern router with channel-aware dispatch.
///
/// Registration takes `&mut self`; dispatch takes `&self`, so a fully
/// registered router can be shared between worker threads behind an `Arc`.
pub struct Router {
    config: RouterConfig,
    table: RouteTable,
    aliases: AliasRegistry,
    groups: Vec<String>,
    global: MiddlewareChain,
    registry: Arc<dyn HandlerRegistry>,
    cache: Arc<dyn CacheBackend>,
    reroute_hook: Option<Arc<RerouteHook>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("patterns", &self.table.len())
            .field("aliases", &self.aliases.len())
            .field("groups", &self.groups)
            .field("global", &self.global)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Router with an empty [`StaticRegistry`] and an in-memory page cache.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidCors`] when the configured CORS policy is invalid.
    pub fn new(config: RouterConfig) -> Result<Self, RouteError> {
        config.cors.validate()?;
        Ok(Self {
            config,
            table: RouteTable::new(),
            aliases: AliasRegistry::new(),
            groups: Vec::new(),
            global: MiddlewareChain::new(),
            registry: Arc::new(StaticRegistry::new()),
            cache: Arc::new(MemoryCache::default()),
            reroute_hook: None,
        })
    }

    /// Use `registry` to resolve named route targets.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn HandlerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Use `cache` for page caching.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = cache;
        self
    }

    /// Settings.
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Route table in match order.
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Alias registry.
    #[must_use]
    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// Every entry, in match order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.table.slots().iter().flat_map(|s| s.entries())
    }

    /// Distinct non-empty group prefixes, in declaration order.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Add a global interceptor; it wraps every route.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) -> &mut Self {
        self.global = self.global.with(mw);
        self
    }

    /// Install the reroute hook.
    ///
    /// # Errors
    ///
    /// [`RouteError::RerouteHookBusy`] when a hook is already installed.
    pub fn set_reroute_hook<F>(&mut self, hook: F) -> Result<(), RouteError>
    where
        F: Fn(&Request, &str, bool) -> Option<Response> + Send + Sync + 'static,
    {
        if self.reroute_hook.is_some() {
            return Err(RouteError::RerouteHookBusy);
        }
        self.reroute_hook = Some(Arc::new(hook));
        Ok(())
    }

    /// Register `"VERBS [alias:] pattern [channel]"`.
    ///
    /// # Errors
    ///
    /// Any registration [`RouteError`]: malformed expression or pattern,
    /// undefined/invalid/duplicate alias, unknown verb, unresolvable handler.
    pub fn route(&mut self, expr: &str, handler: Handler) -> Result<RouteSet<'_>, RouteError> {
        self.register(expr, handler, RouteOptions::default(), None)
    }

    /// [`Router::route`] with caching/throttling options.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn route_with(
        &mut self,
        expr: &str,
        handler: Handler,
        options: RouteOptions,
    ) -> Result<RouteSet<'_>, RouteError> {
        self.register(expr, handler, options, None)
    }

    /// Register a route that reroutes to `target`.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn redirect(&mut self, expr: &str, target: &str, permanent: bool) -> Result<RouteSet<'_>, RouteError> {
        self.route(expr, Handler::redirect(target, permanent))
    }

    /// Open a route group.
    pub fn group<P: IntoPrefix>(&mut self, prefix: P) -> GroupHandle<'_> {
        let prefix = prefix.into_prefix();
        if !prefix.is_empty() && !self.groups.contains(&prefix) {
            self.groups.push(prefix.clone());
        }
        GroupHandle::new(self, prefix)
    }

    pub(crate) fn register(
        &mut self,
        expr: &str,
        handler: Handler,
        options: RouteOptions,
        mut scope: Option<&mut GroupScope>,
    ) -> Result<RouteSet<'_>, RouteError> {
        let parsed = Expression::parse(expr)?;
        handler.validate(self.registry.as_ref())?;

        let prefix = scope.as_ref().map(|s| s.prefix.clone()).unwrap_or_default();
        let (pattern, alias) = match (&parsed.declares, &parsed.references) {
            (Some(name), _) => (join_path(&prefix, &parsed.pattern), Some(name.clone())),
            (None, Some(name)) => (join_path(&prefix, self.aliases.template(name)?), Some(name.clone())),
            (None, None) => (join_path(&prefix, &parsed.pattern), None),
        };
        CompiledPattern::compile(&pattern, self.config.caseless)?;
        if let Some(name) = &parsed.declares {
            self.aliases.declare(name, &pattern, &prefix)?;
        }

        let middleware = match scope.as_deref_mut() {
            Some(scope) => {
                scope.sealed = true;
                scope.middleware.clone()
            }
            None => MiddlewareChain::new(),
        };

        let mut entries = Vec::with_capacity(parsed.verbs.len());
        for verb in &parsed.verbs {
            let entry = RouteEntry {
                pattern: pattern.clone(),
                verb: verb.clone(),
                channel: parsed.channel,
                handler: handler.clone(),
                ttl: options.ttl,
                kbps: options.kbps,
                alias: alias.clone(),
                group: prefix.clone(),
                middleware: middleware.clone(),
            };
            entries.push(self.table.insert(entry, self.config.caseless)?);
            info!(
                method = %verb,
                pattern = %pattern,
                channel = %parsed.channel,
                alias = alias.as_deref().unwrap_or(""),
                ttl = options.ttl,
                kbps = options.kbps,
                "Registered route"
            );
        }
        Ok(RouteSet::new(&mut self.table, entries))
    }

    /// Replace tokens in `template` with `params` (see [`crate::pattern::build`]).
    #[must_use]
    pub fn build(&self, template: &str, params: &Params) -> String {
        build(template, params)
    }

    /// URL of an alias with optional query pairs and fragment.
    ///
    /// # Errors
    ///
    /// [`RouteError::UndefinedAlias`] when no such alias exists.
    pub fn alias(
        &self,
        name: &str,
        params: &Params,
        query: Option<&[(&str, &str)]>,
        fragment: Option<&str>,
    ) -> Result<String, RouteError> {
        self.aliases.url(name, params, query, fragment)
    }

    /// Path relative to the configured base.
    fn relative<'p>(&self, path: &'p str) -> &'p str {
        let base = self.config.base();
        if base.is_empty() {
            return path;
        }
        match path.strip_prefix(base) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }

    /// Route a request and produce its response.
    ///
    /// Not-found, method-not-allowed and not-modified are ordinary
    /// responses.
    ///
    /// # Errors
    ///
    /// [`DispatchError`] for requests that cannot be answered: no routes at
    /// all, a handler contract violation, an unresolvable target or a reroute
    /// loop.
    pub fn dispatch(&self, req: &Request) -> Result<Response, DispatchError> {
        if self.table.is_empty() {
            return Err(DispatchError::NoRoutes);
        }

        let start = Instant::now();
        let decoded = req.decoded_path();
        let path = self.relative(&decoded);
        let channel = req.channel();
        let cors = &self.config.cors;
        let cors_on = cors.applies(req.get_header("Origin"));
        let preflight = cors_on
            && req.method == Method::OPTIONS
            && req.get_header("Access-Control-Request-Method").is_some();

        let mut res = Response::new();
        if cors_on {
            res = cors.apply_origin(res);
        }

        let mut allowed: SmallVec<[Method; 8]> = SmallVec::new();
        for slot in self.table.slots() {
            let Some(params) = slot.pattern().matches(path) else {
                continue;
            };
            debug!(
                request_id = %req.request_id,
                pattern = %slot.pattern().as_str(),
                path = %path,
                "Pattern matched"
            );

            let own = slot.verbs(channel);
            let verbs = match own {
                Some(map) if preflight || find_verb(map, &req.method).is_some() => Some(map),
                _ => slot.verbs(Channel::Any),
            };
            let Some(verbs) = verbs else {
                continue;
            };

            if !preflight {
                if let Some(entry) = find_verb(verbs, &req.method) {
                    let elapsed = start.elapsed();
                    if elapsed > SLOW_MATCH {
                        warn!(
                            request_id = %req.request_id,
                            pattern = %entry.pattern,
                            match_us = elapsed.as_micros() as u64,
                            "Slow route match"
                        );
                    }
                    return self.run_route(req, res, entry, params);
                }
            }
            for (verb, _) in verbs {
                if !allowed.contains(verb) {
                    allowed.push(verb.clone());
                }
            }
        }

        if allowed.is_empty() {
            warn!(request_id = %req.request_id, method = %req.method, path = %req.path, "No route matched");
            return Ok(error_page(req, res, 404, None, self.config.quiet));
        }

        let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(",");
        res = res.with_header("Allow", allow.clone());
        if cors_on {
            res = cors.apply_preflight(res, &allow);
        }
        if req.method == Method::OPTIONS {
            debug!(request_id = %req.request_id, allow = %allow, "Answered OPTIONS");
            return Ok(res.with_status(200));
        }
        warn!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            allow = %allow,
            "Method not allowed"
        );
        Ok(error_page(req, res, 405, None, self.config.quiet))
    }

    fn run_route(
        &self,
        req: &Request,
        res: Response,
        entry: &Arc<RouteEntry>,
        params: Params,
    ) -> Result<Response, DispatchError> {
        let path = self.relative(&req.path);
        if self.config.reroute_trailing_slash && req.method == Method::GET && path.len() > 1 && path.ends_with('/') {
            let mut target = path[..path.len() - 1].to_string();
            if !req.query.is_empty() {
                target.push('?');
                target.push_str(&req.query);
            }
            debug!(request_id = %req.request_id, target = %target, "Trailing slash reroute");
            return self.redirect_to(req, res, target, false);
        }

        let mut res = res;
        if self.config.cors.applies(req.get_header("Origin")) {
            res = self.config.cors.apply_expose(res);
        }

        let ttl = i64::from(entry.ttl);
        let cacheable = entry.ttl > 0 && matches!(req.method, Method::GET | Method::HEAD);
        let now = Utc::now();
        let mut store_key = None;

        if cacheable {
            let key = page_key(req.method.as_str(), &req.uri());
            match self.cached(&key) {
                Some(page) => {
                    let fresh_client = req
                        .get_header("If-Modified-Since")
                        .and_then(parse_http_date)
                        .is_some_and(|since| since.timestamp() + ttl > now.timestamp());
                    if fresh_client {
                        debug!(request_id = %req.request_id, key = %key, "Not modified");
                        return Ok(res.with_status(304));
                    }
                    debug!(request_id = %req.request_id, key = %key, "Replaying cached page");
                    let remaining = (page.stored_at + ttl - now.timestamp()).max(1);
                    let res = expire(req, page.replay(res), remaining, &self.config.xframe, now);
                    return Ok(self.finish(res, entry));
                }
                None => {
                    res = expire(req, res, ttl, &self.config.xframe, now);
                    store_key = Some(key);
                }
            }
        } else {
            res = expire(req, res, 0, &self.config.xframe, now);
        }

        let invocation = Invocation {
            registry: self.registry.as_ref(),
            rerouter: self,
            pattern: &entry.pattern,
        };
        let last = |req: &Request, res: Response, params: &Params| invocation.run(&entry.handler, req, res, params);
        let res = self.global.merge(&entry.middleware).dispatch(req, res, &params, &last)?;

        if let Some(key) = store_key {
            if res.status() == 200 {
                let page = CachedPage::capture(&res, now.timestamp());
                if let Err(err) = self.cache.set(&key, page, Duration::from_secs(u64::from(entry.ttl))) {
                    warn!(key = %key, error = %err, "Page cache store failed");
                }
            }
        }
        Ok(self.finish(res, entry))
    }

    fn cached(&self, key: &str) -> Option<CachedPage> {
        match self.cache.get(key) {
            Ok(page) => page,
            Err(err) => {
                warn!(key = %key, error = %err, "Page cache lookup failed; treating as miss");
                None
            }
        }
    }

    fn finish(&self, res: Response, entry: &RouteEntry) -> Response {
        let res = if entry.kbps > 0 { res.with_throttle(entry.kbps) } else { res };
        if self.config.quiet {
            res.with_body(Vec::new())
        } else {
            res
        }
    }

    /// Reroute `req` to `target` (URL, path or `@alias(k=v)?q#f`).
    ///
    /// # Errors
    ///
    /// Dispatch errors of an internal CLI reroute, or
    /// [`DispatchError::RerouteLoop`] past [`MAX_REROUTE_HOPS`].
    pub fn reroute(&self, req: &Request, target: &str, permanent: bool) -> Result<Response, DispatchError> {
        self.reroute_from(req, Response::new(), &Params::new(), target, permanent)
    }

    fn resolve_target(&self, req: &Request, target: &str, params: &Params) -> String {
        if target.is_empty() {
            return req.uri();
        }
        if let Some(alias) = AliasTarget::parse(target) {
            if let Some(entry) = self.aliases.get(alias.name) {
                return format!("{}{}{}", build(&entry.url, &alias.args), alias.query, alias.fragment);
            }
        }
        build(target, params)
    }

    fn redirect_to(
        &self,
        req: &Request,
        res: Response,
        url: String,
        permanent: bool,
    ) -> Result<Response, DispatchError> {
        if let Some(hook) = &self.reroute_hook {
            if let Some(taken) = hook(req, &url, permanent) {
                debug!(request_id = %req.request_id, url = %url, "Reroute handled by hook");
                return Ok(taken);
            }
        }

        let mut url = url;
        if !url.starts_with('/') && !has_scheme(&url) {
            url.insert(0, '/');
        }
        if url.starts_with('/') && !url.starts_with("//") {
            url = format!("{}{}{}", req.authority_url(), self.config.base(), url);
        }

        if req.is_cli() {
            if req.reroute_hops >= MAX_REROUTE_HOPS {
                return Err(DispatchError::RerouteLoop { url });
            }
            let target = path_and_query(&url);
            debug!(request_id = %req.request_id, target = %target, "Internal CLI reroute");
            return self.dispatch(&req.rerouted(Method::GET, &target));
        }

        info!(request_id = %req.request_id, location = %url, permanent, "Redirecting");
        Ok(res
            .with_header("Location", url)
            .with_status(if permanent { 301 } else { 302 }))
    }

    /// Dispatch `req` and write the response to `out`.
    ///
    /// # Errors
    ///
    /// Dispatch errors, or [`DispatchError::Io`] when writing fails.
    pub fn serve<W: Write + ?Sized>(
        &self,
        req: &Request,
        out: &mut W,
        conn: &dyn ConnectionState,
    ) -> Result<Response, DispatchError> {
        let mut res = self.dispatch(req)?;
        res.send(out, req.is_cli(), conn)?;
        Ok(res)
    }
}

impl Rerouter for Router {
    fn reroute_from(
        &self,
        req: &Request,
        res: Response,
        params: &Params,
        target: &str,
        permanent: bool,
    ) -> Result<Response, DispatchError> {
        let url = self.resolve_target(req, target, params);
        self.redirect_to(req, res, url, permanent)
    }
}

fn has_scheme(url: &str) -> bool {
    url.split_once("://")
        .is_some_and(|(scheme, _)| !scheme.is_empty() && scheme.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

/// `/path?query` part of an absolute URL.
fn path_and_query(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(q) => format!("{}?{}", parsed.path(), q),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}
