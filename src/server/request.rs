use http::Method;
use std::borrow::Cow;
use ulid::Ulid;

use super::headers::Headers;
use crate::router::Channel;

/// Incoming request as seen by the router.
///
/// The transport layer (or a test, or the command line tool) builds one of
/// these and hands it to [`crate::router::Router::dispatch`]. The router never
/// parses raw HTTP.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use routeweave::server::Request;
///
/// let req = Request::new(Method::GET, "/items/42?expand=1")
///     .header("X-Requested-With", "XMLHttpRequest");
/// assert_eq!(req.path, "/items/42");
/// assert_eq!(req.query, "expand=1");
/// assert!(req.is_ajax());
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    /// Request id for tracing; taken from `x-request-id` when it is a ULID
    pub request_id: Ulid,
    /// HTTP method
    pub method: Method,
    /// `http` or `https`
    pub scheme: String,
    /// Host name without port
    pub host: String,
    /// Port the request arrived on
    pub port: u16,
    /// Raw (percent-encoded) path without the query string
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: String,
    /// Request headers
    pub headers: Headers,
    /// Remote address
    pub client_ip: String,
    /// Request body
    pub body: Vec<u8>,
    cli: bool,
    ajax: bool,
    pub(crate) reroute_hops: u8,
}

impl Request {
    /// Create a request for `target` (`/path` or `/path?query`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        Self {
            request_id: Ulid::new(),
            method,
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 80,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: query.to_string(),
            headers: Headers::new(),
            client_ip: "127.0.0.1".to_string(),
            body: Vec::new(),
            cli: false,
            ajax: false,
            reroute_hops: 0,
        }
    }

    /// Add a header.
    ///
    /// `X-Request-Id` replaces the generated request id when it is a ULID.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if name.eq_ignore_ascii_case("x-request-id") {
            if let Ok(id) = Ulid::from_string(value) {
                self.request_id = id;
            }
        }
        self.headers.append(name, value);
        self
    }

    /// Mark the request as a command-line invocation.
    #[must_use]
    pub fn cli(mut self, cli: bool) -> Self {
        self.cli = cli;
        self
    }

    /// Mark the request as asynchronous/programmatic.
    #[must_use]
    pub fn ajax(mut self, ajax: bool) -> Self {
        self.ajax = ajax;
        self
    }

    /// Set scheme, host and port.
    #[must_use]
    pub fn origin_server(mut self, scheme: &str, host: &str, port: u16) -> Self {
        self.scheme = scheme.to_string();
        self.host = host.to_string();
        self.port = port;
        self
    }

    /// Set the client address.
    #[must_use]
    pub fn client_ip(mut self, ip: &str) -> Self {
        self.client_ip = ip.to_string();
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Header value, case-insensitive.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// `true` for command-line invocations.
    #[must_use]
    pub fn is_cli(&self) -> bool {
        self.cli
    }

    /// `true` for asynchronous/programmatic requests, either flagged through
    /// [`Request::ajax`] or carrying `X-Requested-With: XMLHttpRequest`.
    #[must_use]
    pub fn is_ajax(&self) -> bool {
        self.ajax || self.headers.get("X-Requested-With") == Some("XMLHttpRequest")
    }

    /// Channel this request dispatches on: CLI first, then AJAX, else SYNC.
    #[must_use]
    pub fn channel(&self) -> Channel {
        if self.cli {
            Channel::Cli
        } else if self.is_ajax() {
            Channel::Ajax
        } else {
            Channel::Sync
        }
    }

    /// Percent-decoded path used for pattern matching.
    #[must_use]
    pub fn decoded_path(&self) -> Cow<'_, str> {
        match urlencoding::decode_binary(self.path.as_bytes()) {
            Cow::Borrowed(_) => Cow::Borrowed(&self.path),
            Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    /// `scheme://host` plus the port when it is not the scheme's default.
    #[must_use]
    pub fn authority_url(&self) -> String {
        let default_port = matches!(
            (self.scheme.as_str(), self.port),
            ("https", 443) | ("http", 80)
        );
        if default_port {
            format!("{}://{}", self.scheme, self.host)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }

    /// Full request URI including the query string.
    #[must_use]
    pub fn uri(&self) -> String {
        let mut uri = self.authority_url();
        uri.push_str(&self.path);
        if !self.query.is_empty() {
            uri.push('?');
            uri.push_str(&self.query);
        }
        uri
    }

    /// Copy of this request aimed at another target, used for internal reroutes.
    pub(crate) fn rerouted(&self, method: Method, target: &str) -> Self {
        let mut next = Request::new(method, target);
        next.request_id = self.request_id;
        next.scheme.clone_from(&self.scheme);
        next.host.clone_from(&self.host);
        next.port = self.port;
        next.client_ip.clone_from(&self.client_ip);
        next.cli = self.cli;
        next.ajax = self.is_ajax();
        next.reroute_hops = self.reroute_hops.saturating_add(1);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_target() {
        let req = Request::new(Method::GET, "/a/b?x=1&y=2");
        assert_eq!(req.path, "/a/b");
        assert_eq!(req.query, "x=1&y=2");
        assert_eq!(req.uri(), "http://localhost/a/b?x=1&y=2");
    }

    #[test]
    fn test_channel_detection() {
        assert_eq!(Request::new(Method::GET, "/").channel(), Channel::Sync);
        let ajax = Request::new(Method::GET, "/").header("x-requested-with", "XMLHttpRequest");
        assert_eq!(ajax.channel(), Channel::Ajax);
        let cli = Request::new(Method::GET, "/").ajax(true).cli(true);
        assert_eq!(cli.channel(), Channel::Cli);
    }

    #[test]
    fn test_ajax_header_added_after_construction() {
        let mut req = Request::new(Method::GET, "/");
        req.headers.append("X-Requested-With", "XMLHttpRequest");
        assert!(req.is_ajax());
        assert_eq!(req.channel(), Channel::Ajax);
    }

    #[test]
    fn test_decoded_path() {
        let req = Request::new(Method::GET, "/files/a%20b");
        assert_eq!(req.decoded_path(), "/files/a b");
    }

    #[test]
    fn test_non_default_port_in_uri() {
        let req = Request::new(Method::GET, "/x").origin_server("https", "example.com", 8443);
        assert_eq!(req.uri(), "https://example.com:8443/x");
    }

    #[test]
    fn test_request_id_from_header() {
        let id = Ulid::new();
        let req = Request::new(Method::GET, "/").header("X-Request-Id", &id.to_string());
        assert_eq!(req.request_id, id);
    }
}
