use http::Method;
use routeweave::cache::{http_date, MemoryCache};
use routeweave::router::RouteOptions;
use routeweave::{
    from_fn, CorsPolicy, Handler, HandlerOutput, Params, Request, Response, RouteTarget, Router, RouterConfig,
    StaticRegistry,
};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;
use common::{get, router, serve_to_string, text};

fn counting(hits: Arc<AtomicUsize>) -> Handler {
    Handler::func(move |_: &Request, _: Response, _: &Params| {
        let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
        format!("render {n}")
    })
}

#[test]
fn test_verb_zoo() {
    let mut r = router();
    r.route("GET /zoo/animals", text("list")).unwrap();
    r.route("POST /zoo/animals", text("create")).unwrap();
    r.route("GET|PUT|PATCH|DELETE /zoo/animals/@id", text("one")).unwrap();
    r.route("HEAD /zoo/health", text("")).unwrap();

    let cases = [
        (Method::GET, "/zoo/animals", 200),
        (Method::POST, "/zoo/animals", 200),
        (Method::DELETE, "/zoo/animals", 405),
        (Method::PUT, "/zoo/animals/7", 200),
        (Method::DELETE, "/zoo/animals/7", 200),
        (Method::POST, "/zoo/animals/7", 405),
        (Method::HEAD, "/zoo/health", 200),
        (Method::GET, "/zoo/keepers", 404),
    ];
    for (method, path, status) in cases {
        let res = r.dispatch(&Request::new(method.clone(), path)).unwrap();
        assert_eq!(res.status(), status, "{method} {path}");
    }

    let res = r.dispatch(&Request::new(Method::POST, "/zoo/animals/7")).unwrap();
    assert_eq!(res.header("Allow"), Some("GET,PUT,PATCH,DELETE"));
}

#[test]
fn test_page_cache_replay_and_not_modified() {
    let cache = Arc::new(MemoryCache::new(16));
    let mut r = router().with_cache(cache.clone());
    let hits = Arc::new(AtomicUsize::new(0));
    r.route_with("GET /page", counting(hits.clone()), RouteOptions::ttl(60))
        .unwrap();

    let first = r.dispatch(&get("/page")).unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.body_str(), "render 1");
    assert_eq!(first.header("Cache-Control"), Some("max-age=60"));
    assert!(first.header("Last-Modified").is_some());

    let second = r.dispatch(&get("/page")).unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(second.body_str(), "render 1");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let since = http_date(chrono::Utc::now());
    let third = r
        .dispatch(&get("/page").header("If-Modified-Since", &since))
        .unwrap();
    assert_eq!(third.status(), 304);
    assert!(third.body().is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let (cache_hits, misses) = cache.stats();
    assert_eq!(cache_hits, 2);
    assert_eq!(misses, 1);
}

#[test]
fn test_uncacheable_requests_always_render() {
    let mut r = router();
    let hits = Arc::new(AtomicUsize::new(0));
    r.route_with("GET|POST /feed", counting(hits.clone()), RouteOptions::ttl(30))
        .unwrap();

    r.dispatch(&Request::new(Method::POST, "/feed")).unwrap();
    let res = r.dispatch(&Request::new(Method::POST, "/feed")).unwrap();
    assert_eq!(res.body_str(), "render 2");
    assert_eq!(res.header("Pragma"), Some("no-cache"));

    let mut plain = router();
    let plain_hits = Arc::new(AtomicUsize::new(0));
    plain.route("GET /feed", counting(plain_hits.clone())).unwrap();
    plain.dispatch(&get("/feed")).unwrap();
    plain.dispatch(&get("/feed")).unwrap();
    assert_eq!(plain_hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_non_200_pages_are_not_cached() {
    let mut r = router();
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = hits.clone();
    r.route_with(
        "GET /flaky",
        Handler::func(move |_: &Request, res: Response, _: &Params| {
            seen.fetch_add(1, Ordering::SeqCst);
            res.with_status(503).with_body("busy")
        }),
        RouteOptions::ttl(60),
    )
    .unwrap();

    r.dispatch(&get("/flaky")).unwrap();
    r.dispatch(&get("/flaky")).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

fn cors_router() -> Router {
    let cors = CorsPolicy::builder()
        .origin("https://app.example")
        .expose(&["X-Total"])
        .headers(&["Content-Type"])
        .ttl(600)
        .build()
        .unwrap();
    let mut r = Router::new(RouterConfig {
        cors,
        ..RouterConfig::default()
    })
    .unwrap();
    r.route("GET /api/items", text("items")).unwrap();
    r.route("POST /api/items", text("created")).unwrap();
    r
}

#[test]
fn test_cors_headers_on_matched_route() {
    let r = cors_router();
    let res = r
        .dispatch(&get("/api/items").header("Origin", "https://app.example"))
        .unwrap();
    assert_eq!(res.header("Access-Control-Allow-Origin"), Some("https://app.example"));
    assert_eq!(res.header("Access-Control-Allow-Credentials"), Some("false"));
    assert_eq!(res.header("Access-Control-Expose-Headers"), Some("X-Total"));

    let no_origin = r.dispatch(&get("/api/items")).unwrap();
    assert!(no_origin.header("Access-Control-Allow-Origin").is_none());
}

#[test]
fn test_cached_page_does_not_replay_cors_headers() {
    let cors = CorsPolicy::builder()
        .origin("https://app.example")
        .build()
        .unwrap();
    let mut r = Router::new(RouterConfig {
        cors,
        ..RouterConfig::default()
    })
    .unwrap()
    .with_cache(Arc::new(MemoryCache::new(16)));
    let hits = Arc::new(AtomicUsize::new(0));
    r.route_with("GET /page", counting(hits.clone()), RouteOptions::ttl(60))
        .unwrap();

    let first = r
        .dispatch(&get("/page").header("Origin", "https://app.example"))
        .unwrap();
    assert_eq!(first.header("Access-Control-Allow-Origin"), Some("https://app.example"));

    let replayed = r.dispatch(&get("/page")).unwrap();
    assert_eq!(replayed.body_str(), "render 1");
    assert!(replayed.header("Access-Control-Allow-Origin").is_none());
    assert!(replayed.header("Access-Control-Allow-Credentials").is_none());

    let with_origin = r
        .dispatch(&get("/page").header("Origin", "https://app.example"))
        .unwrap();
    assert_eq!(with_origin.header("Access-Control-Allow-Origin"), Some("https://app.example"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ajax_channel_from_appended_header() {
    let mut r = router();
    r.route("GET /feed [ajax]", text("ajax")).unwrap();

    let mut req = get("/feed");
    req.headers.append("X-Requested-With", "XMLHttpRequest");
    let res = r.dispatch(&req).unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.body_str(), "ajax");
    assert_eq!(r.dispatch(&get("/feed")).unwrap().status(), 404);
}

#[test]
fn test_cors_preflight() {
    let r = cors_router();
    let req = Request::new(Method::OPTIONS, "/api/items")
        .header("Origin", "https://app.example")
        .header("Access-Control-Request-Method", "POST");
    let res = r.dispatch(&req).unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.header("Allow"), Some("GET,POST"));
    assert_eq!(res.header("Access-Control-Allow-Methods"), Some("OPTIONS,GET,POST"));
    assert_eq!(res.header("Access-Control-Allow-Headers"), Some("Content-Type"));
    assert_eq!(res.header("Access-Control-Max-Age"), Some("600"));
    assert!(res.body().is_empty());
}

#[test]
fn test_cors_on_not_found() {
    let r = cors_router();
    let res = r
        .dispatch(&get("/api/missing").header("Origin", "https://app.example"))
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.header("Access-Control-Allow-Origin"), Some("https://app.example"));
}

#[test]
fn test_serve_writes_once() {
    let mut r = router();
    r.route("GET /hello", text("hello")).unwrap();

    let mut out = Vec::new();
    let mut res = r
        .serve(&get("/hello"), &mut out, &routeweave::server::Connected)
        .unwrap();
    assert!(res.is_sent());
    assert_eq!(res.send(&mut out, false, &routeweave::server::Connected).unwrap(), 0);

    let written = String::from_utf8(out).unwrap();
    assert!(written.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(written.matches("hello").count(), 1);
}

#[test]
fn test_cli_serve_writes_body_only() {
    let mut r = router();
    r.route("GET /report [cli]", text("report body")).unwrap();

    let out = serve_to_string(&r, &get("/report").cli(true));
    assert_eq!(out, "report body");

    let missing = serve_to_string(&r, &get("/nope").cli(true));
    let rule = "=".repeat(35);
    assert_eq!(missing, format!("\n{rule}\nERROR 404 - Not Found\nHTTP 404 (GET /nope)\n\n"));
}

/// Records the size of every write so chunked emission can be observed.
#[derive(Default)]
struct WriteLog {
    bytes: Vec<u8>,
    writes: Vec<usize>,
}

impl Write for WriteLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        self.writes.push(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_throttled_route_is_paced() {
    let mut r = router();
    r.add_middleware(from_fn(|req, res, params, next| {
        Ok(next.run(req, res, params)?.with_chunk_size(1024))
    }));
    let payload = "x".repeat(4096);
    let body = payload.clone();
    r.route_with(
        "GET /blob",
        Handler::func(move |_: &Request, _: Response, _: &Params| body.clone()),
        RouteOptions::kbps(2),
    )
    .unwrap();

    let start = std::time::Instant::now();
    let mut out = WriteLog::default();
    let res = r
        .serve(&get("/blob"), &mut out, &routeweave::server::Connected)
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(res.throttle_kbps(), 2);
    assert!(out.bytes.ends_with(payload.as_bytes()));
    assert_eq!(out.writes.iter().rev().take(4).collect::<Vec<_>>(), [&1024; 4]);
    // 4 KiB at 2 KiB/s is two seconds; allow one 1 KiB chunk of slack.
    assert!(elapsed >= std::time::Duration::from_millis(1500), "elapsed {elapsed:?}");
}

#[test]
fn test_throttled_route_stops_on_abort() {
    let mut r = router();
    r.route_with(
        "GET /blob",
        Handler::func(|_: &Request, _: Response, _: &Params| "y".repeat(4096)),
        RouteOptions::kbps(1),
    )
    .unwrap();

    let aborted = std::sync::atomic::AtomicBool::new(true);
    let mut out = Vec::new();
    r.serve(&get("/blob"), &mut out, &aborted).unwrap();
    let written = String::from_utf8(out).unwrap();
    assert!(written.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(written.ends_with("\r\n\r\n"));
    assert!(!written.contains("yyyy"));
}

struct Catalog {
    calls: AtomicUsize,
}

impl RouteTarget for Catalog {
    fn responds_to(&self, method: &str) -> bool {
        method == "show"
    }

    fn call(&self, _method: &str, _req: &Request, res: Response, params: &Params) -> HandlerOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        res.with_header("Content-Type", "text/plain")
            .with_body(format!("product {}", params.get("sku").unwrap_or("?")))
            .into()
    }
}

#[test]
fn test_named_targets_resolve_through_registry() {
    let catalog = Arc::new(Catalog {
        calls: AtomicUsize::new(0),
    });
    let registry = StaticRegistry::new().with("catalog", catalog.clone());
    let mut r = router().with_registry(Arc::new(registry));
    r.route("GET product: /products/@sku", Handler::named("catalog", "show"))
        .unwrap();
    assert!(r.route("GET /bad", Handler::named("catalog", "delete")).is_err());

    let res = r.dispatch(&get("/products/AB-1")).unwrap();
    assert_eq!(res.body_str(), "product AB-1");
    assert_eq!(res.header("Content-Type"), Some("text/plain"));
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_config_file_drives_router() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "base: /app\nreroute_trailing_slash: true\ncors:\n  origin: https://app.example\n  credentials: true"
    )
    .unwrap();
    let config = RouterConfig::load(file.path()).unwrap();
    let mut r = Router::new(config).unwrap();
    r.route("GET /home", text("home")).unwrap();

    let res = r
        .dispatch(&get("/app/home").header("Origin", "https://app.example"))
        .unwrap();
    assert_eq!(res.body_str(), "home");
    assert_eq!(res.header("Access-Control-Allow-Credentials"), Some("true"));

    let slash = r.dispatch(&get("/app/home/")).unwrap();
    assert_eq!(slash.status(), 302);
    assert_eq!(slash.header("Location"), Some("http://localhost/app/home"));
}

#[test]
fn test_concurrent_dispatch() {
    let mut r = router();
    r.route("GET /items/@id", Handler::func(|_: &Request, _: Response, p: &Params| {
        p.get("id").unwrap_or("").to_string()
    }))
    .unwrap();
    let r = Arc::new(r);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let r = Arc::clone(&r);
            std::thread::spawn(move || {
                for i in 0..50 {
                    let id = format!("{t}-{i}");
                    let res = r.dispatch(&get(&format!("/items/{id}"))).unwrap();
                    assert_eq!(res.body_str(), id);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
