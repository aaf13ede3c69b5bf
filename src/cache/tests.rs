use super::*;
use chrono::{TimeZone, Utc};
use http::Method;
use std::time::Duration;

use crate::server::{Request, Response};

#[test]
fn test_hash_shape() {
    let h = hash("GET http://localhost/");
    assert_eq!(h.len(), 11);
    assert!(h.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    assert_eq!(h, hash("GET http://localhost/"));
    assert_ne!(h, hash("HEAD http://localhost/"));
}

#[test]
fn test_page_key_suffix() {
    assert!(page_key("GET", "http://localhost/a").ends_with(".url"));
}

#[test]
fn test_http_date_roundtrip() {
    let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
    let text = http_date(at);
    assert_eq!(text, "Tue, 05 Mar 2024 07:08:09 GMT");
    assert_eq!(parse_http_date(&text), Some(at));
    assert_eq!(parse_http_date("not a date"), None);
}

#[test]
fn test_expire_cacheable() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let req = Request::new(Method::GET, "/");
    let res = expire(&req, Response::new().with_header("Pragma", "x"), 60, "SAMEORIGIN", now);
    assert_eq!(res.header("Cache-Control"), Some("max-age=60"));
    assert_eq!(res.header("Expires"), Some("Mon, 01 Jan 2024 00:01:00 GMT"));
    assert_eq!(res.header("Last-Modified"), Some("Mon, 01 Jan 2024 00:00:00 GMT"));
    assert!(res.header("Pragma").is_none());
    assert_eq!(res.header("X-Frame-Options"), Some("SAMEORIGIN"));
    assert_eq!(res.header("X-Content-Type-Options"), Some("nosniff"));
    assert_eq!(res.header("X-XSS-Protection"), Some("1; mode=block"));
}

#[test]
fn test_expire_uncacheable_post() {
    let req = Request::new(Method::POST, "/");
    let res = expire(&req, Response::new(), 60, "SAMEORIGIN", Utc::now());
    assert_eq!(res.header("Pragma"), Some("no-cache"));
    assert_eq!(res.header("Cache-Control"), Some("no-cache, no-store, must-revalidate"));
    assert_eq!(res.header("Expires"), Some(EXPIRED_DATE));
}

#[test]
fn test_expire_keeps_existing_security_headers() {
    let req = Request::new(Method::GET, "/");
    let res = expire(&req, Response::new().with_header("X-Frame-Options", "DENY"), 0, "SAMEORIGIN", Utc::now());
    assert_eq!(res.header("X-Frame-Options"), Some("DENY"));
}

#[test]
fn test_expire_cli_untouched() {
    let req = Request::new(Method::GET, "/").cli(true);
    let res = expire(&req, Response::new(), 60, "SAMEORIGIN", Utc::now());
    assert!(res.headers().is_empty());
}

#[test]
fn test_capture_drops_cookies() {
    let res = Response::new()
        .with_header("Content-Type", "text/plain")
        .with_added_header("Set-Cookie", "sid=1")
        .with_body("page");
    let page = CachedPage::capture(&res, 10);
    assert_eq!(page.headers, vec![("Content-Type".to_string(), "text/plain".to_string())]);
    let replayed = page.replay(Response::new().with_header("X-Frame-Options", "SAMEORIGIN"));
    assert_eq!(replayed.body(), b"page");
    assert_eq!(replayed.header("Content-Type"), Some("text/plain"));
    assert_eq!(replayed.header("X-Frame-Options"), Some("SAMEORIGIN"));
    assert!(replayed.header("Set-Cookie").is_none());
}

#[test]
fn test_capture_drops_cors_headers() {
    let res = Response::new()
        .with_header("Access-Control-Allow-Origin", "https://app.example")
        .with_header("access-control-expose-headers", "X-Total")
        .with_header("Vary", "Origin")
        .with_body("page");
    let page = CachedPage::capture(&res, 10);
    assert_eq!(page.headers, vec![("Vary".to_string(), "Origin".to_string())]);
    assert!(page.replay(Response::new()).header("Access-Control-Allow-Origin").is_none());
}

#[test]
fn test_memory_cache_expiry_and_stats() {
    let cache = MemoryCache::new(4);
    let page = CachedPage {
        stored_at: 0,
        status: 200,
        headers: Vec::new(),
        body: b"x".to_vec(),
    };
    cache.set("live", page.clone(), Duration::from_secs(60)).unwrap();
    cache.set("dead", page.clone(), Duration::ZERO).unwrap();
    assert_eq!(cache.get("live").unwrap(), Some(page));
    assert_eq!(cache.get("dead").unwrap(), None);
    assert_eq!(cache.get("missing").unwrap(), None);
    assert_eq!(cache.stats(), (1, 2));
    assert!(cache.clear("live").unwrap());
    assert!(cache.is_empty());
}

#[test]
fn test_memory_cache_evicts_lru() {
    let cache = MemoryCache::new(1);
    let page = CachedPage {
        stored_at: 0,
        status: 200,
        headers: Vec::new(),
        body: Vec::new(),
    };
    cache.set("a", page.clone(), Duration::from_secs(60)).unwrap();
    cache.set("b", page, Duration::from_secs(60)).unwrap();
    assert_eq!(cache.len(), 1);
    assert!(cache.get("a").unwrap().is_none());
}
