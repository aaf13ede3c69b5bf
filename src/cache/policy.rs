use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};

use crate::server::{Request, Response};

/// `Expires` value for responses that must not be cached.
pub const EXPIRED_DATE: &str = "Fri, 01 Jan 1990 00:00:00 GMT";

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Short, stable, base-36 digest of a string (11 characters).
#[must_use]
pub fn hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let tail = &digest[digest.len() - 8..];
    let mut n = tail.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

    let mut out = Vec::with_capacity(13);
    loop {
        let d = (n % 36) as u8;
        out.push(if d < 10 { b'0' + d } else { b'a' + d - 10 });
        n /= 36;
        if n == 0 {
            break;
        }
    }
    while out.len() < 11 {
        out.push(b'0');
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Cache key of a page: digest of `"VERB uri"` plus `.url`.
#[must_use]
pub fn page_key(method: &str, uri: &str) -> String {
    format!("{}.url", hash(&format!("{method} {uri}")))
}

/// Format a timestamp as an RFC 7231 HTTP-date.
#[must_use]
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE).to_string()
}

/// Parse an HTTP-date (RFC 7231 IMF-fixdate or RFC 2822).
#[must_use]
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(value, HTTP_DATE)
                .ok()
                .map(|d| Utc.from_utc_datetime(&d))
        })
}

/// Set client caching and security headers.
///
/// CLI requests are returned untouched. Security headers are only added when
/// absent; an empty `xframe` skips `X-Frame-Options`. GET and HEAD with
/// `secs > 0` get `Cache-Control: max-age`, `Expires` and (when absent)
/// `Last-Modified`; everything else is marked uncacheable.
#[must_use]
pub fn expire(req: &Request, res: Response, secs: i64, xframe: &str, now: DateTime<Utc>) -> Response {
    if req.is_cli() {
        return res;
    }

    let mut res = res;
    if !xframe.is_empty() && !res.headers().contains("X-Frame-Options") {
        res = res.with_header("X-Frame-Options", xframe);
    }
    if !res.headers().contains("X-Content-Type-Options") {
        res = res.with_header("X-Content-Type-Options", "nosniff");
    }
    if !res.headers().contains("X-XSS-Protection") {
        res = res.with_header("X-XSS-Protection", "1; mode=block");
    }

    let cacheable = secs > 0 && matches!(req.method.as_str(), "GET" | "HEAD");
    if cacheable {
        res = res
            .without_header("Pragma")
            .with_header("Cache-Control", format!("max-age={secs}"))
            .with_header("Expires", http_date(now + chrono::Duration::seconds(secs)));
        if !res.headers().contains("Last-Modified") {
            res = res.with_header("Last-Modified", http_date(now));
        }
        res
    } else {
        res.with_header("Pragma", "no-cache")
            .with_header("Cache-Control", "no-cache, no-store, must-revalidate")
            .with_header("Expires", EXPIRED_DATE)
    }
}
