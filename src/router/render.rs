use serde_json::json;

use crate::server::{status_reason, Request, Response};

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Default error text: `HTTP 404 (GET /path?query)`.
#[must_use]
pub fn error_text(req: &Request, code: u16) -> String {
    let mut target = format!("{} {}", req.method, req.path);
    if !req.query.is_empty() {
        target.push('?');
        target.push_str(&req.query);
    }
    format!("HTTP {code} ({target})")
}

/// Render an error status for the request's channel.
///
/// CLI gets a plain text block, AJAX a JSON object, everything else a small
/// HTML page. With `quiet` only the status is set.
#[must_use]
pub fn error_page(req: &Request, res: Response, code: u16, text: Option<&str>, quiet: bool) -> Response {
    let res = res.with_status(code);
    if quiet {
        return res;
    }
    let status = status_reason(code);
    let text = text.map_or_else(|| error_text(req, code), str::to_string);

    if req.is_cli() {
        let rule = "=".repeat(35);
        res.with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(format!("\n{rule}\nERROR {code} - {status}\n{text}\n\n"))
    } else if req.is_ajax() {
        let body = json!({ "status": status, "code": code, "text": text });
        res.with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    } else {
        res.with_header("Content-Type", "text/html; charset=utf-8").with_body(format!(
            "<!DOCTYPE html>\n<html>\n<head><title>{code} {status}</title></head>\n<body>\n<h1>{status}</h1>\n<p>{}</p>\n</body>\n</html>",
            escape_html(&text)
        ))
    }
}
