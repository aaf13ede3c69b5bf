use std::borrow::Cow;
use std::io::{self, Write};

use super::headers::Headers;
use super::throttle::{ConnectionState, Throttle, DEFAULT_CHUNK_SIZE};

/// Reason phrase for the status line.
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        _ => "OK",
    }
}

/// Outgoing response.
///
/// Responses are plain values: interceptors and handlers take one by value
/// and return the (possibly modified) response. [`Response::send`] writes it
/// exactly once; later calls are no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
    throttle_kbps: u32,
    chunk_size: usize,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty `200 OK` response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: Vec::new(),
            throttle_kbps: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sent: false,
        }
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Replace the status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Header set.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable header set.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// First value of a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Replace a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Append a header value.
    #[must_use]
    pub fn with_added_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Drop a header.
    #[must_use]
    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        self
    }

    /// Body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text (lossy).
    #[must_use]
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Append to the body.
    #[must_use]
    pub fn write(mut self, chunk: impl AsRef<[u8]>) -> Self {
        self.body.extend_from_slice(chunk.as_ref());
        self
    }

    /// Emission rate limit in kilobytes per second (0 = unthrottled).
    #[must_use]
    pub fn throttle_kbps(&self) -> u32 {
        self.throttle_kbps
    }

    /// Set the emission rate limit.
    #[must_use]
    pub fn with_throttle(mut self, kbps: u32) -> Self {
        self.throttle_kbps = kbps;
        self
    }

    /// Chunk size used for throttled emission.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// `true` once [`Response::send`] has written the response.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Write status line, headers and body to `out`.
    ///
    /// On the CLI channel only the body is written. A throttled response is
    /// paced and stops early when `conn` reports an abort. Returns the number
    /// of body bytes written; a second call writes nothing and returns 0.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `out`.
    pub fn send<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        cli: bool,
        conn: &dyn ConnectionState,
    ) -> io::Result<usize> {
        if self.sent {
            return Ok(0);
        }
        self.sent = true;

        if !cli {
            write!(out, "HTTP/1.1 {} {}\r\n", self.status, status_reason(self.status))?;
            for (name, value) in self.headers.iter() {
                write!(out, "{name}: {value}\r\n")?;
            }
            out.write_all(b"\r\n")?;
        }

        if self.throttle_kbps > 0 {
            let emission = Throttle::new(self.throttle_kbps)
                .with_chunk_size(self.chunk_size)
                .emit(out, &self.body, conn)?;
            return Ok(emission.bytes_sent);
        }

        out.write_all(&self.body)?;
        out.flush()?;
        Ok(self.body.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Connected;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(405), "Method Not Allowed");
    }

    #[test]
    fn test_send_is_idempotent() {
        let mut res = Response::new().with_header("Content-Type", "text/plain").with_body("hello");
        let mut out = Vec::new();
        assert_eq!(res.send(&mut out, false, &Connected).unwrap(), 5);
        assert_eq!(res.send(&mut out, false, &Connected).unwrap(), 0);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("hello").count(), 1);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(res.is_sent());
    }

    #[test]
    fn test_cli_send_suppresses_headers() {
        let mut res = Response::new().with_header("X-Test", "1").with_body("body");
        let mut out = Vec::new();
        res.send(&mut out, true, &Connected).unwrap();
        assert_eq!(out, b"body");
    }

    #[test]
    fn test_multi_value_headers_are_separate_lines() {
        let mut res = Response::new()
            .with_added_header("Set-Cookie", "a=1")
            .with_added_header("Set-Cookie", "b=2");
        let mut out = Vec::new();
        res.send(&mut out, false, &Connected).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Set-Cookie: a=1\r\nSet-Cookie: b=2\r\n"));
    }
}
