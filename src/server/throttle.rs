//! Bandwidth-limited body emission.
//!
//! A route registered with a kbps limit has its body written in fixed-size
//! chunks; after each chunk the writer sleeps until the elapsed time catches
//! up with `bytes_sent / (kbps * 1024)`. Sleeps are sliced so a client abort
//! is noticed within one slice.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Longest uninterrupted pacing sleep.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Reports whether the client went away.
pub trait ConnectionState: Send + Sync {
    /// `true` once the connection has been aborted.
    fn is_aborted(&self) -> bool;
}

/// A connection that never aborts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Connected;

impl ConnectionState for Connected {
    fn is_aborted(&self) -> bool {
        false
    }
}

impl ConnectionState for AtomicBool {
    fn is_aborted(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T: ConnectionState + ?Sized> ConnectionState for Arc<T> {
    fn is_aborted(&self) -> bool {
        (**self).is_aborted()
    }
}

/// Outcome of a throttled emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    /// Bytes written to the sink
    pub bytes_sent: usize,
    /// `true` if emission stopped because the connection was aborted
    pub aborted: bool,
}

/// Paced writer for a single body.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    bytes_per_sec: f64,
    chunk_size: usize,
}

impl Throttle {
    /// Throttle at `kbps` kilobytes per second (minimum 1).
    #[must_use]
    pub fn new(kbps: u32) -> Self {
        Self {
            bytes_per_sec: f64::from(kbps.max(1)) * 1024.0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the chunk size (minimum 1 byte).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Write `body` to `out` without exceeding the configured rate.
    ///
    /// # Errors
    ///
    /// Propagates write and flush failures from `out`.
    pub fn emit<W: Write + ?Sized>(
        &self,
        out: &mut W,
        body: &[u8],
        conn: &dyn ConnectionState,
    ) -> io::Result<Emission> {
        let start = Instant::now();
        let mut sent = 0usize;

        for chunk in body.chunks(self.chunk_size) {
            if conn.is_aborted() {
                return Ok(self.stopped(sent));
            }
            out.write_all(chunk)?;
            out.flush()?;
            sent += chunk.len();

            #[allow(clippy::cast_precision_loss)]
            let expected = Duration::from_secs_f64(sent as f64 / self.bytes_per_sec);
            let elapsed = start.elapsed();
            if expected > elapsed && !pace(expected - elapsed, conn) {
                return Ok(self.stopped(sent));
            }
        }

        Ok(Emission {
            bytes_sent: sent,
            aborted: false,
        })
    }

    fn stopped(&self, sent: usize) -> Emission {
        debug!(bytes_sent = sent, "Throttled emission stopped: connection aborted");
        Emission {
            bytes_sent: sent,
            aborted: true,
        }
    }
}

/// Sleep for `total`, waking every slice to check for an abort.
/// Returns `false` if the connection was aborted meanwhile.
fn pace(total: Duration, conn: &dyn ConnectionState) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if conn.is_aborted() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_bound() {
        // 1 KB/s, 1 KB body in 256-byte chunks: at least 1s minus one chunk of slack.
        let body = vec![b'x'; 1024];
        let mut out = Vec::new();
        let start = Instant::now();
        let emission = Throttle::new(1)
            .with_chunk_size(256)
            .emit(&mut out, &body, &Connected)
            .unwrap();
        let elapsed = start.elapsed();
        assert_eq!(emission.bytes_sent, 1024);
        assert!(!emission.aborted);
        assert_eq!(out, body);
        assert!(elapsed >= Duration::from_millis(750), "elapsed {elapsed:?}");
    }

    #[test]
    fn test_abort_stops_emission() {
        let aborted = AtomicBool::new(true);
        let mut out = Vec::new();
        let emission = Throttle::new(1)
            .with_chunk_size(16)
            .emit(&mut out, &[0u8; 64], &aborted)
            .unwrap();
        assert!(emission.aborted);
        assert_eq!(emission.bytes_sent, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_zero_kbps_is_clamped() {
        let t = Throttle::new(0);
        assert!((t.bytes_per_sec - 1024.0).abs() < f64::EPSILON);
    }
}
