//! Fixed-window limiter for the public search endpoint, keyed by client address.
//!
//! Limits are per process; a restart or a second instance starts fresh.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::{Error, Result};

/// Entries are swept once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct SearchRateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
}

impl SearchRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn check(&self, client: &str) -> Result<()> {
        self.check_at(client, Instant::now())
    }

    /// Counts one request from `client` at `now`, or returns `TooManyRequests`
    /// with the time left in the current window.
    pub fn check_at(&self, client: &str, now: Instant) -> Result<()> {
        if self.windows.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let mut entry = self.windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        } else if entry.count >= self.max_requests {
            let retry_after = self.window - elapsed;
            debug!(client, ?retry_after, "search rate limit hit");
            return Err(Error::TooManyRequests { retry_after });
        }

        entry.count += 1;
        Ok(())
    }

    fn sweep(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }
}
