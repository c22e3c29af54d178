//! Shared health state for the /health endpoint.
//! Updated by the announcements handler around each fetch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Fetch activity counters. Written by the handler, read by /health.
#[derive(Default)]
pub struct HealthState {
    /// True while a fetch owns the portal session.
    pub fetch_in_progress: AtomicBool,
    pub fetches_completed: AtomicU64,
    pub fetches_failed: AtomicU64,
    /// Row count of the last successful fetch.
    pub last_fetch_rows: AtomicU64,
    /// Nanosecond timestamp of the last successful fetch (0 = none).
    pub last_fetch_at_ns: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a fetch as running until the returned guard is dropped, including
    /// when the handler future is cancelled mid-fetch.
    pub fn begin_fetch(&self) -> FetchGuard<'_> {
        self.fetch_in_progress.store(true, Ordering::Relaxed);
        FetchGuard { health: self }
    }

    pub fn record_success(&self, rows: u64) {
        self.last_fetch_rows.store(rows, Ordering::Relaxed);
        self.last_fetch_at_ns.store(now_ns(), Ordering::Relaxed);
        self.fetches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.fetches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthResponse {
        HealthResponse {
            fetch_in_progress: self.fetch_in_progress.load(Ordering::Relaxed),
            fetches_completed: self.fetches_completed.load(Ordering::Relaxed),
            fetches_failed: self.fetches_failed.load(Ordering::Relaxed),
            last_fetch_rows: self.last_fetch_rows.load(Ordering::Relaxed),
            last_fetch_at_ns: self.last_fetch_at_ns.load(Ordering::Relaxed),
        }
    }
}

pub struct FetchGuard<'a> {
    health: &'a HealthState,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.health.fetch_in_progress.store(false, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub fetch_in_progress: bool,
    pub fetches_completed: u64,
    pub fetches_failed: u64,
    pub last_fetch_rows: u64,
    pub last_fetch_at_ns: u64,
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
