use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct SessionMetrics {
    pub connect_attempts: AtomicU64,
    pub connections_established: AtomicU64,
    pub retries_scheduled: AtomicU64,
    pub runtime_errors: AtomicU64,
    pub bytes_rendered: AtomicU64,
}

pub(crate) fn incr(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn add(counter: &AtomicU64, value: u64) {
    counter.fetch_add(value, Ordering::Relaxed);
}
