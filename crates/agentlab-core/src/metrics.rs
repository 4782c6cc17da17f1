//! Global atomic counters for AgentLab observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a session ends).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations, no locking.
pub struct Metrics {
    agents_created: AtomicU64,
    agents_updated: AtomicU64,
    agents_deleted: AtomicU64,
    experiments_started: AtomicU64,
    experiments_completed: AtomicU64,
    experiments_cancelled: AtomicU64,
    ticks_processed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            agents_created: AtomicU64::new(0),
            agents_updated: AtomicU64::new(0),
            agents_deleted: AtomicU64::new(0),
            experiments_started: AtomicU64::new(0),
            experiments_completed: AtomicU64::new(0),
            experiments_cancelled: AtomicU64::new(0),
            ticks_processed: AtomicU64::new(0),
        }
    }

    pub fn inc_agents_created(&self) {
        self.agents_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agents_created", "counter incremented");
    }

    pub fn inc_agents_updated(&self) {
        self.agents_updated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agents_updated", "counter incremented");
    }

    pub fn inc_agents_deleted(&self) {
        self.agents_deleted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agents_deleted", "counter incremented");
    }

    pub fn inc_experiments_started(&self) {
        self.experiments_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "experiments_started", "counter incremented");
    }

    pub fn inc_experiments_completed(&self) {
        self.experiments_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "experiments_completed", "counter incremented");
    }

    pub fn inc_experiments_cancelled(&self) {
        self.experiments_cancelled.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "experiments_cancelled", "counter incremented");
    }

    /// Called once per scoring tick; no trace event, ticks are already traced.
    pub fn inc_ticks(&self) {
        self.ticks_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            agents_created = self.agents_created(),
            agents_updated = self.agents_updated(),
            agents_deleted = self.agents_deleted(),
            experiments_started = self.experiments_started(),
            experiments_completed = self.experiments_completed(),
            experiments_cancelled = self.experiments_cancelled(),
            ticks_processed = self.ticks_processed(),
        );
    }

    pub fn agents_created(&self) -> u64 {
        self.agents_created.load(Ordering::Relaxed)
    }

    pub fn agents_updated(&self) -> u64 {
        self.agents_updated.load(Ordering::Relaxed)
    }

    pub fn agents_deleted(&self) -> u64 {
        self.agents_deleted.load(Ordering::Relaxed)
    }

    pub fn experiments_started(&self) -> u64 {
        self.experiments_started.load(Ordering::Relaxed)
    }

    pub fn experiments_completed(&self) -> u64 {
        self.experiments_completed.load(Ordering::Relaxed)
    }

    pub fn experiments_cancelled(&self) -> u64 {
        self.experiments_cancelled.load(Ordering::Relaxed)
    }

    pub fn ticks_processed(&self) -> u64 {
        self.ticks_processed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.agents_created.store(0, Ordering::Relaxed);
        self.agents_updated.store(0, Ordering::Relaxed);
        self.agents_deleted.store(0, Ordering::Relaxed);
        self.experiments_started.store(0, Ordering::Relaxed);
        self.experiments_completed.store(0, Ordering::Relaxed);
        self.experiments_cancelled.store(0, Ordering::Relaxed);
        self.ticks_processed.store(0, Ordering::Relaxed);
    }
}
