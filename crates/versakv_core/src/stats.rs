//! Engine statistics.
//!
//! Counters are updated by the transaction manager and the version store
//! and can be read while transactions are running.
//!
//! ```rust,ignore
//! let engine = Engine::open_in_memory()?;
//! // ...
//! let stats = engine.stats().snapshot();
//! println!("commits: {}", stats.commits);
//! println!("blocked reads: {}", stats.read_waits);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Engine statistics.
///
/// All counters are monotonically increasing.
#[derive(Debug, Default)]
pub struct EngineStats {
    begins: AtomicU64,
    commits: AtomicU64,
    aborts: AtomicU64,
    /// Aborts the engine triggered itself (missing key, overflow).
    self_aborts: AtomicU64,
    reads: AtomicU64,
    /// Times a reader suspended on an uncommitted version.
    read_waits: AtomicU64,
    writes: AtomicU64,
    ordering_anomalies: AtomicU64,
    persistence_failures: AtomicU64,
}

impl EngineStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_begin(&self) {
        self.begins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_self_abort(&self) {
        self.self_aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read_wait(&self) {
        self.read_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ordering_anomaly(&self) {
        self.ordering_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of transactions begun.
    pub fn begins(&self) -> u64 {
        self.begins.load(Ordering::Relaxed)
    }

    /// Returns the number of transactions committed.
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Returns the number of transactions aborted, self-aborts included.
    pub fn aborts(&self) -> u64 {
        self.aborts.load(Ordering::Relaxed)
    }

    /// Returns the number of aborts triggered by the engine itself.
    pub fn self_aborts(&self) -> u64 {
        self.self_aborts.load(Ordering::Relaxed)
    }

    /// Returns the number of transactional reads.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns how often a reader had to wait for another transaction.
    pub fn read_waits(&self) -> u64 {
        self.read_waits.load(Ordering::Relaxed)
    }

    /// Returns the number of applied writes (put, inc, dec, del).
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns how often a write closed a version newer than itself.
    pub fn ordering_anomalies(&self) -> u64 {
        self.ordering_anomalies.load(Ordering::Relaxed)
    }

    /// Returns the number of snapshot saves that failed.
    pub fn persistence_failures(&self) -> u64 {
        self.persistence_failures.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            begins: self.begins(),
            commits: self.commits(),
            aborts: self.aborts(),
            self_aborts: self.self_aborts(),
            reads: self.reads(),
            read_waits: self.read_waits(),
            writes: self.writes(),
            ordering_anomalies: self.ordering_anomalies(),
            persistence_failures: self.persistence_failures(),
        }
    }
}

/// A point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Transactions begun.
    pub begins: u64,
    /// Transactions committed.
    pub commits: u64,
    /// Transactions aborted.
    pub aborts: u64,
    /// Aborts triggered by the engine.
    pub self_aborts: u64,
    /// Transactional reads.
    pub reads: u64,
    /// Reader suspensions on uncommitted data.
    pub read_waits: u64,
    /// Applied writes.
    pub writes: u64,
    /// Writes that closed a newer version.
    pub ordering_anomalies: u64,
    /// Failed snapshot saves.
    pub persistence_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = EngineStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_transactions() {
        let stats = EngineStats::new();

        stats.record_begin();
        stats.record_begin();
        stats.record_commit();
        stats.record_abort();
        stats.record_self_abort();

        let snap = stats.snapshot();
        assert_eq!(snap.begins, 2);
        assert_eq!(snap.commits, 1);
        assert_eq!(snap.aborts, 1);
        assert_eq!(snap.self_aborts, 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(EngineStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_read();
                        s.record_write();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.reads(), 800);
        assert_eq!(stats.writes(), 800);
    }
}
