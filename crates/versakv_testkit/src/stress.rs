//! Stress helpers for versakv.
//!
//! These drive many threads through the engine at once. Each helper returns
//! counts the caller can check against the engine's final state.

use std::thread;
use std::time::{Duration, Instant};
use versakv_core::{CoreResult, Engine, Value};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total transactions attempted.
    pub total_txns: usize,
    /// Committed transactions.
    pub committed: usize,
    /// Aborted transactions.
    pub aborted: usize,
    /// Total duration.
    pub duration: Duration,
    /// Transactions per second.
    pub txns_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(committed: usize, aborted: usize, duration: Duration) -> Self {
        let total = committed + aborted;
        let txns_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_txns: total,
            committed,
            aborted,
            duration,
            txns_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total transactions: {}", self.total_txns);
        println!("Committed: {}", self.committed);
        println!("Aborted: {}", self.aborted);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} txns/sec", self.txns_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Transactions per thread.
    pub txns_per_thread: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of accounts for transfer tests.
    pub accounts: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            txns_per_thread: 200,
            threads: 4,
            accounts: 8,
        }
    }
}

fn run_threads<F>(config: &StressConfig, work: F) -> StressTestResult
where
    F: Fn(usize, usize) -> CoreResult<()> + Sync,
{
    let start = Instant::now();

    let per_thread: Vec<(usize, usize)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.threads)
            .map(|t| {
                let work = &work;
                scope.spawn(move || {
                    let mut committed = 0;
                    let mut aborted = 0;
                    for i in 0..config.txns_per_thread {
                        match work(t, i) {
                            Ok(()) => committed += 1,
                            Err(_) => aborted += 1,
                        }
                    }
                    (committed, aborted)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("Thread panicked"))
            .collect()
    });

    let committed = per_thread.iter().map(|(c, _)| c).sum();
    let aborted = per_thread.iter().map(|(_, a)| a).sum();
    StressTestResult::new(committed, aborted, start.elapsed())
}

/// Increments `key` from every thread, one increment per transaction.
///
/// `key` must already hold a committed value. Afterwards it holds that
/// value plus `result.committed`.
pub fn stress_concurrent_increments(
    engine: &Engine,
    key: &str,
    config: &StressConfig,
) -> StressTestResult {
    run_threads(config, |_, _| engine.transaction(|tx| tx.inc(key).map(|_| ())))
}

/// Moves one unit between pseudo-random pairs of `accounts`.
///
/// Each transfer locks its two accounts in name order, so transfers never
/// deadlock. The sum over all accounts is unchanged afterwards.
pub fn stress_transfers(
    engine: &Engine,
    accounts: &[String],
    config: &StressConfig,
) -> StressTestResult {
    let n = accounts.len();
    assert!(n >= 2, "transfers need at least two accounts");

    run_threads(config, |t, i| {
        let from = (t * 7 + i * 3) % n;
        let to = (from + 1 + (i % (n - 1))) % n;
        let (from, to) = (&accounts[from], &accounts[to]);

        engine.transaction(|tx| {
            if from < to {
                tx.dec(from.as_str())?;
                tx.inc(to.as_str())?;
            } else {
                tx.inc(to.as_str())?;
                tx.dec(from.as_str())?;
            }
            Ok(())
        })
    })
}

/// Runs transactions that write `key` and abort every other time.
///
/// Returns with `key` holding its value before the run plus the number of
/// committed transactions.
pub fn stress_interleaved_aborts(
    engine: &Engine,
    key: &str,
    config: &StressConfig,
) -> StressTestResult {
    run_threads(config, |_, i| {
        let tid = engine.begin();
        engine.inc(key, tid)?;
        if i % 2 == 0 {
            engine.abort(tid)?;
            Err(versakv_core::CoreError::transaction_aborted(tid, "planned abort"))
        } else {
            engine.commit(tid)
        }
    })
}

/// Sums the committed values of `keys`.
pub fn total(engine: &Engine, keys: &[String]) -> CoreResult<Value> {
    engine.transaction(|tx| {
        let mut sum = 0;
        for key in keys {
            sum += tx.get(key.as_str())?.value().unwrap_or(0);
        }
        Ok(sum)
    })
}
