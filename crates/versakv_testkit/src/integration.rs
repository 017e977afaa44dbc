//! Model-checking harness.
//!
//! Runs generated workloads one transaction at a time against an engine
//! and a plain map, and checks that both agree.

use crate::generators::{Operation, TransactionPlan, KEY_SPACE};
use std::collections::{BTreeMap, HashSet};
use versakv_core::{CoreResult, Engine, Key, ReadResult, TransactionId, Value};

/// Outcome of one planned transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Committed as planned.
    Committed,
    /// Aborted as planned.
    Aborted,
    /// The engine aborted it (missing key on inc, dec or del).
    SelfAborted,
}

/// A test harness comparing the engine to a map of committed values.
pub struct ModelHarness<'a> {
    engine: &'a Engine,
    /// Committed value per key; `None` for deleted keys.
    committed: BTreeMap<String, Option<Value>>,
    /// Last committed writer per key.
    writers: BTreeMap<String, TransactionId>,
}

impl<'a> ModelHarness<'a> {
    /// Creates a harness over an empty engine.
    pub fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            committed: BTreeMap::new(),
            writers: BTreeMap::new(),
        }
    }

    /// Runs one planned transaction against engine and model.
    ///
    /// Reads of keys the transaction already wrote are skipped: a reader
    /// waits on its own uncommitted versions.
    pub fn run(&mut self, plan: &TransactionPlan) -> CoreResult<PlanOutcome> {
        let tid = self.engine.begin();
        let mut pending: BTreeMap<String, Option<Value>> = BTreeMap::new();
        let mut written: HashSet<String> = HashSet::new();

        for op in &plan.ops {
            let key = op.key().to_string();
            let current = pending
                .get(&key)
                .copied()
                .unwrap_or_else(|| self.committed.get(&key).copied().flatten());

            match op {
                Operation::Put { value, .. } => {
                    self.engine.put(key.as_str(), *value, tid)?;
                    pending.insert(key.clone(), Some(*value));
                }
                Operation::Inc { .. } | Operation::Dec { .. } => {
                    let delta = if matches!(op, Operation::Inc { .. }) { 1 } else { -1 };
                    let result = if delta > 0 {
                        self.engine.inc(key.as_str(), tid)
                    } else {
                        self.engine.dec(key.as_str(), tid)
                    };
                    match (current, result) {
                        (Some(old), Ok(new)) => {
                            assert_eq!(new, old + delta, "{op:?} returned wrong value");
                            pending.insert(key.clone(), Some(new));
                        }
                        (None, Err(e)) if e.is_aborted() => return Ok(PlanOutcome::SelfAborted),
                        (expected, result) => {
                            panic!("{op:?}: model has {expected:?}, engine returned {result:?}")
                        }
                    }
                }
                Operation::Del { .. } => match (current, self.engine.del(key.as_str(), tid)) {
                    (Some(_), Ok(())) => {
                        pending.insert(key.clone(), None);
                    }
                    (None, Err(e)) if e.is_aborted() => return Ok(PlanOutcome::SelfAborted),
                    (expected, result) => {
                        panic!("{op:?}: model has {expected:?}, engine returned {result:?}")
                    }
                },
                Operation::Get { .. } => {
                    if !written.contains(&key) {
                        let actual = self.engine.get(key.as_str(), tid)?;
                        assert_eq!(actual, expected_read(current), "{op:?} in {tid}");
                    }
                }
            }

            if !matches!(op, Operation::Get { .. }) {
                written.insert(key);
            }
        }

        if plan.commit {
            self.engine.commit(tid)?;
            for (key, value) in pending {
                self.writers.insert(key.clone(), tid);
                self.committed.insert(key, value);
            }
            Ok(PlanOutcome::Committed)
        } else {
            self.engine.abort(tid)?;
            Ok(PlanOutcome::Aborted)
        }
    }

    /// Checks every key of the key space against the model.
    pub fn verify_all(&self) -> CoreResult<()> {
        let tid = self.engine.begin();
        for key in KEY_SPACE {
            let expected = expected_read(self.committed.get(key).copied().flatten());
            assert_eq!(self.engine.get(key, tid)?, expected, "final read of {key}");
        }
        self.engine.commit(tid)
    }

    /// Checks the shape of every chain.
    ///
    /// Each chain has at most one open version, and it belongs to the last
    /// committed writer of the key. Keys nobody committed have no versions.
    pub fn verify_chains(&self) {
        for key in KEY_SPACE {
            let chain = self.engine.store().chain(&Key::from(key));
            let versions = chain.as_ref().map_or(0, |c| c.len());
            match self.writers.get(key) {
                Some(writer) => {
                    let chain = chain.expect("committed key has a chain");
                    assert_eq!(chain.open_count(), 1, "open versions of {key}");
                    let latest = chain.latest().expect("chain is not empty");
                    assert!(latest.is_open());
                    assert_eq!(latest.tid_begin, *writer, "latest writer of {key}");
                }
                None => assert_eq!(versions, 0, "uncommitted key {key} has versions"),
            }
        }
    }

    /// Returns the model's committed value for `key`.
    pub fn committed(&self, key: &str) -> Option<Value> {
        self.committed.get(key).copied().flatten()
    }
}

fn expected_read(value: Option<Value>) -> ReadResult {
    value.map_or(ReadResult::NotFound, ReadResult::Value)
}
