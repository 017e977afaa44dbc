//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random transaction workloads over a
//! small key space, so that transactions collide often.

use proptest::prelude::*;
use versakv_core::Value;

/// Keys every generated workload draws from.
pub const KEY_SPACE: [&str; 4] = ["k0", "k1", "k2", "k3"];

/// Strategy for picking a key from [`KEY_SPACE`].
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(KEY_SPACE.to_vec()).prop_map(str::to_string)
}

/// Strategy for generating stored values.
///
/// Kept far from the integer limits so increments never overflow.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    -1_000..1_000i64
}

/// A single operation inside a generated transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Store a value.
    Put {
        /// Target key
        key: String,
        /// Value to store
        value: Value,
    },
    /// Increment a value.
    Inc {
        /// Target key
        key: String,
    },
    /// Decrement a value.
    Dec {
        /// Target key
        key: String,
    },
    /// Delete a key.
    Del {
        /// Target key
        key: String,
    },
    /// Read a key.
    Get {
        /// Target key
        key: String,
    },
}

impl Operation {
    /// Returns the key the operation touches.
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. }
            | Self::Inc { key }
            | Self::Dec { key }
            | Self::Del { key }
            | Self::Get { key } => key,
        }
    }
}

/// Strategy for generating operations.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| Operation::Put { key, value }),
        2 => key_strategy().prop_map(|key| Operation::Inc { key }),
        1 => key_strategy().prop_map(|key| Operation::Dec { key }),
        1 => key_strategy().prop_map(|key| Operation::Del { key }),
        2 => key_strategy().prop_map(|key| Operation::Get { key }),
    ]
}

/// A generated transaction: its operations and how it should end.
#[derive(Debug, Clone)]
pub struct TransactionPlan {
    /// Operations in program order.
    pub ops: Vec<Operation>,
    /// Commit if true, abort otherwise.
    pub commit: bool,
}

/// Strategy for generating one transaction, committing three times in four.
pub fn transaction_plan_strategy() -> impl Strategy<Value = TransactionPlan> {
    (
        prop::collection::vec(operation_strategy(), 0..6),
        prop::bool::weighted(0.75),
    )
        .prop_map(|(ops, commit)| TransactionPlan { ops, commit })
}

/// Strategy for generating a sequence of transactions.
pub fn workload_strategy(
    min_txns: usize,
    max_txns: usize,
) -> impl Strategy<Value = Vec<TransactionPlan>> {
    prop::collection::vec(transaction_plan_strategy(), min_txns..max_txns)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
