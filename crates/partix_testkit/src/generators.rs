//! Property-based test generators using proptest.
//!
//! Provides strategies for generating partition layouts. Keys are assigned to
//! partitions by modulo, so the per-partition key sets of a layout are always
//! disjoint.

use crate::fixtures::ModuloPartitioner;
use partix_core::types::PartitionId;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

/// Keys and attribute values spread over a number of partitions.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    /// Number of partitions; key `k` belongs to partition `k % partition_count`.
    pub partition_count: u32,
    /// Cache key and attribute value pairs, one per key.
    pub entries: Vec<(u64, Option<i64>)>,
}

impl PartitionLayout {
    /// Creates a layout. A partition count of zero is treated as one.
    pub fn new(partition_count: u32, entries: Vec<(u64, Option<i64>)>) -> Self {
        Self {
            partition_count: partition_count.max(1),
            entries,
        }
    }

    /// Returns the partitioner matching this layout.
    pub fn partitioner(&self) -> ModuloPartitioner {
        ModuloPartitioner::new(self.partition_count)
    }

    /// Returns the owning partition of a key.
    pub fn owner(&self, key: u64) -> PartitionId {
        PartitionId::new((key % u64::from(self.partition_count)) as u32)
    }

    /// Returns every key whose attribute value is `value`.
    pub fn keys_with(&self, value: &Option<i64>) -> HashSet<u64> {
        self.entries
            .iter()
            .filter(|(_, v)| v == value)
            .map(|(key, _)| *key)
            .collect()
    }

    /// Returns the distinct attribute values in natural order (null first).
    pub fn distinct_values(&self) -> BTreeSet<Option<i64>> {
        self.entries.iter().map(|(_, value)| *value).collect()
    }

    /// Returns the number of partitions holding at least one key with the
    /// attribute value.
    pub fn partitions_with(&self, value: &Option<i64>) -> usize {
        self.entries
            .iter()
            .filter(|(_, v)| v == value)
            .map(|(key, _)| self.owner(*key))
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Strategy for generating attribute values. A narrow range makes values
/// collide across partitions.
pub fn attribute_value_strategy() -> impl Strategy<Value = Option<i64>> {
    prop::option::weighted(0.9, -20i64..20)
}

/// Strategy for generating layouts of up to `max_partitions` partitions and
/// fewer than `max_keys` keys.
pub fn layout_strategy(
    max_partitions: u32,
    max_keys: usize,
) -> impl Strategy<Value = PartitionLayout> {
    (
        1..=max_partitions.max(1),
        prop::collection::hash_map(0u64..10_000, attribute_value_strategy(), 0..max_keys),
    )
        .prop_map(|(partition_count, entries)| {
            let mut entries: Vec<_> = entries.into_iter().collect();
            entries.sort_unstable();
            PartitionLayout::new(partition_count, entries)
        })
}

/// An index maintenance operation for testing.
#[derive(Debug, Clone)]
pub enum IndexOperation {
    /// Index a key under an attribute value
    Insert {
        /// Cache key
        key: u64,
        /// Attribute value
        value: Option<i64>,
    },
    /// Remove a key from the index
    Delete {
        /// Cache key
        key: u64,
    },
}

/// Strategy for generating index operations over a small key space.
pub fn index_operation_strategy() -> impl Strategy<Value = IndexOperation> {
    prop_oneof![
        3 => (0u64..64, attribute_value_strategy())
            .prop_map(|(key, value)| IndexOperation::Insert { key, value }),
        1 => (0u64..64).prop_map(|key| IndexOperation::Delete { key }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<IndexOperation>> {
    prop::collection::vec(index_operation_strategy(), min_ops..max_ops)
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
