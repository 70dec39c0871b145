//! Test fixtures and partition table helpers.
//!
//! Provides convenience functions for building partition tables from a
//! [`PartitionLayout`] and for the common composite view scenarios.

use crate::generators::PartitionLayout;
use partix_core::index::{
    CompositeIndexMap, HashPartitionIndex, IndexSpec, PartitionIndex, SortedPartitionIndex,
};
use partix_core::partition::{FirstSampler, KeyPartitioner, PartitionScope, PartitionTable};
use partix_core::registry::{IndexKind, IndexRegistry};
use partix_core::types::{Extractor, PartitionId};

/// Name of the extractor every layout fixture indexes.
pub const VALUE_EXTRACTOR: &str = "value";

/// Returns the extractor every layout fixture indexes.
pub fn value_extractor() -> Extractor {
    Extractor::new(VALUE_EXTRACTOR)
}

/// Assigns key `k` to partition `k % partition_count`.
#[derive(Debug, Clone, Copy)]
pub struct ModuloPartitioner {
    partition_count: u32,
}

impl ModuloPartitioner {
    /// Creates a partitioner over `partition_count` partitions (at least one).
    pub fn new(partition_count: u32) -> Self {
        Self {
            partition_count: partition_count.max(1),
        }
    }
}

impl KeyPartitioner<u64> for ModuloPartitioner {
    fn partition_of(&self, key: &u64) -> PartitionId {
        PartitionId::new((*key % u64::from(self.partition_count)) as u32)
    }
}

fn new_index(kind: IndexKind) -> Box<dyn PartitionIndex<u64, i64>> {
    match kind {
        IndexKind::Hash => Box::new(HashPartitionIndex::new(IndexSpec::new(VALUE_EXTRACTOR))),
        IndexKind::Sorted => Box::new(SortedPartitionIndex::new(IndexSpec::new(VALUE_EXTRACTOR))),
    }
}

/// Builds a partition table holding one index per partition for the layout.
pub fn layout_table(layout: &PartitionLayout, kind: IndexKind) -> PartitionTable<u64, i64> {
    let extractor = value_extractor();
    let mut table = PartitionTable::new();
    for id in 0..layout.partition_count {
        table.insert_index(PartitionId::new(id), extractor.clone(), new_index(kind));
    }

    for (key, value) in &layout.entries {
        table
            .index_mut(layout.owner(*key), &extractor)
            .expect("Layout partition should have an index")
            .insert(*key, *value)
            .expect("Non-unique index should accept every entry");
    }
    table
}

/// Builds a registry populated with the layout.
pub fn layout_registry(layout: &PartitionLayout, kind: IndexKind) -> IndexRegistry<u64, i64> {
    let extractor = value_extractor();
    let registry = IndexRegistry::new(layout.partitioner()).with_sampler(FirstSampler);
    for id in 0..layout.partition_count {
        registry.create_index(PartitionId::new(id), IndexSpec::new(VALUE_EXTRACTOR), kind);
    }
    for (key, value) in &layout.entries {
        registry
            .index_entry(*key, &extractor, *value)
            .expect("Failed to index entry");
    }
    registry
}

/// Runs a test against a composite view of a layout.
///
/// # Example
///
/// ```rust
/// use partix_core::partition::PartitionScope;
/// use partix_core::registry::IndexKind;
/// use partix_testkit::{with_layout_view, PartitionLayout};
///
/// let layout = PartitionLayout::new(2, vec![(0, Some(1)), (1, Some(1))]);
/// with_layout_view(&layout, IndexKind::Hash, &PartitionScope::Owned, |map| {
///     assert_eq!(map.len(), 1);
/// });
/// ```
pub fn with_layout_view<F, R>(
    layout: &PartitionLayout,
    kind: IndexKind,
    scope: &PartitionScope,
    f: F,
) -> R
where
    F: FnOnce(&CompositeIndexMap<'_, u64, i64>) -> R,
{
    let table = layout_table(layout, kind);
    let partitioner = layout.partitioner();
    let map = CompositeIndexMap::new(&table, scope, &partitioner).with_sampler(&FirstSampler);
    f(&map)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use partix_core::index::MutableMapIndex;

    /// Name of the extractor of the string scenarios.
    pub const CITY: &str = "city";

    /// Owner of the string scenario keys: `k1` lives in partition 0, every
    /// other key in partition 1.
    pub fn string_owner(key: &&'static str) -> PartitionId {
        match *key {
            "k1" => PartitionId::new(0),
            _ => PartitionId::new(1),
        }
    }

    /// Partition 0 maps `"a"` to `{k1}`; partition 1 maps `"a"` to `{k2}` and
    /// `"b"` to `{k3}`.
    pub fn two_partition_table() -> PartitionTable<&'static str, String> {
        let mut p0 = HashPartitionIndex::new(IndexSpec::new(CITY));
        p0.insert("k1", Some("a".to_string()))
            .expect("Failed to index k1");

        let mut p1 = HashPartitionIndex::new(IndexSpec::new(CITY));
        p1.insert("k2", Some("a".to_string()))
            .expect("Failed to index k2");
        p1.insert("k3", Some("b".to_string()))
            .expect("Failed to index k3");

        let mut table = PartitionTable::new();
        table.insert_index(PartitionId::new(0), Extractor::new(CITY), Box::new(p0));
        table.insert_index(PartitionId::new(1), Extractor::new(CITY), Box::new(p1));
        table
    }

    /// Ordered layout whose attribute values are `null`, `3` and `1`, spread
    /// over three partitions.
    pub fn null_three_one() -> PartitionLayout {
        PartitionLayout::new(3, vec![(0, None), (1, Some(3)), (2, Some(1))])
    }

    /// Layout of `partitions` partitions whose last partition is partial.
    pub fn partial_table(partitions: u32) -> PartitionTable<u64, i64> {
        let partitions = partitions.max(1);
        let mut table = PartitionTable::new();
        for id in 0..partitions {
            let mut index = HashPartitionIndex::new(IndexSpec::new(VALUE_EXTRACTOR));
            index
                .insert(u64::from(id), Some(i64::from(id)))
                .expect("Failed to index entry");
            if id == partitions - 1 {
                index.mark_unindexable(&(u64::from(id) + u64::from(partitions)));
            }
            table.insert_index(PartitionId::new(id), value_extractor(), Box::new(index));
        }
        table
    }
}
