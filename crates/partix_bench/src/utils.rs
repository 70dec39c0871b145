//! Benchmark utilities.

use partix_core::index::{HashPartitionIndex, IndexSpec, PartitionIndex, SortedPartitionIndex};
use partix_core::partition::PartitionTable;
use partix_core::registry::IndexKind;
use partix_core::types::{Extractor, PartitionId};
use rand::Rng;

/// Extractor indexed by every generated table.
pub const EXTRACTOR: &str = "value";

/// Owner of a key in a table of `partitions` partitions.
pub fn owner(key: u64, partitions: u32) -> PartitionId {
    PartitionId::new((key % u64::from(partitions.max(1))) as u32)
}

/// Generate random attribute values in `0..distinct`, with roughly one null
/// in a hundred.
pub fn random_values(count: usize, distinct: i64) -> Vec<Option<i64>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            if rng.gen_ratio(1, 100) {
                None
            } else {
                Some(rng.gen_range(0..distinct.max(1)))
            }
        })
        .collect()
}

/// Generate a table of `partitions` partitions holding keys `0..keys`, each
/// indexed under a random attribute value.
pub fn generate_table(
    partitions: u32,
    keys: usize,
    distinct: i64,
    kind: IndexKind,
) -> PartitionTable<u64, i64> {
    let extractor = Extractor::new(EXTRACTOR);
    let mut table = PartitionTable::new();
    for id in 0..partitions.max(1) {
        let index: Box<dyn PartitionIndex<u64, i64>> = match kind {
            IndexKind::Hash => Box::new(HashPartitionIndex::new(IndexSpec::new(EXTRACTOR))),
            IndexKind::Sorted => Box::new(SortedPartitionIndex::new(IndexSpec::new(EXTRACTOR))),
        };
        table.insert_index(PartitionId::new(id), extractor.clone(), index);
    }

    for (key, value) in random_values(keys, distinct).into_iter().enumerate() {
        let key = key as u64;
        if let Some(index) = table.index_mut(owner(key, partitions), &extractor) {
            index.insert(key, value).unwrap();
        }
    }
    table
}
