//! Partition index registry.
//!
//! Owns the partition table behind a lock so that partition write paths and
//! composite queries can share it. A query pins the table for its whole
//! duration; writes wait until no view is alive.

use crate::config::CompositeConfig;
use crate::error::{CoreError, CoreResult};
use crate::index::{
    CompositeIndexMap, HashPartitionIndex, IndexSpec, PartitionIndex, SortedPartitionIndex,
    ViewContext,
};
use crate::partition::{
    KeyPartitioner, PartitionSampler, PartitionScope, PartitionTable, RandomSampler,
};
use crate::types::{AttributeValue, CacheKey, Extractor, PartitionId};
use parking_lot::RwLock;
use tracing::debug;

/// Kind of partition index created by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Unordered, hash based.
    Hash,
    /// Ordered by the natural ordering of the attribute values.
    Sorted,
}

/// Shared owner of every partition's indexes.
pub struct IndexRegistry<K, E> {
    /// Partition ID to extractor to index.
    table: RwLock<PartitionTable<K, E>>,
    /// Resolves the owning partition of a key.
    partitioner: Box<dyn KeyPartitioner<K>>,
    /// Picks the representative partition of explicit scopes.
    sampler: Box<dyn PartitionSampler>,
    /// Configuration handed to every view.
    config: CompositeConfig,
}

impl<K: CacheKey, E: AttributeValue> IndexRegistry<K, E> {
    /// Creates an empty registry.
    pub fn new(partitioner: impl KeyPartitioner<K> + 'static) -> Self {
        Self {
            table: RwLock::new(PartitionTable::new()),
            partitioner: Box::new(partitioner),
            sampler: Box::new(RandomSampler),
            config: CompositeConfig::default(),
        }
    }

    /// Replaces the representative partition sampler.
    #[must_use]
    pub fn with_sampler(mut self, sampler: impl PartitionSampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: CompositeConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    /// Adds a partition without indexes.
    pub fn add_partition(&self, id: PartitionId) {
        self.table.write().add_partition(id);
        debug!("Added partition {}", id);
    }

    /// Removes a partition with all its indexes.
    ///
    /// Returns true if the partition existed.
    pub fn remove_partition(&self, id: PartitionId) -> bool {
        let removed = self.table.write().remove_partition(id).is_some();
        if removed {
            debug!("Removed partition {}", id);
        }
        removed
    }

    /// Registers an index for a partition, replacing any previous index for
    /// the same extractor.
    pub fn register_index(
        &self,
        id: PartitionId,
        extractor: Extractor,
        index: Box<dyn PartitionIndex<K, E>>,
    ) {
        debug!("Registering index for {} in {}", extractor, id);
        self.table.write().insert_index(id, extractor, index);
    }

    /// Creates an empty index of the given kind in a partition.
    pub fn create_index(&self, id: PartitionId, spec: IndexSpec, kind: IndexKind) {
        let extractor = spec.extractor.clone();
        let index: Box<dyn PartitionIndex<K, E>> = match kind {
            IndexKind::Hash => Box::new(HashPartitionIndex::new(spec)),
            IndexKind::Sorted => Box::new(SortedPartitionIndex::new(spec)),
        };
        self.register_index(id, extractor, index);
    }

    /// Drops the index for an extractor from a partition.
    ///
    /// Returns true if the index existed.
    pub fn drop_index(&self, id: PartitionId, extractor: &Extractor) -> bool {
        let dropped = self.table.write().remove_index(id, extractor).is_some();
        if dropped {
            debug!("Dropped index for {} in {}", extractor, id);
        }
        dropped
    }

    /// Resolves the partition that owns a key.
    pub fn partition_of(&self, key: &K) -> PartitionId {
        self.partitioner.partition_of(key)
    }

    /// Returns the registered partition IDs in ascending order.
    pub fn partition_ids(&self) -> Vec<PartitionId> {
        self.table.read().partition_ids().collect()
    }

    /// Runs `f` against a partition's index under the write lock.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PartitionNotFound` if the partition is not
    /// registered and `CoreError::IndexNotFound` if it has no index for the
    /// extractor. Errors returned by `f` pass through unchanged.
    pub fn with_partition_index_mut<R, F>(
        &self,
        id: PartitionId,
        extractor: &Extractor,
        f: F,
    ) -> CoreResult<R>
    where
        F: FnOnce(&mut dyn PartitionIndex<K, E>) -> CoreResult<R>,
    {
        let mut table = self.table.write();
        if !table.contains_partition(id) {
            return Err(CoreError::PartitionNotFound {
                partition: id.as_u32(),
            });
        }
        let index = table
            .index_mut(id, extractor)
            .ok_or_else(|| CoreError::IndexNotFound {
                partition: id.as_u32(),
                extractor: extractor.to_string(),
            })?;
        f(&mut **index)
    }

    /// Indexes a key in its owning partition.
    pub fn index_entry(&self, key: K, extractor: &Extractor, value: Option<E>) -> CoreResult<()> {
        let owner = self.partition_of(&key);
        self.with_partition_index_mut(owner, extractor, |index| index.insert(key, value))
    }

    /// Removes a key from its owning partition's index.
    ///
    /// Returns true if the key was indexed.
    pub fn remove_entry(&self, key: &K, extractor: &Extractor) -> CoreResult<bool> {
        let owner = self.partition_of(key);
        self.with_partition_index_mut(owner, extractor, |index| index.delete(key))
    }

    /// Runs `f` against a composite view of the scope.
    ///
    /// The table is read-locked until `f` returns, so the view sees a stable
    /// snapshot.
    pub fn with_view<R, F>(&self, scope: &PartitionScope, f: F) -> R
    where
        F: FnOnce(&CompositeIndexMap<'_, K, E>) -> R,
    {
        let table = self.table.read();
        let ctx = ViewContext::new(&*table, scope, &*self.partitioner)
            .with_sampler(&*self.sampler)
            .with_config(&self.config);
        f(&CompositeIndexMap::from_context(ctx))
    }
}

impl<K, E> std::fmt::Debug for IndexRegistry<K, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexRegistry")
            .field("table", &*self.table.read())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ContentsView, MapIndex};
    use crate::partition::{FirstSampler, HashPartitioner};
    use crate::types::IndexValue;

    fn pid(id: u32) -> PartitionId {
        PartitionId::new(id)
    }

    fn registry(kind: IndexKind) -> IndexRegistry<u64, i64> {
        let registry = IndexRegistry::new(HashPartitioner::new(4)).with_sampler(FirstSampler);
        for id in 0..4 {
            registry.create_index(pid(id), IndexSpec::new("age"), kind);
        }
        registry
    }

    #[test]
    fn entries_land_in_owning_partition() {
        let registry = registry(IndexKind::Hash);
        let age = Extractor::new("age");

        for key in 0..40u64 {
            registry.index_entry(key, &age, Some((key % 5) as i64)).unwrap();
        }

        for key in 0..40u64 {
            let owner = registry.partition_of(&key);
            registry.with_view(&PartitionScope::single(owner), |map| {
                let index = map.get(&age).unwrap();
                assert!(!index.is_composite());
                assert_eq!(index.get(&key), IndexValue::Value(Some((key % 5) as i64)));
            });
        }
    }

    #[test]
    fn view_merges_all_partitions() {
        let registry = registry(IndexKind::Sorted);
        let age = Extractor::new("age");

        for key in 0..40u64 {
            registry.index_entry(key, &age, Some((key % 5) as i64)).unwrap();
        }

        registry.with_view(&PartitionScope::Owned, |map| {
            let index = map.get(&age).unwrap();
            assert!(index.is_ordered());

            let contents = index.as_composite().unwrap().index_contents();
            assert_eq!(contents.len(), 5);
            assert_eq!(contents.get(&Some(3)).len(), 8);

            let sorted = contents.as_sorted().unwrap();
            let range = sorted.sub_map(&Some(1), &Some(3)).unwrap();
            assert_eq!(range.len(), 2);
        });
    }

    #[test]
    fn remove_entry_updates_views() {
        let registry = registry(IndexKind::Hash);
        let age = Extractor::new("age");

        registry.index_entry(7, &age, Some(30)).unwrap();
        assert!(registry.remove_entry(&7, &age).unwrap());
        assert!(!registry.remove_entry(&7, &age).unwrap());

        registry.with_view(&PartitionScope::Owned, |map| {
            let index = map.get(&age).unwrap();
            assert!(index.get(&7).is_no_value());
        });
    }

    #[test]
    fn missing_partition_and_index() {
        let registry: IndexRegistry<u64, i64> = IndexRegistry::new(HashPartitioner::new(2));
        let age = Extractor::new("age");

        let err = registry
            .with_partition_index_mut(pid(0), &age, |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, CoreError::PartitionNotFound { partition: 0 });

        registry.add_partition(pid(0));
        let err = registry
            .with_partition_index_mut(pid(0), &age, |_| Ok(()))
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::IndexNotFound {
                partition: 0,
                extractor: "age".to_string(),
            }
        );
    }

    #[test]
    fn index_errors_pass_through() {
        let registry: IndexRegistry<u64, i64> = IndexRegistry::new(|_: &u64| PartitionId::new(0));
        let email = Extractor::new("email");
        registry.create_index(pid(0), IndexSpec::new("email").unique(), IndexKind::Hash);

        registry.index_entry(1, &email, Some(100)).unwrap();
        let err = registry.index_entry(2, &email, Some(100)).unwrap_err();
        assert!(matches!(err, CoreError::UniqueViolation { .. }));
    }

    #[test]
    fn drop_index_and_partition() {
        let registry = registry(IndexKind::Hash);
        let age = Extractor::new("age");

        assert!(registry.drop_index(pid(0), &age));
        assert!(!registry.drop_index(pid(0), &age));

        // Partition 0 is the representative of the owned scope
        registry.with_view(&PartitionScope::Owned, |map| {
            assert!(map.get(&age).is_none());
        });

        assert!(registry.remove_partition(pid(0)));
        assert!(!registry.remove_partition(pid(0)));
        assert_eq!(registry.partition_ids(), vec![pid(1), pid(2), pid(3)]);

        registry.with_view(&PartitionScope::Owned, |map| {
            assert!(map.get(&age).is_some());
        });
    }

    #[test]
    fn concurrent_readers() {
        let registry = registry(IndexKind::Hash);
        let age = Extractor::new("age");
        for key in 0..100u64 {
            registry.index_entry(key, &age, Some((key % 10) as i64)).unwrap();
        }

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    registry.with_view(&PartitionScope::Owned, |map| {
                        let index = map.get(&age).unwrap();
                        let contents = index.as_composite().unwrap().index_contents();
                        assert_eq!(contents.len(), 10);
                        assert_eq!(contents.get(&Some(4)).len(), 10);
                    });
                });
            }
        });
    }

    #[test]
    fn custom_config_reaches_views() {
        let registry =
            registry(IndexKind::Hash).with_config(CompositeConfig::new().units_overhead(1.0));
        let age = Extractor::new("age");
        registry.index_entry(1, &age, Some(1)).unwrap();

        let raw: u64 = registry
            .partition_ids()
            .into_iter()
            .map(|id| {
                registry
                    .with_partition_index_mut(id, &age, |index| Ok(index.units()))
                    .unwrap()
            })
            .sum();

        registry.with_view(&PartitionScope::Owned, |map| {
            assert_eq!(map.get(&age).unwrap().units(), raw);
        });
        assert_eq!(registry.config().units_overhead, 1.0);
    }
}
