//! Extractor-keyed composite view over a partition scope.

use crate::config::CompositeConfig;
use crate::error::{CoreError, CoreResult};
use crate::index::comparator::Comparator;
use crate::index::composite::CompositeIndex;
use crate::index::context::ViewContext;
use crate::index::traits::{MapIndex, PartitionIndex};
use crate::partition::{KeyPartitioner, PartitionSampler, PartitionScope, PartitionTable};
use crate::types::{AttributeValue, CacheKey, Extractor, IndexValue, PartitionId};
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

const STRUCTURE: &str = "CompositeIndexMap";

/// Read-only map from extractor to the index covering a partition scope.
///
/// Lookups sample one representative partition for the index metadata. A
/// scope naming exactly one partition returns that partition's index itself;
/// any other scope returns a [`CompositeIndex`].
///
/// # Example
///
/// ```rust
/// use partix_core::index::{CompositeIndexMap, HashPartitionIndex, IndexSpec, MutableMapIndex};
/// use partix_core::partition::{PartitionScope, PartitionTable};
/// use partix_core::types::{Extractor, PartitionId};
///
/// let mut table = PartitionTable::new();
/// for id in 0..2u32 {
///     let mut index = HashPartitionIndex::new(IndexSpec::new("city"));
///     index.insert(u64::from(id), Some("Oslo".to_string())).unwrap();
///     table.insert_index(PartitionId::new(id), Extractor::new("city"), Box::new(index));
/// }
///
/// let scope = PartitionScope::Owned;
/// let partitioner = |key: &u64| PartitionId::new(*key as u32);
/// let map = CompositeIndexMap::new(&table, &scope, &partitioner);
///
/// let index = map.get(&Extractor::new("city")).unwrap();
/// assert!(index.is_composite());
/// ```
pub struct CompositeIndexMap<'a, K, E> {
    ctx: ViewContext<'a, K, E>,
}

impl<'a, K: CacheKey, E: AttributeValue> CompositeIndexMap<'a, K, E> {
    /// Creates a map view with random sampling and the default configuration.
    pub fn new(
        table: &'a PartitionTable<K, E>,
        scope: &'a PartitionScope,
        partitioner: &'a dyn KeyPartitioner<K>,
    ) -> Self {
        Self::from_context(ViewContext::new(table, scope, partitioner))
    }

    /// Creates a map view from an existing context.
    pub fn from_context(ctx: ViewContext<'a, K, E>) -> Self {
        Self { ctx }
    }

    /// Replaces the representative partition sampler.
    #[must_use]
    pub fn with_sampler(self, sampler: &'a dyn PartitionSampler) -> Self {
        Self::from_context(self.ctx.with_sampler(sampler))
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(self, config: &'a CompositeConfig) -> Self {
        Self::from_context(self.ctx.with_config(config))
    }

    /// Returns the context this view reads through.
    pub fn context(&self) -> ViewContext<'a, K, E> {
        self.ctx
    }

    /// Returns the index for an extractor.
    ///
    /// Only the representative partition is probed: if it has no index for
    /// the extractor, `None` is returned even when other partitions do.
    pub fn get(&self, extractor: &Extractor) -> Option<IndexRef<'a, K, E>> {
        let Some(representative) = self.ctx.representative() else {
            trace!("No partition in scope {} for {}", self.ctx.scope(), extractor);
            return None;
        };

        let Some(index) = self.ctx.table().index(representative, extractor) else {
            trace!("No index for {} in {}", extractor, representative);
            return None;
        };

        if self.ctx.is_single_partition() {
            trace!("Index for {} served by {} directly", extractor, representative);
            return Some(IndexRef::Partition(index));
        }

        trace!("Composite index for {} sampled from {}", extractor, representative);
        Some(IndexRef::Composite(CompositeIndex::new(
            self.ctx,
            extractor.clone(),
            index.is_ordered(),
            index.comparator(),
        )))
    }

    /// Checks if an index is available for the extractor.
    pub fn contains_key(&self, extractor: &Extractor) -> bool {
        self.get(extractor).is_some()
    }

    /// Iterates over the partitions this view covers.
    pub fn partitions(&self) -> impl Iterator<Item = PartitionId> + 'a {
        self.ctx.partitions()
    }

    /// Iterates over the distinct extractors indexed by any partition in
    /// scope. Each call starts a fresh traversal.
    pub fn keys(&self) -> impl Iterator<Item = &'a Extractor> + 'a {
        let table = self.ctx.table();
        let mut seen = HashSet::new();
        self.ctx
            .partitions()
            .filter_map(move |id| table.partition(id))
            .flat_map(|indexes| indexes.keys())
            .filter(move |extractor| seen.insert(*extractor))
    }

    /// Returns the number of distinct extractors in scope.
    pub fn len(&self) -> usize {
        self.keys().count()
    }

    /// Returns true if no partition in scope has an index.
    pub fn is_empty(&self) -> bool {
        self.keys().next().is_none()
    }

    /// Always fails: the map is a read-only view.
    pub fn insert(
        &mut self,
        _extractor: Extractor,
        _index: Box<dyn PartitionIndex<K, E>>,
    ) -> CoreResult<()> {
        Err(CoreError::read_only(STRUCTURE, "insert"))
    }

    /// Always fails: the map is a read-only view.
    pub fn remove(&mut self, _extractor: &Extractor) -> CoreResult<()> {
        Err(CoreError::read_only(STRUCTURE, "remove"))
    }

    /// Always fails: the map is a read-only view.
    pub fn clear(&mut self) -> CoreResult<()> {
        Err(CoreError::read_only(STRUCTURE, "clear"))
    }
}

impl<K: CacheKey, E: AttributeValue> fmt::Display for CompositeIndexMap<'_, K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompositeIndexMap(scope={}, partitions={})",
            self.ctx.scope(),
            self.ctx.partition_count()
        )
    }
}

impl<K: CacheKey, E: AttributeValue> fmt::Debug for CompositeIndexMap<'_, K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeIndexMap")
            .field("scope", self.ctx.scope())
            .field("table", self.ctx.table())
            .finish()
    }
}

/// Index returned by [`CompositeIndexMap::get`].
pub enum IndexRef<'a, K, E> {
    /// The partition's own index, for single-partition scopes.
    Partition(&'a dyn PartitionIndex<K, E>),
    /// A composite over several partitions.
    Composite(CompositeIndex<'a, K, E>),
}

impl<'a, K, E> IndexRef<'a, K, E> {
    /// Returns the partition index, if this is the single-partition case.
    pub fn as_partition(&self) -> Option<&'a dyn PartitionIndex<K, E>> {
        match self {
            Self::Partition(index) => Some(*index),
            Self::Composite(_) => None,
        }
    }

    /// Returns the composite index, if several partitions are covered.
    pub fn as_composite(&self) -> Option<&CompositeIndex<'a, K, E>> {
        match self {
            Self::Partition(_) => None,
            Self::Composite(composite) => Some(composite),
        }
    }

    /// Returns true if this is a composite index.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}

impl<K: CacheKey, E: AttributeValue> MapIndex<K, E> for IndexRef<'_, K, E> {
    fn is_ordered(&self) -> bool {
        match self {
            Self::Partition(index) => index.is_ordered(),
            Self::Composite(composite) => composite.is_ordered(),
        }
    }

    fn comparator(&self) -> Option<Comparator<E>> {
        match self {
            Self::Partition(index) => index.comparator(),
            Self::Composite(composite) => composite.comparator(),
        }
    }

    fn is_partial(&self) -> bool {
        match self {
            Self::Partition(index) => index.is_partial(),
            Self::Composite(composite) => composite.is_partial(),
        }
    }

    fn get(&self, key: &K) -> IndexValue<E> {
        match self {
            Self::Partition(index) => index.get(key),
            Self::Composite(composite) => composite.get(key),
        }
    }

    fn units(&self) -> u64 {
        match self {
            Self::Partition(index) => index.units(),
            Self::Composite(composite) => composite.units(),
        }
    }
}

impl<K, E> fmt::Debug for IndexRef<'_, K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partition(_) => f.write_str("IndexRef::Partition"),
            Self::Composite(composite) => {
                f.debug_tuple("IndexRef::Composite").field(composite).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::traits::ContentsView;
    use crate::index::{HashPartitionIndex, IndexSpec, MutableMapIndex, SortedPartitionIndex};
    use crate::partition::{FirstSampler, HashPartitioner};

    fn pid(id: u32) -> PartitionId {
        PartitionId::new(id)
    }

    fn city(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    fn owner(key: &&'static str) -> PartitionId {
        match *key {
            "k1" => pid(0),
            _ => pid(1),
        }
    }

    /// Partition 0: city a -> {k1}; partition 1: city a -> {k2}, b -> {k3},
    /// plus a zip index only in partition 1.
    fn table() -> PartitionTable<&'static str, String> {
        let mut table = PartitionTable::new();

        let mut p0 = HashPartitionIndex::new(IndexSpec::new("city"));
        p0.insert("k1", city("a")).unwrap();
        let mut p1 = HashPartitionIndex::new(IndexSpec::new("city"));
        p1.insert("k2", city("a")).unwrap();
        p1.insert("k3", city("b")).unwrap();
        let zip = HashPartitionIndex::new(IndexSpec::new("zip"));

        table.insert_index(pid(0), Extractor::new("city"), Box::new(p0));
        table.insert_index(pid(1), Extractor::new("city"), Box::new(p1));
        table.insert_index(pid(1), Extractor::new("zip"), Box::new(zip));
        table
    }

    #[test]
    fn composite_lookup_merges_partitions() {
        let table = table();
        let scope = PartitionScope::Owned;
        let map = CompositeIndexMap::new(&table, &scope, &owner);

        let index = map.get(&Extractor::new("city")).unwrap();
        let composite = index.as_composite().unwrap();
        let contents = composite.index_contents();

        let a = contents.get(&city("a"));
        assert_eq!(a.len(), 2);
        assert!(a.contains(&"k1") && a.contains(&"k2"));
        assert_eq!(contents.len(), 2);
        assert!(contents.unordered().key_set().contains(&city("b")));

        assert_eq!(index.get(&"k3"), IndexValue::Value(city("b")));
        assert!(!index.is_ordered());
    }

    #[test]
    fn single_partition_returns_partition_index() {
        let table = table();
        let scope = PartitionScope::single(pid(1));
        let map = CompositeIndexMap::new(&table, &scope, &owner);
        let extractor = Extractor::new("city");

        let index = map.get(&extractor).unwrap();
        let raw = table.index(pid(1), &extractor).unwrap();

        assert!(!index.is_composite());
        let served = index.as_partition().unwrap();
        assert!(std::ptr::addr_eq(served as *const _, raw as *const _));
    }

    #[test]
    fn only_representative_is_probed() {
        let table = table();
        let scope = PartitionScope::Owned;
        let map = CompositeIndexMap::new(&table, &scope, &owner);

        // Partition 0 is the representative and has no zip index
        assert!(map.get(&Extractor::new("zip")).is_none());
        assert!(!map.contains_key(&Extractor::new("zip")));

        let scope = PartitionScope::only([pid(1), pid(2)]);
        let map = CompositeIndexMap::new(&table, &scope, &owner).with_sampler(&FirstSampler);
        assert!(map.contains_key(&Extractor::new("zip")));
    }

    #[test]
    fn missing_extractor_and_empty_scope() {
        let table = table();
        let scope = PartitionScope::Owned;
        let map = CompositeIndexMap::new(&table, &scope, &owner);
        assert!(map.get(&Extractor::new("street")).is_none());

        let empty_table: PartitionTable<&'static str, String> = PartitionTable::new();
        let map = CompositeIndexMap::new(&empty_table, &scope, &owner);
        assert!(map.get(&Extractor::new("city")).is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn keys_are_distinct() {
        let table = table();
        let scope = PartitionScope::Owned;
        let map = CompositeIndexMap::new(&table, &scope, &owner);

        let mut keys: Vec<&Extractor> = map.keys().collect();
        keys.sort();
        assert_eq!(keys, vec![&Extractor::new("city"), &Extractor::new("zip")]);
        assert_eq!(map.len(), 2);

        // A fresh call restarts the traversal
        assert_eq!(map.keys().count(), 2);

        let scope = PartitionScope::single(pid(0));
        let map = CompositeIndexMap::new(&table, &scope, &owner);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn partitions_follow_scope() {
        let table = table();
        let scope = PartitionScope::Owned;
        let map = CompositeIndexMap::new(&table, &scope, &owner);
        assert_eq!(map.partitions().collect::<Vec<_>>(), vec![pid(0), pid(1)]);

        let scope = PartitionScope::only([pid(1), pid(4)]);
        let map = CompositeIndexMap::new(&table, &scope, &owner);
        assert_eq!(map.partitions().collect::<Vec<_>>(), vec![pid(1), pid(4)]);
        assert_eq!(map.to_string(), "CompositeIndexMap(scope={1, 4}, partitions=2)");
    }

    #[test]
    fn map_is_read_only() {
        let table = table();
        let scope = PartitionScope::Owned;
        let mut map = CompositeIndexMap::new(&table, &scope, &owner);

        let index = Box::new(HashPartitionIndex::new(IndexSpec::new("zip")));
        assert!(map.insert(Extractor::new("zip"), index).unwrap_err().is_read_only());
        assert!(map.remove(&Extractor::new("city")).unwrap_err().is_read_only());
        assert!(map.clear().unwrap_err().is_read_only());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn ordered_metadata_is_sampled() {
        let mut table: PartitionTable<u64, i64> = PartitionTable::new();
        let partitioner = HashPartitioner::new(3);
        for id in 0..3u32 {
            let mut index = SortedPartitionIndex::new(IndexSpec::new("age"));
            for key in 0..30u64 {
                if partitioner.partition_of(&key) == pid(id) {
                    index.insert(key, Some(key as i64 % 7)).unwrap();
                }
            }
            table.insert_index(pid(id), Extractor::new("age"), Box::new(index));
        }

        let scope = PartitionScope::Owned;
        let map = CompositeIndexMap::new(&table, &scope, &partitioner);
        let index = map.get(&Extractor::new("age")).unwrap();

        assert!(index.is_ordered());
        assert!(matches!(index.comparator(), Some(Comparator::Safe(_))));
        assert_eq!(index.get(&12), IndexValue::Value(Some(5)));

        let contents = index.as_composite().unwrap().index_contents();
        let sorted = contents.as_sorted().unwrap();
        let keys: Vec<_> = sorted.key_set().iter().cloned().collect();
        assert_eq!(keys, (0..7).map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn random_sampler_over_uniform_partitions() {
        let table = table();
        let scope = PartitionScope::only([pid(0), pid(1)]);
        let map = CompositeIndexMap::new(&table, &scope, &owner);

        for _ in 0..16 {
            let index = map.get(&Extractor::new("city")).unwrap();
            assert!(index.is_composite());
            assert_eq!(index.get(&"k1"), IndexValue::Value(city("a")));
        }
    }
}
