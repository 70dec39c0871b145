//! Unordered composite view over partition index contents.

use crate::error::{CoreError, CoreResult};
use crate::index::chained::ChainedSet;
use crate::index::context::ViewContext;
use crate::index::traits::{ContentsView, PartitionContents};
use crate::types::{AttributeValue, CacheKey, Extractor};
use std::collections::HashSet;
use std::fmt;

const STRUCTURE: &str = "IndexContents";

/// Inverse mapping (attribute value to key set) merged across the partitions
/// in scope.
///
/// Nothing is copied out of the partitions: point lookups chain the partition
/// key sets, and only [`key_set`](Self::key_set) materializes the distinct
/// attribute values.
pub struct IndexContents<'a, K, E> {
    ctx: ViewContext<'a, K, E>,
    extractor: Extractor,
}

impl<'a, K: CacheKey, E: AttributeValue> IndexContents<'a, K, E> {
    pub(crate) fn new(ctx: ViewContext<'a, K, E>, extractor: Extractor) -> Self {
        Self { ctx, extractor }
    }

    /// Returns the context this view reads through.
    pub(crate) fn context(&self) -> ViewContext<'a, K, E> {
        self.ctx
    }

    /// Returns the extractor of the underlying indexes.
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Iterates over the local contents of every in-scope partition that has
    /// an index for the extractor.
    pub(crate) fn partition_contents(
        &self,
    ) -> impl Iterator<Item = &'a dyn PartitionContents<K, E>> + 'a {
        self.ctx
            .indexes(&self.extractor)
            .map(|(_, index)| index.contents())
    }

    /// Returns the distinct attribute values across all partitions in scope.
    pub fn key_set(&self) -> HashSet<&'a Option<E>> {
        let mut keys = HashSet::new();
        for contents in self.partition_contents() {
            keys.extend(contents.keys());
        }
        keys
    }

    /// Iterates over the key set of every attribute value.
    ///
    /// Each value is computed when the iterator reaches it and is not cached.
    pub fn values(&self) -> impl Iterator<Item = ChainedSet<'a, K>> + 'a {
        let contents = self.clone();
        self.key_set()
            .into_iter()
            .map(move |value| contents.get(value))
    }

    /// Iterates over the entries, computing each entry's key set on demand.
    pub fn entries(&self) -> impl Iterator<Item = ContentEntry<'a, K, E>> + 'a {
        let contents = self.clone();
        self.key_set()
            .into_iter()
            .map(move |value| ContentEntry::new(value, contents.clone()))
    }
}

impl<'a, K: CacheKey, E: AttributeValue> ContentsView<'a, K, E> for IndexContents<'a, K, E> {
    fn is_empty(&self) -> bool {
        self.partition_contents().all(|contents| contents.is_empty())
    }

    fn len(&self) -> usize {
        self.key_set().len()
    }

    fn contains_key(&self, value: &Option<E>) -> bool {
        self.partition_contents()
            .any(|contents| contents.contains_key(value))
    }

    fn get(&self, value: &Option<E>) -> ChainedSet<'a, K> {
        let mut sets = Vec::with_capacity(self.ctx.partition_count());
        for contents in self.partition_contents() {
            if let Some(keys) = contents.get(value) {
                if !keys.is_empty() {
                    sets.push(keys);
                }
            }
        }
        ChainedSet::new(sets)
    }

    fn contains_value(&self, keys: &HashSet<K>) -> bool {
        self.values().any(|chained| chained.set_eq(keys))
    }

    fn put(&mut self, _value: Option<E>, _keys: HashSet<K>) -> CoreResult<()> {
        Err(CoreError::read_only(STRUCTURE, "put"))
    }

    fn remove(&mut self, _value: &Option<E>) -> CoreResult<()> {
        Err(CoreError::read_only(STRUCTURE, "remove"))
    }

    fn clear(&mut self) -> CoreResult<()> {
        Err(CoreError::read_only(STRUCTURE, "clear"))
    }
}

impl<K, E> Clone for IndexContents<'_, K, E> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx,
            extractor: self.extractor.clone(),
        }
    }
}

impl<K, E> fmt::Debug for IndexContents<'_, K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexContents")
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

/// A virtual entry of a composite inverse mapping.
///
/// The key set is computed each time [`value`](Self::value) is called.
pub struct ContentEntry<'a, K, E> {
    key: &'a Option<E>,
    contents: IndexContents<'a, K, E>,
}

impl<'a, K: CacheKey, E: AttributeValue> ContentEntry<'a, K, E> {
    pub(crate) fn new(key: &'a Option<E>, contents: IndexContents<'a, K, E>) -> Self {
        Self { key, contents }
    }

    /// Returns the attribute value of this entry.
    pub fn key(&self) -> &'a Option<E> {
        self.key
    }

    /// Returns the union of the key sets indexed under the attribute value.
    pub fn value(&self) -> ChainedSet<'a, K> {
        self.contents.get(self.key)
    }

    /// Always fails: composite entries are read-only.
    pub fn set_value(&mut self, _keys: HashSet<K>) -> CoreResult<()> {
        Err(CoreError::read_only("ContentEntry", "set_value"))
    }
}

impl<K, E: fmt::Debug> fmt::Debug for ContentEntry<'_, K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentEntry").field("key", self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{HashPartitionIndex, IndexSpec, MutableMapIndex};
    use crate::partition::{PartitionScope, PartitionSet, PartitionTable};
    use crate::types::PartitionId;

    fn pid(id: u32) -> PartitionId {
        PartitionId::new(id)
    }

    fn value(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    /// Partition 0: a -> {k1}; partition 1: a -> {k2}, b -> {k3}.
    fn table() -> PartitionTable<&'static str, String> {
        let mut table = PartitionTable::new();

        let mut p0 = HashPartitionIndex::new(IndexSpec::new("attr"));
        p0.insert("k1", value("a")).unwrap();
        let mut p1 = HashPartitionIndex::new(IndexSpec::new("attr"));
        p1.insert("k2", value("a")).unwrap();
        p1.insert("k3", value("b")).unwrap();

        table.insert_index(pid(0), Extractor::new("attr"), Box::new(p0));
        table.insert_index(pid(1), Extractor::new("attr"), Box::new(p1));
        table.add_partition(pid(2));
        table
    }

    fn owner(_: &&'static str) -> PartitionId {
        PartitionId::new(0)
    }

    #[test]
    fn merges_partitions() {
        let table = table();
        let scope = PartitionScope::only([pid(0), pid(1)]);
        let ctx = ViewContext::new(&table, &scope, &owner);
        let contents = IndexContents::new(ctx, Extractor::new("attr"));

        let a = contents.get(&value("a"));
        assert_eq!(a.len(), 2);
        assert!(a.contains(&"k1"));
        assert!(a.contains(&"k2"));
        assert_eq!(a.member_count(), 2);

        let keys = contents.key_set();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&value("a")));
        assert!(keys.contains(&value("b")));
        assert_eq!(contents.len(), 2);
        assert!(!contents.is_empty());
    }

    #[test]
    fn respects_scope() {
        let table = table();
        let scope = PartitionScope::only([pid(0)]);
        let ctx = ViewContext::new(&table, &scope, &owner);
        let contents = IndexContents::new(ctx, Extractor::new("attr"));

        assert_eq!(contents.get(&value("a")).len(), 1);
        assert!(!contents.contains_key(&value("b")));
        assert_eq!(contents.len(), 1);
    }

    #[test]
    fn missing_value_yields_empty_chain() {
        let table = table();
        let scope = PartitionScope::Owned;
        let ctx = ViewContext::new(&table, &scope, &owner);
        let contents = IndexContents::new(ctx, Extractor::new("attr"));

        let missing = contents.get(&value("zzz"));
        assert!(missing.is_empty());
        assert_eq!(missing.member_count(), 0);
        assert!(!contents.contains_key(&None));
    }

    #[test]
    fn empty_scope_is_empty() {
        let table = table();
        let scope = PartitionScope::Only(PartitionSet::default());
        let ctx = ViewContext::new(&table, &scope, &owner);
        let contents = IndexContents::new(ctx, Extractor::new("attr"));

        assert!(contents.is_empty());
        assert_eq!(contents.len(), 0);
        assert_eq!(contents.values().count(), 0);
    }

    #[test]
    fn values_and_entries_are_computed_lazily() {
        let table = table();
        let scope = PartitionScope::Owned;
        let ctx = ViewContext::new(&table, &scope, &owner);
        let contents = IndexContents::new(ctx, Extractor::new("attr"));

        let total: usize = contents.values().map(|keys| keys.len()).sum();
        assert_eq!(total, 3);

        // A second pass recomputes the same values
        let again: usize = contents.values().map(|keys| keys.len()).sum();
        assert_eq!(again, 3);

        for entry in contents.entries() {
            let expected = if entry.key() == &value("a") { 2 } else { 1 };
            assert_eq!(entry.value().len(), expected);
        }
    }

    #[test]
    fn contains_value_compares_sets() {
        let table = table();
        let scope = PartitionScope::Owned;
        let ctx = ViewContext::new(&table, &scope, &owner);
        let contents = IndexContents::new(ctx, Extractor::new("attr"));

        assert!(contents.contains_value(&HashSet::from(["k1", "k2"])));
        assert!(contents.contains_value(&HashSet::from(["k3"])));
        assert!(!contents.contains_value(&HashSet::from(["k1"])));
    }

    #[test]
    fn mutators_are_read_only() {
        let table = table();
        let scope = PartitionScope::Owned;
        let ctx = ViewContext::new(&table, &scope, &owner);
        let mut contents = IndexContents::new(ctx, Extractor::new("attr"));

        assert!(contents.put(value("c"), HashSet::new()).unwrap_err().is_read_only());
        assert!(contents.remove(&value("a")).unwrap_err().is_read_only());
        assert!(contents.clear().unwrap_err().is_read_only());

        let mut entry = contents.entries().next().unwrap();
        assert!(entry.set_value(HashSet::new()).unwrap_err().is_read_only());

        // Partitions are untouched
        assert_eq!(contents.get(&value("a")).len(), 2);
        assert_eq!(contents.len(), 2);
    }
}
