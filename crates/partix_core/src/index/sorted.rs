//! Ordered composite view with range queries.

use crate::error::{CoreError, CoreResult};
use crate::index::chained::ChainedSet;
use crate::index::comparator::SafeComparator;
use crate::index::contents::{ContentEntry, IndexContents};
use crate::index::traits::ContentsView;
use crate::types::{AttributeValue, CacheKey, Extractor};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::ops::Bound;
use tracing::debug;

const STRUCTURE: &str = "SortedIndexContents";

/// Ordered composite inverse mapping.
///
/// Point operations delegate to the wrapped [`IndexContents`]. Range
/// operations ask every in-scope partition for its bounded view and merge the
/// results into a [`SortedRange`] ordered by the composite comparator.
pub struct SortedIndexContents<'a, K, E> {
    base: IndexContents<'a, K, E>,
    comparator: SafeComparator<E>,
}

impl<'a, K: CacheKey, E: AttributeValue> SortedIndexContents<'a, K, E> {
    pub(crate) fn new(base: IndexContents<'a, K, E>, comparator: SafeComparator<E>) -> Self {
        Self { base, comparator }
    }

    /// Returns the null-safe comparator ordering this view.
    pub fn comparator(&self) -> &SafeComparator<E> {
        &self.comparator
    }

    /// Returns the unordered view this one wraps.
    pub fn unordered(&self) -> &IndexContents<'a, K, E> {
        &self.base
    }

    /// Returns the extractor of the underlying indexes.
    pub fn extractor(&self) -> &Extractor {
        self.base.extractor()
    }

    /// Collects the entries within the bounds across all partitions in scope.
    ///
    /// Entries whose attribute values compare equal are merged into a single
    /// chained key set.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnorderedPartition` if a partition in scope indexes
    /// the extractor with unordered contents.
    pub fn range(
        &self,
        lower: Bound<&Option<E>>,
        upper: Bound<&Option<E>>,
    ) -> CoreResult<SortedRange<'a, K, E>> {
        let mut entries = Vec::new();
        let mut visited = 0usize;

        for (id, index) in self.base.context().indexes(self.base.extractor()) {
            let sorted = index.contents().as_sorted().ok_or_else(|| {
                CoreError::UnorderedPartition {
                    partition: id.as_u32(),
                    extractor: self.base.extractor().to_string(),
                }
            })?;
            entries.extend(sorted.range(lower, upper).filter(|(_, keys)| !keys.is_empty()));
            visited += 1;
        }

        let range = SortedRange::merge(self.comparator.clone(), entries);
        debug!(
            "Materialized range for {} over {} partitions: {} entries",
            self.base.extractor(),
            visited,
            range.len()
        );
        Ok(range)
    }

    /// Returns the entries in `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidRange` if `from` sorts after `to`, and
    /// `CoreError::UnorderedPartition` as [`range`](Self::range) does.
    pub fn sub_map(&self, from: &Option<E>, to: &Option<E>) -> CoreResult<SortedRange<'a, K, E>> {
        if self.comparator.compare(from, to) == Ordering::Greater {
            return Err(CoreError::invalid_range(format!(
                "lower bound {from:?} is greater than upper bound {to:?}"
            )));
        }
        self.range(Bound::Included(from), Bound::Excluded(to))
    }

    /// Returns the entries strictly below `to`.
    pub fn head_map(&self, to: &Option<E>) -> CoreResult<SortedRange<'a, K, E>> {
        self.range(Bound::Unbounded, Bound::Excluded(to))
    }

    /// Returns the entries at or above `from`.
    pub fn tail_map(&self, from: &Option<E>) -> CoreResult<SortedRange<'a, K, E>> {
        self.range(Bound::Included(from), Bound::Unbounded)
    }

    /// Returns the distinct attribute values in comparator order.
    pub fn key_set(&self) -> SortedKeySet<'a, E> {
        SortedKeySet::new(self.comparator.clone(), self.base.key_set())
    }

    /// Returns the smallest attribute value in scope.
    pub fn first_key(&self) -> Option<&'a Option<E>> {
        self.base
            .key_set()
            .into_iter()
            .min_by(|a, b| self.comparator.compare(a, b))
    }

    /// Returns the largest attribute value in scope.
    pub fn last_key(&self) -> Option<&'a Option<E>> {
        self.base
            .key_set()
            .into_iter()
            .max_by(|a, b| self.comparator.compare(a, b))
    }

    /// Iterates over the key sets in attribute value order.
    pub fn values(&self) -> impl Iterator<Item = ChainedSet<'a, K>> + 'a {
        let base = self.base.clone();
        self.key_set().into_iter().map(move |value| base.get(value))
    }

    /// Iterates over the entries in attribute value order.
    pub fn entries(&self) -> impl Iterator<Item = ContentEntry<'a, K, E>> + 'a {
        let base = self.base.clone();
        self.key_set()
            .into_iter()
            .map(move |value| ContentEntry::new(value, base.clone()))
    }
}

impl<'a, K: CacheKey, E: AttributeValue> ContentsView<'a, K, E> for SortedIndexContents<'a, K, E> {
    fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    fn len(&self) -> usize {
        self.key_set().len()
    }

    fn contains_key(&self, value: &Option<E>) -> bool {
        self.base.contains_key(value)
    }

    fn get(&self, value: &Option<E>) -> ChainedSet<'a, K> {
        self.base.get(value)
    }

    fn contains_value(&self, keys: &HashSet<K>) -> bool {
        self.base.contains_value(keys)
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

impl<K, E> Clone for SortedIndexContents<'_, K, E> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            comparator: self.comparator.clone(),
        }
    }
}

impl<K, E> fmt::Debug for SortedIndexContents<'_, K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedIndexContents")
            .field("base", &self.base)
            .field("comparator", &self.comparator)
            .finish()
    }
}

/// Materialized, ordered result of a composite range query.
///
/// Each attribute value appears once. Its key set chains the key sets of every
/// partition that indexed the value.
pub struct SortedRange<'a, K, E> {
    comparator: SafeComparator<E>,
    entries: Vec<(&'a Option<E>, ChainedSet<'a, K>)>,
}

impl<'a, K, E: Ord> SortedRange<'a, K, E> {
    fn merge(
        comparator: SafeComparator<E>,
        mut entries: Vec<(&'a Option<E>, &'a HashSet<K>)>,
    ) -> Self {
        // Stable, so merged members keep partition order
        entries.sort_by(|a, b| comparator.compare(a.0, b.0));

        let mut merged: Vec<(&'a Option<E>, ChainedSet<'a, K>)> = Vec::with_capacity(entries.len());
        for (value, keys) in entries {
            if let Some((last, chained)) = merged.last_mut() {
                if comparator.compare(*last, value) == Ordering::Equal {
                    *chained = std::mem::take(chained).chain(keys);
                    continue;
                }
            }
            merged.push((value, ChainedSet::from(keys)));
        }

        Self {
            comparator,
            entries: merged,
        }
    }

    /// Returns the number of distinct attribute values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the range holds no entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the key set of an attribute value.
    pub fn get(&self, value: &Option<E>) -> Option<&ChainedSet<'a, K>> {
        self.position(value).ok().map(|i| &self.entries[i].1)
    }

    /// Checks if the range holds the attribute value.
    pub fn contains_key(&self, value: &Option<E>) -> bool {
        self.position(value).is_ok()
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a Option<E>, &ChainedSet<'a, K>)> + '_ {
        self.entries.iter().map(|(value, keys)| (*value, keys))
    }

    /// Iterates over the attribute values in order.
    pub fn keys(&self) -> impl Iterator<Item = &'a Option<E>> + '_ {
        self.entries.iter().map(|(value, _)| *value)
    }

    /// Returns the smallest attribute value of the range.
    pub fn first_key(&self) -> Option<&'a Option<E>> {
        self.entries.first().map(|(value, _)| *value)
    }

    /// Returns the largest attribute value of the range.
    pub fn last_key(&self) -> Option<&'a Option<E>> {
        self.entries.last().map(|(value, _)| *value)
    }

    fn position(&self, value: &Option<E>) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(probe, _)| self.comparator.compare(probe, value))
    }
}

impl<'a, K, E> IntoIterator for SortedRange<'a, K, E> {
    type Item = (&'a Option<E>, ChainedSet<'a, K>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: fmt::Debug, E: fmt::Debug> fmt::Debug for SortedRange<'_, K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(value, keys)| (value, keys)))
            .finish()
    }
}

/// Distinct attribute values of an ordered composite view, in comparator
/// order.
pub struct SortedKeySet<'a, E> {
    comparator: SafeComparator<E>,
    keys: Vec<&'a Option<E>>,
}

impl<'a, E: Ord> SortedKeySet<'a, E> {
    fn new(comparator: SafeComparator<E>, keys: HashSet<&'a Option<E>>) -> Self {
        let mut keys: Vec<&'a Option<E>> = keys.into_iter().collect();
        keys.sort_by(|a, b| comparator.compare(a, b));
        keys.dedup_by(|a, b| comparator.compare(a, b) == Ordering::Equal);
        Self { comparator, keys }
    }

    /// Returns the number of attribute values.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the smallest attribute value.
    pub fn first(&self) -> Option<&'a Option<E>> {
        self.keys.first().copied()
    }

    /// Returns the largest attribute value.
    pub fn last(&self) -> Option<&'a Option<E>> {
        self.keys.last().copied()
    }

    /// Checks membership using the comparator.
    pub fn contains(&self, value: &Option<E>) -> bool {
        self.keys
            .binary_search_by(|probe| self.comparator.compare(probe, value))
            .is_ok()
    }

    /// Iterates over the attribute values in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Option<E>> + '_ {
        self.keys.iter().copied()
    }
}

impl<'a, E> IntoIterator for SortedKeySet<'a, E> {
    type Item = &'a Option<E>;
    type IntoIter = std::vec::IntoIter<&'a Option<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<E: fmt::Debug> fmt::Debug for SortedKeySet<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::comparator::Comparator;
    use crate::index::context::ViewContext;
    use crate::index::{HashPartitionIndex, IndexSpec, MutableMapIndex, SortedPartitionIndex};
    use crate::partition::{PartitionScope, PartitionTable};
    use crate::types::PartitionId;

    fn pid(id: u32) -> PartitionId {
        PartitionId::new(id)
    }

    fn owner(key: &u64) -> PartitionId {
        PartitionId::new((*key % 2) as u32)
    }

    fn sorted(entries: &[(u64, Option<i64>)]) -> Box<SortedPartitionIndex<u64, i64>> {
        let mut index = SortedPartitionIndex::new(IndexSpec::new("age"));
        for (key, value) in entries {
            index.insert(*key, *value).unwrap();
        }
        Box::new(index)
    }

    /// Partition 0: 3 -> {0}, null -> {2}; partition 1: 1 -> {1}, 3 -> {3}.
    fn table() -> PartitionTable<u64, i64> {
        let mut table = PartitionTable::new();
        table.insert_index(pid(0), Extractor::new("age"), sorted(&[(0, Some(3)), (2, None)]));
        table.insert_index(pid(1), Extractor::new("age"), sorted(&[(1, Some(1)), (3, Some(3))]));
        table
    }

    fn view<'a>(
        table: &'a PartitionTable<u64, i64>,
        scope: &'a PartitionScope,
    ) -> SortedIndexContents<'a, u64, i64> {
        let ctx = ViewContext::new(table, scope, &owner);
        SortedIndexContents::new(
            IndexContents::new(ctx, Extractor::new("age")),
            SafeComparator::natural(),
        )
    }

    #[test]
    fn key_set_is_ordered_with_nulls_first() {
        let table = table();
        let scope = PartitionScope::Owned;
        let contents = view(&table, &scope);

        let keys: Vec<_> = contents.key_set().iter().cloned().collect();
        assert_eq!(keys, vec![None, Some(1), Some(3)]);
        assert_eq!(contents.first_key(), Some(&None));
        assert_eq!(contents.last_key(), Some(&Some(3)));
        assert!(contents.key_set().contains(&Some(1)));
        assert!(!contents.key_set().contains(&Some(2)));
    }

    #[test]
    fn range_merges_colliding_values() {
        let table = table();
        let scope = PartitionScope::Owned;
        let contents = view(&table, &scope);

        let all = contents.range(Bound::Unbounded, Bound::Unbounded).unwrap();
        assert_eq!(all.len(), 3);

        let three = all.get(&Some(3)).unwrap();
        assert_eq!(three.len(), 2);
        assert_eq!(three.member_count(), 2);
        assert!(three.contains(&0));
        assert!(three.contains(&3));
    }

    #[test]
    fn sub_map_is_half_open() {
        let table = table();
        let scope = PartitionScope::Owned;
        let contents = view(&table, &scope);

        let range = contents.sub_map(&Some(1), &Some(3)).unwrap();
        assert_eq!(range.keys().cloned().collect::<Vec<_>>(), vec![Some(1)]);

        let head = contents.head_map(&Some(3)).unwrap();
        assert_eq!(head.keys().cloned().collect::<Vec<_>>(), vec![None, Some(1)]);

        let tail = contents.tail_map(&Some(1)).unwrap();
        assert_eq!(tail.first_key(), Some(&Some(1)));
        assert_eq!(tail.last_key(), Some(&Some(3)));
        assert!(!tail.contains_key(&None));

        let empty = contents.sub_map(&Some(2), &Some(2)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn inverted_sub_map_is_rejected() {
        let table = table();
        let scope = PartitionScope::Owned;
        let contents = view(&table, &scope);

        let err = contents.sub_map(&Some(3), &Some(1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRange { .. }));
    }

    #[test]
    fn range_respects_scope() {
        let table = table();
        let scope = PartitionScope::single(pid(1));
        let contents = view(&table, &scope);

        let all = contents.range(Bound::Unbounded, Bound::Unbounded).unwrap();
        assert_eq!(all.get(&Some(3)).unwrap().member_count(), 1);
        assert!(!all.contains_key(&None));
    }

    #[test]
    fn unordered_partition_fails_range() {
        let mut table = table();
        let mut unordered = HashPartitionIndex::new(IndexSpec::new("age"));
        unordered.insert(5u64, Some(10)).unwrap();
        table.insert_index(pid(2), Extractor::new("age"), Box::new(unordered));

        let scope = PartitionScope::Owned;
        let contents = view(&table, &scope);

        let err = contents.range(Bound::Unbounded, Bound::Unbounded).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnorderedPartition {
                partition: 2,
                extractor: "age".to_string(),
            }
        );
    }

    #[test]
    fn values_follow_comparator_order() {
        let table = table();
        let scope = PartitionScope::Owned;
        let contents = view(&table, &scope);

        let sizes: Vec<usize> = contents.values().map(|keys| keys.len()).collect();
        assert_eq!(sizes, vec![1, 1, 2]);

        let keys: Vec<_> = contents.entries().map(|entry| *entry.key()).collect();
        assert_eq!(keys, vec![None, Some(1), Some(3)]);
    }

    #[test]
    fn custom_comparator_reverses_order() {
        let table = table();
        let scope = PartitionScope::Owned;
        let ctx = ViewContext::new(&table, &scope, &owner);
        let reverse = Comparator::custom(|a: &i64, b: &i64| b.cmp(a));
        let contents = SortedIndexContents::new(
            IndexContents::new(ctx, Extractor::new("age")),
            SafeComparator::ensure(Some(reverse)),
        );

        let keys: Vec<_> = contents.key_set().into_iter().cloned().collect();
        assert_eq!(keys, vec![None, Some(3), Some(1)]);
    }

    #[test]
    fn point_operations_delegate() {
        let table = table();
        let scope = PartitionScope::Owned;
        let mut contents = view(&table, &scope);

        assert_eq!(contents.len(), 3);
        assert!(contents.contains_key(&None));
        assert_eq!(contents.get(&Some(3)).len(), 2);
        assert!(contents.contains_value(&HashSet::from([1u64])));
        assert!(contents.clear().unwrap_err().is_read_only());
        assert!(contents.put(Some(9), HashSet::new()).unwrap_err().is_read_only());
        assert!(contents.remove(&None).unwrap_err().is_read_only());
        assert_eq!(contents.len(), 3);
    }

    #[test]
    fn len_counts_values_distinct_under_comparator() {
        // Values in the same decade compare equal
        let bucket = Comparator::custom(|a: &i64, b: &i64| (a / 10).cmp(&(b / 10)));
        let mut table = PartitionTable::new();
        for (key, value) in [(0u64, 11i64), (1, 12)] {
            let mut index =
                SortedPartitionIndex::with_comparator(IndexSpec::new("age"), bucket.clone());
            index.insert(key, Some(value)).unwrap();
            table.insert_index(pid(key as u32), Extractor::new("age"), Box::new(index));
        }
        let scope = PartitionScope::Owned;
        let ctx = ViewContext::new(&table, &scope, &owner);
        let contents = SortedIndexContents::new(
            IndexContents::new(ctx, Extractor::new("age")),
            SafeComparator::ensure(Some(bucket)),
        );

        let range = contents.range(Bound::Unbounded, Bound::Unbounded).unwrap();
        assert_eq!(contents.key_set().len(), 1);
        assert_eq!(range.len(), 1);
        assert_eq!(contents.values().count(), 1);
        assert_eq!(contents.len(), 1);
        assert_eq!(contents.unordered().len(), 2);
    }
}
