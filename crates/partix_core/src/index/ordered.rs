//! Ordered partition index.

use crate::error::{CoreError, CoreResult};
use crate::index::comparator::{Comparator, SafeComparator};
use crate::index::traits::{
    IndexSpec, MapIndex, MutableMapIndex, PartitionContents, PartitionIndex,
    SortedPartitionContents,
};
use crate::stats::estimate_units;
use crate::types::{AttributeValue, CacheKey, Extractor, IndexValue};
use std::collections::{HashMap, HashSet};
use std::ops::Bound;

/// Ordered partition-local index for range queries.
///
/// Attribute values are kept sorted by the index comparator, with null values
/// first. `SortedPartitionIndex` supports:
/// - Equality lookups
/// - Range queries (greater than, less than, between)
/// - Ordered iteration
///
/// # Example
///
/// ```rust
/// use partix_core::index::{IndexSpec, MutableMapIndex, SortedPartitionIndex};
///
/// let mut index = SortedPartitionIndex::new(IndexSpec::new("age"));
/// index.insert(1u64, Some(42i64)).unwrap();
/// index.insert(2u64, Some(17i64)).unwrap();
///
/// let adults = index.greater_than_or_equal(&Some(18));
/// assert_eq!(adults, vec![1]);
/// ```
pub struct SortedPartitionIndex<K, E> {
    /// Index specification.
    spec: IndexSpec,
    /// Comparator as supplied at construction.
    comparator: Option<Comparator<E>>,
    /// Cache key to attribute value mapping.
    forward: HashMap<K, Option<E>>,
    /// Ordered attribute value to cache keys mapping.
    contents: SortedContents<K, E>,
    /// Set once an entry could not be indexed.
    partial: bool,
}

/// Inverse mapping of a [`SortedPartitionIndex`], sorted by comparator.
pub struct SortedContents<K, E> {
    comparator: SafeComparator<E>,
    entries: Vec<(Option<E>, HashSet<K>)>,
}

impl<K: CacheKey, E: AttributeValue> SortedContents<K, E> {
    fn position(&self, value: &Option<E>) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(probe, _)| self.comparator.compare(probe, value))
    }

    fn lower_index(&self, lower: Bound<&Option<E>>) -> usize {
        match lower {
            Bound::Unbounded => 0,
            Bound::Included(v) => self
                .entries
                .partition_point(|(k, _)| self.comparator.compare(k, v).is_lt()),
            Bound::Excluded(v) => self
                .entries
                .partition_point(|(k, _)| self.comparator.compare(k, v).is_le()),
        }
    }

    fn upper_index(&self, upper: Bound<&Option<E>>) -> usize {
        match upper {
            Bound::Unbounded => self.entries.len(),
            Bound::Included(v) => self
                .entries
                .partition_point(|(k, _)| self.comparator.compare(k, v).is_le()),
            Bound::Excluded(v) => self
                .entries
                .partition_point(|(k, _)| self.comparator.compare(k, v).is_lt()),
        }
    }

    fn slice(&self, lower: Bound<&Option<E>>, upper: Bound<&Option<E>>) -> &[(Option<E>, HashSet<K>)] {
        let start = self.lower_index(lower);
        let end = self.upper_index(upper);
        if start >= end {
            &[]
        } else {
            &self.entries[start..end]
        }
    }
}

impl<K: CacheKey, E: AttributeValue> SortedPartitionIndex<K, E> {
    /// Creates an index ordered by the natural ordering of `E`.
    pub fn new(spec: IndexSpec) -> Self {
        Self::build(spec, None)
    }

    /// Creates an index ordered by a custom comparator.
    pub fn with_comparator(spec: IndexSpec, comparator: Comparator<E>) -> Self {
        Self::build(spec, Some(comparator))
    }

    fn build(spec: IndexSpec, comparator: Option<Comparator<E>>) -> Self {
        Self {
            spec,
            contents: SortedContents {
                comparator: SafeComparator::ensure(comparator.clone()),
                entries: Vec::new(),
            },
            comparator,
            forward: HashMap::new(),
            partial: false,
        }
    }

    /// Returns the index specification.
    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Returns the extractor this index is built for.
    pub fn extractor(&self) -> &Extractor {
        &self.spec.extractor
    }

    /// Records that the attribute value for `key` could not be extracted.
    pub fn mark_unindexable(&mut self, key: &K) {
        self.remove_mapping(key);
        self.partial = true;
    }

    /// Returns the number of indexed cache keys.
    pub fn key_count(&self) -> usize {
        self.forward.len()
    }

    /// Returns keys whose attribute values fall within the bounds.
    pub fn range(&self, lower: Bound<&Option<E>>, upper: Bound<&Option<E>>) -> Vec<K> {
        self.contents
            .slice(lower, upper)
            .iter()
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    /// Returns keys with attribute values greater than the given value.
    pub fn greater_than(&self, value: &Option<E>) -> Vec<K> {
        self.range(Bound::Excluded(value), Bound::Unbounded)
    }

    /// Returns keys with attribute values greater than or equal to the given value.
    pub fn greater_than_or_equal(&self, value: &Option<E>) -> Vec<K> {
        self.range(Bound::Included(value), Bound::Unbounded)
    }

    /// Returns keys with attribute values less than the given value.
    pub fn less_than(&self, value: &Option<E>) -> Vec<K> {
        self.range(Bound::Unbounded, Bound::Excluded(value))
    }

    /// Returns keys with attribute values between min and max (inclusive).
    pub fn between(&self, min: &Option<E>, max: &Option<E>) -> Vec<K> {
        self.range(Bound::Included(min), Bound::Included(max))
    }

    /// Returns the minimum attribute value.
    pub fn min_key(&self) -> Option<&Option<E>> {
        self.contents.entries.first().map(|(value, _)| value)
    }

    /// Returns the maximum attribute value.
    pub fn max_key(&self) -> Option<&Option<E>> {
        self.contents.entries.last().map(|(value, _)| value)
    }

    /// Returns all attribute values in order.
    pub fn scan_ordered(&self) -> Vec<&Option<E>> {
        self.contents.entries.iter().map(|(value, _)| value).collect()
    }

    fn remove_mapping(&mut self, key: &K) -> bool {
        let Some(old) = self.forward.remove(key) else {
            return false;
        };
        if let Ok(pos) = self.contents.position(&old) {
            let set = &mut self.contents.entries[pos].1;
            set.remove(key);
            if set.is_empty() {
                self.contents.entries.remove(pos);
            }
        }
        true
    }
}

impl<K: CacheKey, E: AttributeValue> MapIndex<K, E> for SortedPartitionIndex<K, E> {
    fn is_ordered(&self) -> bool {
        true
    }

    fn comparator(&self) -> Option<Comparator<E>> {
        self.comparator.clone()
    }

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn get(&self, key: &K) -> IndexValue<E> {
        match self.forward.get(key) {
            Some(value) => IndexValue::Value(value.clone()),
            None => IndexValue::NoValue,
        }
    }

    fn units(&self) -> u64 {
        estimate_units::<K, E>(self.forward.len(), self.contents.entries.len())
    }
}

impl<K: CacheKey, E: AttributeValue> MutableMapIndex<K, E> for SortedPartitionIndex<K, E> {
    fn insert(&mut self, key: K, value: Option<E>) -> CoreResult<()> {
        let found = self.contents.position(&value);

        // For unique indexes, check if value already maps to a different key
        if self.spec.unique {
            if let Ok(pos) = found {
                let existing = &self.contents.entries[pos].1;
                if !existing.is_empty() && !existing.contains(&key) {
                    return Err(CoreError::UniqueViolation {
                        extractor: self.spec.extractor.to_string(),
                    });
                }
            }
        }

        self.remove_mapping(&key);
        // Removal may have shifted or dropped entries
        match self.contents.position(&value) {
            Ok(pos) => {
                self.contents.entries[pos].1.insert(key.clone());
            }
            Err(pos) => {
                let keys = HashSet::from([key.clone()]);
                self.contents.entries.insert(pos, (value.clone(), keys));
            }
        }
        self.forward.insert(key, value);
        Ok(())
    }

    fn update(&mut self, key: K, value: Option<E>) -> CoreResult<()> {
        self.insert(key, value)
    }

    fn delete(&mut self, key: &K) -> CoreResult<bool> {
        Ok(self.remove_mapping(key))
    }
}

impl<K: CacheKey, E: AttributeValue> PartitionIndex<K, E> for SortedPartitionIndex<K, E> {
    fn contents(&self) -> &dyn PartitionContents<K, E> {
        &self.contents
    }
}

impl<K: CacheKey, E: AttributeValue> PartitionContents<K, E> for SortedContents<K, E> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains_key(&self, value: &Option<E>) -> bool {
        self.position(value).is_ok()
    }

    fn get(&self, value: &Option<E>) -> Option<&HashSet<K>> {
        self.position(value).ok().map(|pos| &self.entries[pos].1)
    }

    fn keys(&self) -> Box<dyn Iterator<Item = &Option<E>> + '_> {
        Box::new(self.entries.iter().map(|(value, _)| value))
    }

    fn as_sorted(&self) -> Option<&dyn SortedPartitionContents<K, E>> {
        Some(self)
    }
}

impl<K: CacheKey, E: AttributeValue> SortedPartitionContents<K, E> for SortedContents<K, E> {
    fn range(
        &self,
        lower: Bound<&Option<E>>,
        upper: Bound<&Option<E>>,
    ) -> Box<dyn Iterator<Item = (&Option<E>, &HashSet<K>)> + '_> {
        Box::new(
            self.slice(lower, upper)
                .iter()
                .map(|(value, keys)| (value, keys)),
        )
    }
}
