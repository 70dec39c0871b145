//! Index capability traits.
//!
//! Partition-local indexes implement [`PartitionIndex`]; composite views
//! implement the same read capability ([`MapIndex`]) and reject every mutation.

use crate::error::CoreResult;
use crate::index::chained::ChainedSet;
use crate::index::comparator::Comparator;
use crate::types::{Extractor, IndexValue};
use std::collections::HashSet;
use std::ops::Bound;

/// Specification for a partition-local index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Extractor this index is built for.
    pub extractor: Extractor,
    /// Whether each attribute value may map to at most one key.
    pub unique: bool,
}

impl IndexSpec {
    /// Creates a new index specification.
    pub fn new(extractor: impl Into<Extractor>) -> Self {
        Self {
            extractor: extractor.into(),
            unique: false,
        }
    }

    /// Makes this a unique index.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Read capability shared by partition indexes and composite indexes.
pub trait MapIndex<K, E> {
    /// Returns true if the index contents are ordered.
    fn is_ordered(&self) -> bool;

    /// Returns the comparator used for ordering, if any.
    fn comparator(&self) -> Option<Comparator<E>>;

    /// Returns true if some entries could not be indexed.
    fn is_partial(&self) -> bool;

    /// Looks up the attribute value indexed for a cache key.
    fn get(&self, key: &K) -> IndexValue<E>;

    /// Returns the approximate memory footprint in units.
    fn units(&self) -> u64;
}

/// Write capability of an index.
pub trait MutableMapIndex<K, E>: MapIndex<K, E> {
    /// Indexes a key with its extracted attribute value.
    fn insert(&mut self, key: K, value: Option<E>) -> CoreResult<()>;

    /// Re-indexes a key whose attribute value changed.
    fn update(&mut self, key: K, value: Option<E>) -> CoreResult<()>;

    /// Removes a key from the index. Returns true if it was indexed.
    fn delete(&mut self, key: &K) -> CoreResult<bool>;
}

/// A single partition's index for one extractor.
pub trait PartitionIndex<K, E>: MutableMapIndex<K, E> + Send + Sync {
    /// Returns the inverse mapping (attribute value to key set).
    fn contents(&self) -> &dyn PartitionContents<K, E>;
}

/// Inverse mapping of a partition index.
pub trait PartitionContents<K, E> {
    /// Returns the number of distinct attribute values.
    fn len(&self) -> usize;

    /// Returns true if no attribute value is indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if the attribute value is indexed.
    fn contains_key(&self, value: &Option<E>) -> bool;

    /// Returns the keys indexed under an attribute value.
    fn get(&self, value: &Option<E>) -> Option<&HashSet<K>>;

    /// Iterates over the indexed attribute values.
    fn keys(&self) -> Box<dyn Iterator<Item = &Option<E>> + '_>;

    /// Returns the ordered view of these contents, if they are ordered.
    fn as_sorted(&self) -> Option<&dyn SortedPartitionContents<K, E>> {
        None
    }
}

/// Ordered inverse mapping of a partition index.
pub trait SortedPartitionContents<K, E>: PartitionContents<K, E> {
    /// Iterates over the entries within the bounds, in comparator order.
    fn range(
        &self,
        lower: Bound<&Option<E>>,
        upper: Bound<&Option<E>>,
    ) -> Box<dyn Iterator<Item = (&Option<E>, &HashSet<K>)> + '_>;
}

/// Content capability shared by the unordered and ordered composite views.
pub trait ContentsView<'a, K, E> {
    /// Returns true if no partition in scope indexes any attribute value.
    fn is_empty(&self) -> bool;

    /// Returns the number of distinct attribute values in scope.
    fn len(&self) -> usize;

    /// Checks if any partition in scope indexes the attribute value.
    fn contains_key(&self, value: &Option<E>) -> bool;

    /// Returns the union of the key sets indexed under the attribute value.
    fn get(&self, value: &Option<E>) -> ChainedSet<'a, K>;

    /// Checks if some attribute value maps to exactly the given keys.
    fn contains_value(&self, keys: &HashSet<K>) -> bool;

    /// Always fails: composite contents are read-only.
    fn put(&mut self, value: Option<E>, keys: HashSet<K>) -> CoreResult<()>;

    /// Always fails: composite contents are read-only.
    fn remove(&mut self, value: &Option<E>) -> CoreResult<()>;

    /// Always fails: composite contents are read-only.
    fn clear(&mut self) -> CoreResult<()>;
}
