//! Hash-based partition index.

use crate::error::{CoreError, CoreResult};
use crate::index::comparator::Comparator;
use crate::index::traits::{
    IndexSpec, MapIndex, MutableMapIndex, PartitionContents, PartitionIndex,
};
use crate::stats::estimate_units;
use crate::types::{AttributeValue, CacheKey, Extractor, IndexValue};
use std::collections::{HashMap, HashSet};

/// Unordered partition-local index.
///
/// `HashPartitionIndex` keeps a forward mapping from cache key to attribute
/// value and an inverse mapping from attribute value to the set of keys that
/// produce it. It is maintained by the owning partition's write path.
///
/// # Example
///
/// ```rust
/// use partix_core::index::{
///     HashPartitionIndex, IndexSpec, MutableMapIndex, PartitionContents, PartitionIndex,
/// };
///
/// let mut index = HashPartitionIndex::new(IndexSpec::new("city"));
/// index.insert("k1", Some("Oslo".to_string())).unwrap();
///
/// let keys = index.contents().get(&Some("Oslo".to_string())).unwrap();
/// assert!(keys.contains(&"k1"));
/// ```
pub struct HashPartitionIndex<K, E> {
    /// Index specification.
    spec: IndexSpec,
    /// Cache key to attribute value mapping.
    forward: HashMap<K, Option<E>>,
    /// Attribute value to cache keys mapping.
    contents: HashContents<K, E>,
    /// Set once an entry could not be indexed.
    partial: bool,
}

/// Inverse mapping of a [`HashPartitionIndex`].
pub struct HashContents<K, E> {
    entries: HashMap<Option<E>, HashSet<K>>,
}

impl<K: CacheKey, E: AttributeValue> HashPartitionIndex<K, E> {
    /// Creates a new hash index.
    pub fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            forward: HashMap::new(),
            contents: HashContents {
                entries: HashMap::new(),
            },
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
    ///
    /// Any previous mapping for the key is dropped and the index becomes
    /// partial.
    pub fn mark_unindexable(&mut self, key: &K) {
        self.remove_mapping(key);
        self.partial = true;
    }

    /// Returns the number of indexed cache keys.
    pub fn key_count(&self) -> usize {
        self.forward.len()
    }

    /// Rebuilds the index from a set of key-value pairs.
    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, Option<E>)>,
    {
        self.forward.clear();
        self.contents.entries.clear();
        self.partial = false;
        for (key, value) in entries {
            if self.insert(key.clone(), value).is_err() {
                self.mark_unindexable(&key);
            }
        }
    }

    fn remove_mapping(&mut self, key: &K) -> bool {
        let Some(old) = self.forward.remove(key) else {
            return false;
        };
        if let Some(set) = self.contents.entries.get_mut(&old) {
            set.remove(key);
            if set.is_empty() {
                self.contents.entries.remove(&old);
            }
        }
        true
    }
}

impl<K: CacheKey, E: AttributeValue> MapIndex<K, E> for HashPartitionIndex<K, E> {
    fn is_ordered(&self) -> bool {
        false
    }

    fn comparator(&self) -> Option<Comparator<E>> {
        None
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

impl<K: CacheKey, E: AttributeValue> MutableMapIndex<K, E> for HashPartitionIndex<K, E> {
    fn insert(&mut self, key: K, value: Option<E>) -> CoreResult<()> {
        // For unique indexes, check if value already maps to a different key
        if self.spec.unique {
            if let Some(existing) = self.contents.entries.get(&value) {
                if !existing.is_empty() && !existing.contains(&key) {
                    return Err(CoreError::UniqueViolation {
                        extractor: self.spec.extractor.to_string(),
                    });
                }
            }
        }

        self.remove_mapping(&key);
        self.contents
            .entries
            .entry(value.clone())
            .or_default()
            .insert(key.clone());
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

impl<K: CacheKey, E: AttributeValue> PartitionIndex<K, E> for HashPartitionIndex<K, E> {
    fn contents(&self) -> &dyn PartitionContents<K, E> {
        &self.contents
    }
}

impl<K: CacheKey, E: AttributeValue> PartitionContents<K, E> for HashContents<K, E> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains_key(&self, value: &Option<E>) -> bool {
        self.entries.contains_key(value)
    }

    fn get(&self, value: &Option<E>) -> Option<&HashSet<K>> {
        self.entries.get(value)
    }

    fn keys(&self) -> Box<dyn Iterator<Item = &Option<E>> + '_> {
        Box::new(self.entries.keys())
    }
}
