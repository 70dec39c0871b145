//! Composite index over the partitions in scope.
//!
//! A [`CompositeIndex`] presents the per-partition indexes for one extractor
//! as a single read-only [`MapIndex`]. Point lookups are routed to the owning
//! partition; contents and footprint are unions over the scope.

use crate::error::{CoreError, CoreResult};
use crate::index::chained::ChainedSet;
use crate::index::comparator::{Comparator, SafeComparator};
use crate::index::contents::IndexContents;
use crate::index::context::ViewContext;
use crate::index::sorted::SortedIndexContents;
use crate::index::traits::{ContentsView, MapIndex, MutableMapIndex};
use crate::stats::memory_size_string;
use crate::types::{AttributeValue, CacheKey, Extractor, IndexValue};
use std::collections::HashSet;
use std::fmt;

const STRUCTURE: &str = "CompositeIndex";

/// Read-only union of the partition indexes for one extractor.
pub struct CompositeIndex<'a, K, E> {
    ctx: ViewContext<'a, K, E>,
    extractor: Extractor,
    /// Present iff the sampled index is ordered.
    comparator: Option<SafeComparator<E>>,
}

impl<'a, K: CacheKey, E: AttributeValue> CompositeIndex<'a, K, E> {
    /// Creates a composite index.
    ///
    /// `ordered` and `comparator` are the metadata sampled from a
    /// representative partition. The comparator is made null-safe when the
    /// index is ordered and ignored otherwise.
    pub fn new(
        ctx: ViewContext<'a, K, E>,
        extractor: Extractor,
        ordered: bool,
        comparator: Option<Comparator<E>>,
    ) -> Self {
        let comparator = ordered.then(|| SafeComparator::ensure(comparator));
        Self {
            ctx,
            extractor,
            comparator,
        }
    }

    /// Returns the extractor this index is built for.
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Returns the composite inverse mapping, ordered if the index is.
    pub fn index_contents(&self) -> Contents<'a, K, E> {
        let base = IndexContents::new(self.ctx, self.extractor.clone());
        match &self.comparator {
            Some(comparator) => {
                Contents::Sorted(SortedIndexContents::new(base, comparator.clone()))
            }
            None => Contents::Unordered(base),
        }
    }

    /// Describes the index. Verbose output also lists the attribute values,
    /// up to the configured limit.
    pub fn describe(&self, verbose: bool) -> String {
        let mut out = format!(
            "CompositeIndex: Extractor={}, Ordered={}, Footprint={}",
            self.extractor,
            self.is_ordered(),
            memory_size_string(self.units())
        );
        if verbose {
            let contents = self.index_contents();
            let values = contents.ordered_keys();
            let limit = self.ctx.config().verbose_limit;

            let mut rendered: Vec<String> =
                values.iter().take(limit).map(|value| render(*value)).collect();
            if values.len() > limit {
                rendered.push("...".to_string());
            }
            out.push_str(&format!(", Content[{}]=[{}]", values.len(), rendered.join(", ")));
        }
        out
    }
}

fn render<E: fmt::Debug>(value: &Option<E>) -> String {
    match value {
        Some(value) => format!("{value:?}"),
        None => "null".to_string(),
    }
}

impl<K: CacheKey, E: AttributeValue> MapIndex<K, E> for CompositeIndex<'_, K, E> {
    fn is_ordered(&self) -> bool {
        self.comparator.is_some()
    }

    fn comparator(&self) -> Option<Comparator<E>> {
        self.comparator.clone().map(Comparator::Safe)
    }

    fn is_partial(&self) -> bool {
        self.ctx
            .indexes(&self.extractor)
            .any(|(_, index)| index.is_partial())
    }

    fn get(&self, key: &K) -> IndexValue<E> {
        let owner = self.ctx.partition_of(key);
        match self.ctx.index(owner, &self.extractor) {
            Some(index) => index.get(key),
            None => IndexValue::NoValue,
        }
    }

    fn units(&self) -> u64 {
        let raw: u64 = self
            .ctx
            .indexes(&self.extractor)
            .map(|(_, index)| index.units())
            .sum();
        self.ctx.config().scale_units(raw)
    }
}

impl<K: CacheKey, E: AttributeValue> MutableMapIndex<K, E> for CompositeIndex<'_, K, E> {
    fn insert(&mut self, _key: K, _value: Option<E>) -> CoreResult<()> {
        Err(CoreError::read_only(STRUCTURE, "insert"))
    }

    fn update(&mut self, _key: K, _value: Option<E>) -> CoreResult<()> {
        Err(CoreError::read_only(STRUCTURE, "update"))
    }

    fn delete(&mut self, _key: &K) -> CoreResult<bool> {
        Err(CoreError::read_only(STRUCTURE, "delete"))
    }
}

impl<K, E> Clone for CompositeIndex<'_, K, E> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx,
            extractor: self.extractor.clone(),
            comparator: self.comparator.clone(),
        }
    }
}

impl<K: CacheKey, E: AttributeValue> fmt::Display for CompositeIndex<'_, K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(false))
    }
}

impl<K, E> fmt::Debug for CompositeIndex<'_, K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeIndex")
            .field("extractor", &self.extractor)
            .field("comparator", &self.comparator)
            .finish_non_exhaustive()
    }
}

/// Contents view of a composite index.
#[derive(Debug, Clone)]
pub enum Contents<'a, K, E> {
    /// Contents of an unordered index.
    Unordered(IndexContents<'a, K, E>),
    /// Contents of an ordered index, with range queries.
    Sorted(SortedIndexContents<'a, K, E>),
}

impl<'a, K: CacheKey, E: AttributeValue> Contents<'a, K, E> {
    /// Returns true if the contents are ordered.
    pub fn is_sorted(&self) -> bool {
        matches!(self, Self::Sorted(_))
    }

    /// Returns the ordered view, if the contents are ordered.
    pub fn as_sorted(&self) -> Option<&SortedIndexContents<'a, K, E>> {
        match self {
            Self::Sorted(sorted) => Some(sorted),
            Self::Unordered(_) => None,
        }
    }

    /// Returns the unordered view, which every variant provides.
    pub fn unordered(&self) -> &IndexContents<'a, K, E> {
        match self {
            Self::Unordered(contents) => contents,
            Self::Sorted(sorted) => sorted.unordered(),
        }
    }

    /// Returns the attribute values in comparator order when sorted.
    ///
    /// Unordered contents have no defined order; their values are sorted by
    /// the natural ordering of `E` only so that `describe` output is stable.
    pub fn ordered_keys(&self) -> Vec<&'a Option<E>> {
        match self {
            Self::Sorted(sorted) => sorted.key_set().into_iter().collect(),
            Self::Unordered(contents) => {
                let mut keys: Vec<_> = contents.key_set().into_iter().collect();
                keys.sort();
                keys
            }
        }
    }
}

impl<'a, K: CacheKey, E: AttributeValue> ContentsView<'a, K, E> for Contents<'a, K, E> {
    fn is_empty(&self) -> bool {
        self.unordered().is_empty()
    }

    fn len(&self) -> usize {
        match self {
            Self::Unordered(contents) => contents.len(),
            Self::Sorted(sorted) => sorted.len(),
        }
    }

    fn contains_key(&self, value: &Option<E>) -> bool {
        self.unordered().contains_key(value)
    }

    fn get(&self, value: &Option<E>) -> ChainedSet<'a, K> {
        self.unordered().get(value)
    }

    fn contains_value(&self, keys: &HashSet<K>) -> bool {
        self.unordered().contains_value(keys)
    }

    fn put(&mut self, value: Option<E>, keys: HashSet<K>) -> CoreResult<()> {
        match self {
            Self::Unordered(contents) => contents.put(value, keys),
            Self::Sorted(sorted) => sorted.put(value, keys),
        }
    }

    fn remove(&mut self, value: &Option<E>) -> CoreResult<()> {
        match self {
            Self::Unordered(contents) => contents.remove(value),
            Self::Sorted(sorted) => sorted.remove(value),
        }
    }

    fn clear(&mut self) -> CoreResult<()> {
        match self {
            Self::Unordered(contents) => contents.clear(),
            Self::Sorted(sorted) => sorted.clear(),
        }
    }
}
