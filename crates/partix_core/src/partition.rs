//! Partitions, partition scopes and key ownership.
//!
//! A [`PartitionTable`] holds every partition's local indexes, keyed by
//! extractor. A [`PartitionScope`] selects which partitions a composite view
//! covers, and a [`PartitionSampler`] picks the representative partition whose
//! index metadata the view reports.

use crate::index::PartitionIndex;
use crate::types::{Extractor, PartitionId};
use rand::seq::IteratorRandom;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Immutable set of partition IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionSet {
    ids: BTreeSet<PartitionId>,
}

impl PartitionSet {
    /// Creates a set from partition IDs.
    pub fn new<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = PartitionId>,
    {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Creates a set holding a single partition.
    #[must_use]
    pub fn single(id: PartitionId) -> Self {
        Self::new([id])
    }

    /// Checks if the set contains the partition.
    pub fn contains(&self, id: PartitionId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns the number of partitions in the set.
    pub fn cardinality(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates over the partitions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = PartitionId> + '_ {
        self.ids.iter().copied()
    }
}

impl FromIterator<PartitionId> for PartitionSet {
    fn from_iter<I: IntoIterator<Item = PartitionId>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl FromIterator<u32> for PartitionSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(PartitionId::new))
    }
}

impl fmt::Display for PartitionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, id) in self.ids.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", id.as_u32())?;
        }
        f.write_str("}")
    }
}

/// The partitions a composite view covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PartitionScope {
    /// Every partition currently present in the partition table.
    #[default]
    Owned,
    /// An explicit set of partitions.
    Only(PartitionSet),
}

impl PartitionScope {
    /// Creates an explicit scope.
    pub fn only<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = PartitionId>,
    {
        Self::Only(PartitionSet::new(ids))
    }

    /// Creates a scope over a single partition.
    #[must_use]
    pub fn single(id: PartitionId) -> Self {
        Self::Only(PartitionSet::single(id))
    }

    /// Returns the explicit partition set, if the scope is restricted.
    pub fn explicit(&self) -> Option<&PartitionSet> {
        match self {
            Self::Owned => None,
            Self::Only(set) => Some(set),
        }
    }
}

impl fmt::Display for PartitionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned => f.write_str("owned"),
            Self::Only(set) => write!(f, "{set}"),
        }
    }
}

/// Picks an arbitrary member of a partition set.
pub trait PartitionSampler: Send + Sync {
    /// Returns some member of the set, or `None` if it is empty.
    fn sample(&self, set: &PartitionSet) -> Option<PartitionId>;
}

/// Samples a uniformly random member.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSampler;

impl PartitionSampler for RandomSampler {
    fn sample(&self, set: &PartitionSet) -> Option<PartitionId> {
        set.iter().choose(&mut rand::thread_rng())
    }
}

/// Samples the lowest partition ID. Deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSampler;

impl PartitionSampler for FirstSampler {
    fn sample(&self, set: &PartitionSet) -> Option<PartitionId> {
        set.iter().next()
    }
}

/// Resolves the partition that owns a cache key.
pub trait KeyPartitioner<K>: Send + Sync {
    /// Returns the owning partition of the key.
    fn partition_of(&self, key: &K) -> PartitionId;
}

impl<K, F> KeyPartitioner<K> for F
where
    F: Fn(&K) -> PartitionId + Send + Sync,
{
    fn partition_of(&self, key: &K) -> PartitionId {
        self(key)
    }
}

/// Assigns keys to partitions by hash modulo the partition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPartitioner {
    partition_count: u32,
}

impl HashPartitioner {
    /// Creates a partitioner over `partition_count` partitions.
    ///
    /// A count of zero is treated as one.
    #[must_use]
    pub fn new(partition_count: u32) -> Self {
        Self {
            partition_count: partition_count.max(1),
        }
    }

    /// Returns the number of partitions.
    #[must_use]
    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }
}

impl<K: Hash> KeyPartitioner<K> for HashPartitioner {
    fn partition_of(&self, key: &K) -> PartitionId {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        PartitionId::new((hasher.finish() % u64::from(self.partition_count)) as u32)
    }
}

/// Indexes of one partition, keyed by extractor.
pub type PartitionIndexes<K, E> = HashMap<Extractor, Box<dyn PartitionIndex<K, E>>>;

/// Every partition's local indexes, keyed by partition ID.
pub struct PartitionTable<K, E> {
    partitions: BTreeMap<PartitionId, PartitionIndexes<K, E>>,
}

impl<K, E> PartitionTable<K, E> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            partitions: BTreeMap::new(),
        }
    }

    /// Adds a partition without indexes. Existing partitions are kept.
    pub fn add_partition(&mut self, id: PartitionId) {
        self.partitions.entry(id).or_default();
    }

    /// Registers an index, replacing any previous index for the extractor.
    pub fn insert_index(
        &mut self,
        id: PartitionId,
        extractor: Extractor,
        index: Box<dyn PartitionIndex<K, E>>,
    ) -> Option<Box<dyn PartitionIndex<K, E>>> {
        self.partitions.entry(id).or_default().insert(extractor, index)
    }

    /// Removes an index from a partition.
    pub fn remove_index(
        &mut self,
        id: PartitionId,
        extractor: &Extractor,
    ) -> Option<Box<dyn PartitionIndex<K, E>>> {
        self.partitions.get_mut(&id)?.remove(extractor)
    }

    /// Removes a partition with all its indexes.
    pub fn remove_partition(&mut self, id: PartitionId) -> Option<PartitionIndexes<K, E>> {
        self.partitions.remove(&id)
    }

    /// Checks if the table holds the partition.
    pub fn contains_partition(&self, id: PartitionId) -> bool {
        self.partitions.contains_key(&id)
    }

    /// Returns the indexes of a partition.
    pub fn partition(&self, id: PartitionId) -> Option<&PartitionIndexes<K, E>> {
        self.partitions.get(&id)
    }

    /// Returns the index of a partition for the extractor.
    pub fn index(&self, id: PartitionId, extractor: &Extractor) -> Option<&dyn PartitionIndex<K, E>> {
        self.partitions
            .get(&id)?
            .get(extractor)
            .map(|index| index.as_ref())
    }

    /// Returns the index of a partition for the extractor, mutably.
    pub fn index_mut(
        &mut self,
        id: PartitionId,
        extractor: &Extractor,
    ) -> Option<&mut Box<dyn PartitionIndex<K, E>>> {
        self.partitions.get_mut(&id)?.get_mut(extractor)
    }

    /// Iterates over partition IDs in ascending order.
    pub fn partition_ids(&self) -> impl Iterator<Item = PartitionId> + '_ {
        self.partitions.keys().copied()
    }

    /// Returns the lowest partition ID.
    pub fn first_partition(&self) -> Option<PartitionId> {
        self.partitions.keys().next().copied()
    }

    /// Returns the number of partitions.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Returns true if the table holds no partition.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl<K, E> Default for PartitionTable<K, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, E> fmt::Debug for PartitionTable<K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (id, indexes) in &self.partitions {
            let mut extractors: Vec<&Extractor> = indexes.keys().collect();
            extractors.sort();
            map.entry(&id.as_u32(), &extractors);
        }
        map.finish()
    }
}
