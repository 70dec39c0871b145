//! Shared context of composite views.

use crate::config::CompositeConfig;
use crate::index::traits::PartitionIndex;
use crate::partition::{
    KeyPartitioner, PartitionSampler, PartitionScope, PartitionTable, RandomSampler,
};
use crate::types::{AttributeValue, CacheKey, Extractor, PartitionId};

static DEFAULT_CONFIG: CompositeConfig = CompositeConfig::DEFAULT;
static DEFAULT_SAMPLER: RandomSampler = RandomSampler;

/// Everything a composite view needs to reach the partition indexes.
///
/// The context only holds references. Every composite component receives a
/// copy at construction, so views stay cheap to build and to discard.
pub struct ViewContext<'a, K, E> {
    table: &'a PartitionTable<K, E>,
    scope: &'a PartitionScope,
    partitioner: &'a dyn KeyPartitioner<K>,
    sampler: &'a dyn PartitionSampler,
    config: &'a CompositeConfig,
}

impl<K, E> Clone for ViewContext<'_, K, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, E> Copy for ViewContext<'_, K, E> {}

impl<'a, K: CacheKey, E: AttributeValue> ViewContext<'a, K, E> {
    /// Creates a context with random sampling and the default configuration.
    pub fn new(
        table: &'a PartitionTable<K, E>,
        scope: &'a PartitionScope,
        partitioner: &'a dyn KeyPartitioner<K>,
    ) -> Self {
        Self {
            table,
            scope,
            partitioner,
            sampler: &DEFAULT_SAMPLER,
            config: &DEFAULT_CONFIG,
        }
    }

    /// Replaces the representative partition sampler.
    #[must_use]
    pub fn with_sampler(mut self, sampler: &'a dyn PartitionSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: &'a CompositeConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the partition table.
    pub fn table(&self) -> &'a PartitionTable<K, E> {
        self.table
    }

    /// Returns the partition scope.
    pub fn scope(&self) -> &'a PartitionScope {
        self.scope
    }

    /// Returns the configuration.
    pub fn config(&self) -> &'a CompositeConfig {
        self.config
    }

    /// Resolves the partition owning a cache key.
    pub fn partition_of(&self, key: &K) -> PartitionId {
        self.partitioner.partition_of(key)
    }

    /// Iterates over the partitions in scope.
    pub fn partitions(&self) -> Box<dyn Iterator<Item = PartitionId> + 'a> {
        match self.scope {
            PartitionScope::Owned => Box::new(self.table.partition_ids()),
            PartitionScope::Only(set) => Box::new(set.iter()),
        }
    }

    /// Returns the number of partitions in scope.
    pub fn partition_count(&self) -> usize {
        match self.scope {
            PartitionScope::Owned => self.table.len(),
            PartitionScope::Only(set) => set.cardinality(),
        }
    }

    /// Checks if a partition is in scope.
    pub fn in_scope(&self, id: PartitionId) -> bool {
        match self.scope {
            PartitionScope::Owned => self.table.contains_partition(id),
            PartitionScope::Only(set) => set.contains(id),
        }
    }

    /// Returns true if the scope explicitly names exactly one partition.
    pub fn is_single_partition(&self) -> bool {
        matches!(self.scope, PartitionScope::Only(set) if set.cardinality() == 1)
    }

    /// Picks the partition whose index metadata represents the scope.
    pub fn representative(&self) -> Option<PartitionId> {
        match self.scope {
            PartitionScope::Owned => self.table.first_partition(),
            PartitionScope::Only(set) => self.sampler.sample(set),
        }
    }

    /// Returns a partition's index for the extractor, if the partition is in
    /// scope and has one.
    pub fn index(&self, id: PartitionId, extractor: &Extractor) -> Option<&'a dyn PartitionIndex<K, E>> {
        if self.in_scope(id) {
            self.table.index(id, extractor)
        } else {
            None
        }
    }

    /// Iterates over the in-scope partitions that have an index for the
    /// extractor.
    pub fn indexes(
        &self,
        extractor: &Extractor,
    ) -> impl Iterator<Item = (PartitionId, &'a dyn PartitionIndex<K, E>)> + 'a {
        let table = self.table;
        let extractor = extractor.clone();
        self.partitions()
            .filter_map(move |id| table.index(id, &extractor).map(|index| (id, index)))
    }
}
