//! Partition-local indexes and the composite views over them.
//!
//! Every partition maintains its own indexes, one per extractor. Queries that
//! span partitions read them through composite views that never copy
//! partition data and reject every mutation.
//!
//! # Partition indexes
//!
//! - [`HashPartitionIndex`]: unordered inverse mapping
//! - [`SortedPartitionIndex`]: ordered inverse mapping with range support
//!
//! # Composite views
//!
//! - [`CompositeIndexMap`]: extractor to index, over a partition scope
//! - [`CompositeIndex`]: metadata and point lookups for one extractor
//! - [`IndexContents`] / [`SortedIndexContents`]: merged inverse mappings
//! - [`ChainedSet`]: union of disjoint per-partition key sets

mod chained;
mod comparator;
mod composite;
mod contents;
mod context;
mod hash;
mod map;
mod ordered;
mod sorted;
mod traits;

pub use chained::ChainedSet;
pub use comparator::{CompareFn, Comparator, SafeComparator};
pub use composite::{CompositeIndex, Contents};
pub use contents::{ContentEntry, IndexContents};
pub use context::ViewContext;
pub use hash::{HashContents, HashPartitionIndex};
pub use map::{CompositeIndexMap, IndexRef};
pub use ordered::{SortedContents, SortedPartitionIndex};
pub use sorted::{SortedIndexContents, SortedKeySet, SortedRange};
pub use traits::{
    ContentsView, IndexSpec, MapIndex, MutableMapIndex, PartitionContents, PartitionIndex,
    SortedPartitionContents,
};
