//! # Partix Core
//!
//! Composite index views over partitioned in-memory indexes.
//!
//! This crate provides:
//! - Partition-local hash and sorted indexes
//! - Partition scopes, key ownership and representative sampling
//! - Read-only composite views that merge the indexes of a scope
//! - A lock-protected registry pinning a stable snapshot per query
//!
//! # Example
//!
//! ```rust
//! use partix_core::index::{ContentsView, IndexSpec, MapIndex};
//! use partix_core::partition::{HashPartitioner, PartitionScope};
//! use partix_core::registry::{IndexKind, IndexRegistry};
//! use partix_core::types::{Extractor, PartitionId};
//!
//! let registry: IndexRegistry<u64, String> = IndexRegistry::new(HashPartitioner::new(2));
//! for id in 0..2 {
//!     registry.create_index(PartitionId::new(id), IndexSpec::new("city"), IndexKind::Hash);
//! }
//!
//! let city = Extractor::new("city");
//! registry.index_entry(1, &city, Some("Oslo".to_string())).unwrap();
//! registry.index_entry(2, &city, Some("Oslo".to_string())).unwrap();
//!
//! registry.with_view(&PartitionScope::Owned, |map| {
//!     let index = map.get(&city).unwrap();
//!     let contents = index.as_composite().unwrap().index_contents();
//!     assert_eq!(contents.get(&Some("Oslo".to_string())).len(), 2);
//!     assert!(!index.is_partial());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod index;
pub mod partition;
pub mod registry;
pub mod stats;
pub mod types;

pub use config::CompositeConfig;
pub use error::{CoreError, CoreResult};
pub use index::{
    ChainedSet, CompositeIndex, CompositeIndexMap, IndexContents, IndexRef, SafeComparator,
    SortedIndexContents,
};
pub use partition::{HashPartitioner, KeyPartitioner, PartitionScope, PartitionSet, PartitionTable};
pub use registry::{IndexKind, IndexRegistry};
pub use types::{Extractor, IndexValue, PartitionId};
