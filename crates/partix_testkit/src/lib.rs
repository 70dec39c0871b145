//! # Partix Testkit
//!
//! Test utilities for Partix.
//!
//! This crate provides:
//! - Partition table fixtures and composite view helpers
//! - Property-based layout generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use partix_core::partition::PartitionScope;
//! use partix_core::registry::IndexKind;
//! use partix_testkit::prelude::*;
//!
//! let layout = PartitionLayout::new(3, (0..9).map(|k| (k, Some(1))).collect());
//! with_layout_view(&layout, IndexKind::Sorted, &PartitionScope::Owned, |map| {
//!     assert!(map.contains_key(&value_extractor()));
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
