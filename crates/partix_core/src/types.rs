//! Core type definitions for Partix.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Identifier for a partition.
///
/// Each cache key is owned by exactly one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(pub u32);

impl PartitionId {
    /// Creates a new partition ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part:{}", self.0)
    }
}

impl From<u32> for PartitionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Identity of an attribute extractor.
///
/// Extractors are compared by their canonical name (for example a field path
/// such as `"address.city"`). Cloning is cheap.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Extractor(Arc<str>);

impl Extractor {
    /// Creates an extractor identity from its canonical name.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the canonical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extractor({})", self.0)
    }
}

impl fmt::Display for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Extractor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A value produced by an extractor and used as an index key.
///
/// Indexes store attribute values as `Option<E>`, where `None` is the null
/// attribute.
pub trait AttributeValue: Clone + Eq + Hash + Ord + fmt::Debug + Send + Sync + 'static {}

impl<T> AttributeValue for T where T: Clone + Eq + Hash + Ord + fmt::Debug + Send + Sync + 'static {}

/// A cache key tracked by an index.
pub trait CacheKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Result of a forward (key to attribute value) index lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue<E> {
    /// The key is indexed; the attribute value may be null.
    Value(Option<E>),
    /// The key has no entry in any index within scope.
    NoValue,
}

impl<E> IndexValue<E> {
    /// Returns true if this is the `NoValue` sentinel.
    #[must_use]
    pub fn is_no_value(&self) -> bool {
        matches!(self, Self::NoValue)
    }

    /// Returns the attribute value, if the key is indexed.
    #[must_use]
    pub fn value(&self) -> Option<&Option<E>> {
        match self {
            Self::Value(value) => Some(value),
            Self::NoValue => None,
        }
    }
}
