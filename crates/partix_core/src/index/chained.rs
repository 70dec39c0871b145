//! Lazy union view over disjoint key sets.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Read-only union of several key sets.
///
/// Member sets are borrowed, never copied. Membership checks visit the members
/// in order and stop at the first hit; size is the sum of the member sizes.
/// Both rely on the member sets being disjoint, which holds for key sets that
/// come from different partitions.
///
/// Adding a set to a chain appends it to the member list, so a chain built by
/// repeated merges stays one level deep.
pub struct ChainedSet<'a, K> {
    sets: Vec<&'a HashSet<K>>,
}

impl<'a, K> ChainedSet<'a, K> {
    /// Creates a chain over the given member sets.
    #[must_use]
    pub fn new(sets: Vec<&'a HashSet<K>>) -> Self {
        Self { sets }
    }

    /// Creates an empty chain.
    #[must_use]
    pub fn empty() -> Self {
        Self { sets: Vec::new() }
    }

    /// Creates a chain over two sets.
    #[must_use]
    pub fn of(first: &'a HashSet<K>, second: &'a HashSet<K>) -> Self {
        Self {
            sets: vec![first, second],
        }
    }

    /// Appends a set to this chain.
    #[must_use]
    pub fn chain(mut self, set: &'a HashSet<K>) -> Self {
        self.sets.push(set);
        self
    }

    /// Appends the members of another chain to this one.
    #[must_use]
    pub fn concat(mut self, other: ChainedSet<'a, K>) -> Self {
        self.sets.extend(other.sets);
        self
    }

    /// Returns the total number of keys across all members.
    pub fn len(&self) -> usize {
        self.sets.iter().map(|set| set.len()).sum()
    }

    /// Returns true if no member holds a key.
    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(|set| set.is_empty())
    }

    /// Returns the number of member sets.
    pub fn member_count(&self) -> usize {
        self.sets.len()
    }

    /// Returns the member sets.
    pub fn members(&self) -> &[&'a HashSet<K>] {
        &self.sets
    }

    /// Iterates over all keys, member by member.
    pub fn iter(&self) -> impl Iterator<Item = &'a K> + '_ {
        self.sets.iter().copied().flat_map(|set| set.iter())
    }
}

impl<K: Eq + Hash> ChainedSet<'_, K> {
    /// Returns true if any member contains the key.
    pub fn contains(&self, key: &K) -> bool {
        self.sets.iter().any(|set| set.contains(key))
    }

    /// Returns true if this chain holds exactly the keys of `other`.
    pub fn set_eq(&self, other: &HashSet<K>) -> bool {
        self.len() == other.len() && self.iter().all(|key| other.contains(key))
    }
}

impl<K: Clone + Eq + Hash> ChainedSet<'_, K> {
    /// Copies the keys into an owned set.
    pub fn to_hash_set(&self) -> HashSet<K> {
        self.iter().cloned().collect()
    }
}

impl<K> Clone for ChainedSet<'_, K> {
    fn clone(&self) -> Self {
        Self {
            sets: self.sets.clone(),
        }
    }
}

impl<K> Default for ChainedSet<'_, K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: fmt::Debug> fmt::Debug for ChainedSet<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, K> From<&'a HashSet<K>> for ChainedSet<'a, K> {
    fn from(set: &'a HashSet<K>) -> Self {
        Self { sets: vec![set] }
    }
}
