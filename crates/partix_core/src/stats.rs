//! Memory footprint accounting for indexes.
//!
//! Units are an approximate byte count. They drive capacity heuristics and
//! diagnostics, never correctness.

use std::mem::size_of;

/// Fixed bookkeeping cost of one hash map slot.
const SLOT_OVERHEAD: u64 = 16;

/// Estimates the units held by a partition index.
///
/// `keys` is the number of forward entries (one per indexed cache key) and
/// `values` the number of distinct attribute values in the inverse mapping.
/// Every key is stored twice: once in the forward map and once in the key set
/// of its attribute value.
pub fn estimate_units<K, E>(keys: usize, values: usize) -> u64 {
    let key = size_of::<K>() as u64;
    let value = size_of::<Option<E>>() as u64;

    let forward = keys as u64 * (key + value + SLOT_OVERHEAD);
    let inverse = values as u64 * (value + SLOT_OVERHEAD) + keys as u64 * (key + SLOT_OVERHEAD);
    forward + inverse
}

/// Renders a unit count as a human readable memory size.
pub fn memory_size_string(units: u64) -> String {
    const SUFFIXES: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if units < 1024 {
        return format!("{units}B");
    }

    let mut size = units as f64;
    let mut suffix = 0;
    while size >= 1024.0 && suffix < SUFFIXES.len() - 1 {
        size /= 1024.0;
        suffix += 1;
    }
    format!("{size:.1}{}", SUFFIXES[suffix])
}
