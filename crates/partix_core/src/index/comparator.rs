//! Null-safe comparators for ordered indexes.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A shareable comparison function over non-null attribute values.
pub type CompareFn<E> = Arc<dyn Fn(&E, &E) -> Ordering + Send + Sync>;

/// Comparator reported by an ordered index.
pub enum Comparator<E> {
    /// A user-supplied comparator that does not handle nulls.
    Custom(CompareFn<E>),
    /// A comparator that is already null-safe.
    Safe(SafeComparator<E>),
}

impl<E> Comparator<E> {
    /// Creates a custom comparator from a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&E, &E) -> Ordering + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }
}

impl<E> Clone for Comparator<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
            Self::Safe(safe) => Self::Safe(safe.clone()),
        }
    }
}

impl<E> fmt::Debug for Comparator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Comparator::Custom"),
            Self::Safe(safe) => write!(f, "Comparator::Safe({safe:?})"),
        }
    }
}

/// Comparator over nullable attribute values.
///
/// A null (`None`) attribute value sorts before every non-null value and two
/// nulls compare equal. Non-null values are compared with the wrapped
/// comparator, or by their natural ordering when none was supplied.
pub struct SafeComparator<E> {
    inner: Option<CompareFn<E>>,
}

impl<E> SafeComparator<E> {
    /// Creates a comparator using the natural ordering of `E`.
    #[must_use]
    pub fn natural() -> Self {
        Self { inner: None }
    }

    /// Wraps a comparison function.
    #[must_use]
    pub fn wrap(f: CompareFn<E>) -> Self {
        Self { inner: Some(f) }
    }

    /// Ensures a null-safe comparator.
    ///
    /// A missing comparator yields natural ordering, an already safe
    /// comparator is returned unchanged and a custom one is wrapped.
    #[must_use]
    pub fn ensure(comparator: Option<Comparator<E>>) -> Self {
        match comparator {
            None => Self::natural(),
            Some(Comparator::Safe(safe)) => safe,
            Some(Comparator::Custom(f)) => Self::wrap(f),
        }
    }

    /// Returns true if non-null values use natural ordering.
    #[must_use]
    pub fn is_natural(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns true if both comparators share the same comparison function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<E: Ord> SafeComparator<E> {
    /// Compares two nullable attribute values.
    pub fn compare(&self, a: &Option<E>, b: &Option<E>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => self.compare_values(a, b),
        }
    }

    /// Compares two non-null attribute values.
    pub fn compare_values(&self, a: &E, b: &E) -> Ordering {
        match &self.inner {
            Some(f) => f(a, b),
            None => a.cmp(b),
        }
    }
}

impl<E> Clone for SafeComparator<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Default for SafeComparator<E> {
    fn default() -> Self {
        Self::natural()
    }
}

impl<E> fmt::Debug for SafeComparator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_natural() {
            f.write_str("SafeComparator(natural)")
        } else {
            f.write_str("SafeComparator(custom)")
        }
    }
}

impl<E> From<SafeComparator<E>> for Comparator<E> {
    fn from(safe: SafeComparator<E>) -> Self {
        Self::Safe(safe)
    }
}
