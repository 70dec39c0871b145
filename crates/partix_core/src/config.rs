//! Composite view configuration.

/// Overhead factor applied to the summed partition units of a composite index.
pub const DEFAULT_UNITS_OVERHEAD: f64 = 1.1;

/// Maximum number of attribute values rendered by a verbose description.
pub const DEFAULT_VERBOSE_LIMIT: usize = 32;

/// Configuration shared by composite views.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeConfig {
    /// Multiplier applied to summed partition units to account for the
    /// bookkeeping cost of the composite view itself.
    pub units_overhead: f64,

    /// Maximum number of attribute values listed by `describe(true)`.
    pub verbose_limit: usize,
}

impl CompositeConfig {
    /// Configuration with default values, usable in constant contexts.
    pub const DEFAULT: Self = Self {
        units_overhead: DEFAULT_UNITS_OVERHEAD,
        verbose_limit: DEFAULT_VERBOSE_LIMIT,
    };

    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the units overhead factor.
    #[must_use]
    pub const fn units_overhead(mut self, factor: f64) -> Self {
        self.units_overhead = factor;
        self
    }

    /// Sets the verbose description limit.
    #[must_use]
    pub const fn verbose_limit(mut self, limit: usize) -> Self {
        self.verbose_limit = limit;
        self
    }

    /// Applies the overhead factor to a raw units sum.
    #[must_use]
    pub fn scale_units(&self, raw: u64) -> u64 {
        (raw as f64 * self.units_overhead).round() as u64
    }
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
