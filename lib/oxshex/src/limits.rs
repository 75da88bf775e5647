//! Resource limits for ShEx validation.
//!
//! The recursive algorithm always terminates on a stratified schema, but the number of
//! candidate bags grows with the product of the candidate lists of the neighbour edges.
//! These opt-in caps turn pathological inputs into errors instead of long runs.

use crate::error::ShexValidationError;

/// Default maximum length for regex patterns in PATTERN facets.
pub const DEFAULT_MAX_REGEX_LENGTH: usize = 1000;

/// Default maximum number of values in a value set.
pub const DEFAULT_MAX_VALUE_SET_LENGTH: usize = 10_000;

/// Configurable resource limits for ShEx validation.
///
/// Recursion depth and bag enumeration are unbounded by default.
///
/// # Examples
///
/// ```
/// use oxshex::ValidationLimits;
///
/// // Bounded settings for untrusted schemas
/// let limits = ValidationLimits::default()
///     .with_max_recursion_depth(50)
///     .with_max_bags_per_shape(10_000);
/// assert_eq!(limits.max_recursion_depth, Some(50));
///
/// // Trusted environment
/// let trusted_limits = ValidationLimits::permissive();
/// assert_eq!(trusted_limits.max_bags_per_shape, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationLimits {
    /// Maximum number of nested (node, shape) resolutions.
    pub max_recursion_depth: Option<usize>,

    /// Maximum number of bags enumerated while checking one node against one shape.
    pub max_bags_per_shape: Option<usize>,

    /// Maximum length for regex patterns.
    pub max_regex_length: usize,

    /// Maximum number of values in a value set.
    pub max_value_set_length: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_recursion_depth: None,
            max_bags_per_shape: None,
            max_regex_length: DEFAULT_MAX_REGEX_LENGTH,
            max_value_set_length: DEFAULT_MAX_VALUE_SET_LENGTH,
        }
    }
}

impl ValidationLimits {
    /// Creates a new ValidationLimits with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates permissive limits suitable for trusted environments.
    pub fn permissive() -> Self {
        Self {
            max_recursion_depth: None,
            max_bags_per_shape: None,
            max_regex_length: 10_000,
            max_value_set_length: 1_000_000,
        }
    }

    /// Sets the maximum recursion depth.
    #[must_use]
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = Some(depth);
        self
    }

    /// Removes the recursion depth cap.
    #[must_use]
    pub fn without_max_recursion_depth(mut self) -> Self {
        self.max_recursion_depth = None;
        self
    }

    /// Sets the maximum number of bags enumerated per (node, shape) pair.
    #[must_use]
    pub fn with_max_bags_per_shape(mut self, count: usize) -> Self {
        self.max_bags_per_shape = Some(count);
        self
    }

    /// Removes the bag enumeration cap.
    #[must_use]
    pub fn without_max_bags_per_shape(mut self) -> Self {
        self.max_bags_per_shape = None;
        self
    }

    /// Sets the maximum regex pattern length.
    #[must_use]
    pub fn with_max_regex_length(mut self, length: usize) -> Self {
        self.max_regex_length = length;
        self
    }

    /// Sets the maximum value set length.
    #[must_use]
    pub fn with_max_value_set_length(mut self, length: usize) -> Self {
        self.max_value_set_length = length;
        self
    }

    pub(crate) fn check_recursion_depth(&self, depth: usize) -> Result<(), ShexValidationError> {
        match self.max_recursion_depth {
            Some(max) if depth > max => Err(ShexValidationError::recursion_limit(max)),
            _ => Ok(()),
        }
    }

    pub(crate) fn check_bag_count(
        &self,
        count: usize,
        node: impl FnOnce() -> String,
    ) -> Result<(), ShexValidationError> {
        match self.max_bags_per_shape {
            Some(limit) if count > limit => Err(ShexValidationError::BagLimit {
                node: node(),
                limit,
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn check_regex_length(&self, pattern: &str) -> Result<(), ShexValidationError> {
        if pattern.len() > self.max_regex_length {
            return Err(ShexValidationError::RegexTooLong {
                length: pattern.len(),
                max: self.max_regex_length,
            });
        }
        Ok(())
    }

    pub(crate) fn check_value_set_length(&self, length: usize) -> Result<(), ShexValidationError> {
        if length > self.max_value_set_length {
            return Err(ShexValidationError::ValueSetTooLong {
                length,
                max: self.max_value_set_length,
            });
        }
        Ok(())
    }
}
