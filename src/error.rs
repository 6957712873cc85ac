//! Error types for the framekit library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when construction parameters are invalid
//!   (e.g. zero bucket size, zero frame count, `k == 0`).
//! - [`PinnedFrameError`]: Returned when a caller tries to forcibly remove
//!   a frame that is still pinned (not marked evictable).
//! - [`InvariantError`]: Returned when internal data-structure invariants
//!   are violated (debug-only `check_invariants` methods).
//!
//! ## Example Usage
//!
//! ```
//! use framekit::error::ConfigError;
//! use framekit::replacer::lru_k::LrukReplacer;
//!
//! // Fallible constructor for user-configurable parameters
//! let replacer: Result<LrukReplacer, ConfigError> = LrukReplacer::try_new(16, 2);
//! assert!(replacer.is_ok());
//!
//! // Invalid k is caught without panicking
//! let bad = LrukReplacer::try_new(16, 0);
//! assert!(bad.is_err());
//! ```

use std::fmt;

use crate::replacer::FrameId;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when construction parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`ExtendibleHashTable::try_new`](crate::index::extendible::ExtendibleHashTable::try_new)
/// and [`LrukReplacer::try_new`](crate::replacer::lru_k::LrukReplacer::try_new).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use framekit::index::extendible::ExtendibleHashTable;
///
/// let err = ExtendibleHashTable::<u64, u64>::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("bucket_size"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// PinnedFrameError
// ---------------------------------------------------------------------------

/// Error returned when removing a frame that is not evictable.
///
/// The replacer only forgets frames the caller has released via
/// [`set_evictable`](crate::replacer::lru_k::LrukReplacer::set_evictable).
/// Asking it to drop a pinned frame is a caller bug, surfaced as this error
/// rather than silently corrupting the evictable-set accounting.
///
/// # Example
///
/// ```
/// use framekit::replacer::lru_k::LrukReplacer;
///
/// let mut replacer = LrukReplacer::new(8, 2);
/// replacer.record_access(3);
///
/// // Frame 3 is tracked but still pinned
/// let err = replacer.remove(3).unwrap_err();
/// assert_eq!(err.frame_id(), 3);
/// assert!(err.to_string().contains("pinned"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinnedFrameError {
    frame_id: FrameId,
}

impl PinnedFrameError {
    /// Creates a new `PinnedFrameError` for the given frame.
    #[inline]
    pub fn new(frame_id: FrameId) -> Self {
        Self { frame_id }
    }

    /// Returns the frame the caller tried to remove.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl fmt::Display for PinnedFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot remove pinned frame {}", self.frame_id)
    }
}

impl std::error::Error for PinnedFrameError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal invariants are violated.
///
/// Produced by the debug-only `check_invariants` methods on
/// [`ExtendibleHashTable`](crate::index::extendible::ExtendibleHashTable) and
/// [`LrukReplacer`](crate::replacer::lru_k::LrukReplacer). Carries a
/// human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("bucket_size must be > 0");
        assert_eq!(err.to_string(), "bucket_size must be > 0");
    }

    #[test]
    fn config_message_accessor() {
        let err = ConfigError::new("k must be >= 1");
        assert_eq!(err.message(), "k must be >= 1");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
    }

    // -- PinnedFrameError -------------------------------------------------

    #[test]
    fn pinned_display_names_frame() {
        let err = PinnedFrameError::new(7);
        assert_eq!(err.to_string(), "cannot remove pinned frame 7");
        assert_eq!(err.frame_id(), 7);
    }

    #[test]
    fn pinned_is_copy_and_eq() {
        let a = PinnedFrameError::new(2);
        let b = a;
        assert_eq!(a, b);
    }

    #[test]
    fn pinned_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<PinnedFrameError>();
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("directory length is not a power of two");
        assert_eq!(err.to_string(), "directory length is not a power of two");
    }

    #[test]
    fn invariant_debug_includes_message() {
        let err = InvariantError::new("stale bucket reference");
        let dbg = format!("{:?}", err);
        assert!(dbg.contains("stale bucket reference"));
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InvariantError>();
    }
}
