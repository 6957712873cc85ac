//! # Trait Hierarchy
//!
//! This module defines the seams between the buffer pool and the two
//! substrate structures it composes: a keyed index over resident frames
//! (the page table) and a victim-selection policy (the replacer).
//!
//! ## Architecture
//!
//! ```text
//!                ┌─────────────────────────────────────────┐
//!                │            CoreIndex<K, V>              │
//!                │                                         │
//!                │  insert(&mut, K, V) → Option<V>         │
//!                │  get(&, &K) → Option<&V>                │
//!                │  remove(&mut, &K) → Option<V>           │
//!                │  len(&) → usize                         │
//!                │  is_empty(&) → bool                     │
//!                └──────────────────┬──────────────────────┘
//!                                   │
//!                                   ▼
//!                ┌─────────────────────────────────────────┐
//!                │         DirectoryIndex<K, V>            │
//!                │                                         │
//!                │  global_depth(&) → usize                │
//!                │  local_depth(&, usize) → usize          │
//!                │  num_buckets(&) → usize                 │
//!                │  bucket_size(&) → usize                 │
//!                └─────────────────────────────────────────┘
//!
//!                ┌─────────────────────────────────────────┐
//!                │              Replacer                   │
//!                │                                         │
//!                │  record_access(&mut, FrameId)           │
//!                │  set_evictable(&mut, FrameId, bool)     │
//!                │  evict(&mut) → Option<FrameId>          │
//!                │  remove(&mut, FrameId)                  │
//!                │      → Result<bool, PinnedFrameError>   │
//!                │  size(&) → usize                        │
//!                └─────────────────────────────────────────┘
//! ```
//!
//! ## Trait Summary
//!
//! | Trait            | Extends     | Purpose                                  |
//! |------------------|-------------|------------------------------------------|
//! | `CoreIndex`      | -           | Map surface every page table supports    |
//! | `DirectoryIndex` | `CoreIndex` | Directory/depth observers for extendible |
//! |                  |             | layouts                                  |
//! | `Replacer`       | -           | Victim selection over frame ids          |
//!
//! The traits are implemented by the single-threaded core types; the
//! `Concurrent*` wrappers expose the same surface through `&self` methods
//! behind one lock. Code that pins pages, performs I/O, or couples the
//! index with the replacer belongs to the caller, not here.

use crate::error::PinnedFrameError;
use crate::replacer::FrameId;

/// Keyed map surface shared by page-table implementations.
///
/// # Example
///
/// ```
/// use framekit::index::extendible::ExtendibleHashTable;
/// use framekit::traits::CoreIndex;
///
/// fn load_resident<I: CoreIndex<u64, usize>>(index: &mut I, pages: &[(u64, usize)]) {
///     for (page_id, frame) in pages {
///         index.insert(*page_id, *frame);
///     }
/// }
///
/// let mut table = ExtendibleHashTable::new(4);
/// load_resident(&mut table, &[(9, 0), (12, 1)]);
/// assert_eq!(table.len(), 2);
/// ```
pub trait CoreIndex<K, V> {
    /// Inserts or overwrites, returning the previous value if one existed.
    ///
    /// Insertion never fails; the implementation grows as needed.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// Returns a reference to the value stored under `key`.
    fn get(&self, key: &K) -> Option<&V>;

    /// Removes the entry under `key`, returning its value if one existed.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Returns the number of entries currently stored.
    fn len(&self) -> usize;

    /// Returns `true` if the index holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Observers specific to extendible (directory + bucket) layouts.
///
/// All four return a snapshot consistent with each other at the time of the
/// call; under the concurrent wrapper each call observes the state between
/// two complete operations.
///
/// # Example
///
/// ```
/// use framekit::index::extendible::ExtendibleHashTable;
/// use framekit::traits::DirectoryIndex;
///
/// let table: ExtendibleHashTable<u64, u64> = ExtendibleHashTable::new(4);
/// assert_eq!(table.global_depth(), 0);
/// assert_eq!(table.num_buckets(), 1);
/// ```
pub trait DirectoryIndex<K, V>: CoreIndex<K, V> {
    /// Number of hash bits used to index the directory.
    fn global_depth(&self) -> usize;

    /// Local depth of the bucket referenced by directory slot `dir_index`.
    ///
    /// # Panics
    ///
    /// Panics if `dir_index` is outside the current directory.
    fn local_depth(&self, dir_index: usize) -> usize;

    /// Number of distinct buckets reachable from the directory.
    fn num_buckets(&self) -> usize;

    /// Maximum number of entries a single bucket holds.
    fn bucket_size(&self) -> usize;
}

/// Victim-selection policy over buffer-pool frame ids.
///
/// The replacer never sees page contents; frames are opaque integers. The
/// caller records accesses as pages are pinned and flips frames evictable
/// as pin counts reach zero.
///
/// # Example
///
/// ```
/// use framekit::replacer::lru_k::LrukReplacer;
/// use framekit::traits::Replacer;
///
/// let mut replacer = LrukReplacer::new(8, 2);
/// replacer.record_access(0);
/// replacer.record_access(1);
/// replacer.set_evictable(0, true);
/// replacer.set_evictable(1, true);
///
/// // Frame 0 was first touched longest ago
/// assert_eq!(replacer.evict(), Some(0));
/// assert_eq!(replacer.size(), 1);
/// ```
pub trait Replacer {
    /// Registers one access to `frame_id` at a fresh timestamp.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id` is outside the replacer's frame range.
    fn record_access(&mut self, frame_id: FrameId);

    /// Marks `frame_id` evictable or pinned. Unknown frames are a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id` is outside the replacer's frame range.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool);

    /// Selects, forgets, and returns the frame with the largest backward
    /// K-distance, or `None` when nothing is evictable.
    fn evict(&mut self) -> Option<FrameId>;

    /// Forgets `frame_id` regardless of its K-distance.
    ///
    /// Returns `Ok(true)` if the frame was tracked and dropped, `Ok(false)`
    /// if it was unknown, and [`PinnedFrameError`] if it is still pinned.
    fn remove(&mut self, frame_id: FrameId) -> Result<bool, PinnedFrameError>;

    /// Returns the number of evictable frames.
    fn size(&self) -> usize;
}
