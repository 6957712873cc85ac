//! # Extendible Hash Table
//!
//! This module provides the page-table index of the buffer pool: a hash map
//! whose directory doubles and whose buckets split as entries accumulate,
//! so lookups stay O(1) without ever rehashing the whole table.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                     ExtendibleHashTable<K, V>                        │
//!   │                                                                      │
//!   │   directory: Vec<SlotId>            buckets: SlotArena<Bucket>       │
//!   │   (len = 2^global_depth)                                             │
//!   │                                                                      │
//!   │   index  low hash bits    slot      ┌──────────────────────────────┐ │
//!   │   ┌────┬───────────────┬───────┐    │ id_a: depth 2, [(k1,v1),..]  │ │
//!   │   │ 00 │      ..00     │ id_a  │───►│                              │ │
//!   │   │ 01 │      ..01     │ id_b  │───►│ id_b: depth 1, [(k2,v2),..]  │ │
//!   │   │ 10 │      ..10     │ id_c  │───►│                              │ │
//!   │   │ 11 │      ..11     │ id_b  │───►│ id_c: depth 2, [(k3,v3),..]  │ │
//!   │   └────┴───────────────┴───────┘    └──────────────────────────────┘ │
//!   │                                                                      │
//!   │   index_of(key) = hash(key) & (2^global_depth - 1)                   │
//!   │                                                                      │
//!   │   A bucket with local depth d is shared by exactly                   │
//!   │   2^(global_depth - d) directory slots.                              │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Insert and Split Flow
//!
//! ```text
//!   insert(key, value):
//!     loop:
//!       bucket = directory[index_of(key)]
//!       key already present        → overwrite, done
//!       bucket has room            → append, done
//!       bucket full:
//!         local depth == global    → double the directory
//!                                    (slot i+old_len aliases slot i)
//!         split the bucket by the new high bit of its local mask:
//!           referring slots with the bit set  → fresh high bucket
//!           referring slots with the bit clear → fresh low bucket
//!           items redistribute by the same bit of their hash
//!       retry with the same (key, value)
//! ```
//!
//! The retry loop terminates as soon as the colliding items disagree on
//! some hash bit. Keys whose hashes are all identical would split forever;
//! that input is outside the contract (every supported key type hashes
//! through a well-distributed `BuildHasher`).
//!
//! ## Core Operations
//!
//! | Method                  | Complexity     | Description                        |
//! |-------------------------|----------------|------------------------------------|
//! | `new(bucket_size)`      | O(1)           | Single bucket, global depth 0      |
//! | `insert(key, val)`      | O(1) amortised | Insert/overwrite, splits as needed |
//! | `get(&key)`             | O(bucket_size) | Lookup without structural change   |
//! | `remove(&key)`          | O(bucket_size) | Erase; buckets never merge         |
//! | `global_depth()`        | O(1)           | Directory address width in bits    |
//! | `local_depth(slot)`     | O(1)           | Depth of the bucket behind a slot  |
//! | `num_buckets()`         | O(1)           | Distinct reachable buckets         |
//!
//! ## Design Rationale
//!
//! - **Arena-backed buckets.** Directory slots hold [`SlotId`]s into a
//!   [`SlotArena`], not owning pointers. A split allocates two arena entries
//!   and rewrites the referring slots; aliased slots observe bucket
//!   mutations through the shared id without any reference counting.
//! - **Doubling by self-append.** Extending the directory duplicates the
//!   slot vector onto itself, so slot `i + old_len` starts out aliasing
//!   slot `i`, which is exactly the aliasing the depth accounting requires.
//! - **No resize-down.** Removal empties buckets but never merges them or
//!   shrinks the directory; page tables churn and would re-split at once.
//!
//! ## Thread Safety
//!
//! - `ExtendibleHashTable` is **not** thread-safe; it is the single-owner
//!   core with `&mut self` mutators.
//! - [`ConcurrentExtendibleHashTable`] wraps the core behind one
//!   `parking_lot::Mutex`, giving linearisable operations through `&self`.
//!   No operation blocks on anything but that lock, and no helper
//!   re-acquires it.
//!
//! ## Example Usage
//!
//! ```
//! use framekit::index::extendible::ExtendibleHashTable;
//!
//! // Page table mapping page ids to frame slots, 4 entries per bucket
//! let mut table: ExtendibleHashTable<u64, usize> = ExtendibleHashTable::new(4);
//!
//! for page_id in 0..64u64 {
//!     table.insert(page_id, (page_id as usize) % 16);
//! }
//!
//! assert_eq!(table.len(), 64);
//! assert_eq!(table.get(&9), Some(&9));
//! assert!(table.global_depth() >= 4);
//!
//! // Overwrite relocates nothing
//! table.insert(9, 3);
//! assert_eq!(table.get(&9), Some(&3));
//!
//! // Remove reports whether the key was present
//! assert_eq!(table.remove(&9), Some(3));
//! assert_eq!(table.remove(&9), None);
//! ```
//!
//! ## Academic Reference
//!
//! Fagin, R., Nievergelt, J., Pippenger, N., & Strong, H. R. (1979).
//! "Extendible hashing—a fast access method for dynamic files."
//! ACM Transactions on Database Systems, 4(3), 315-344.

use std::fmt;
use std::hash::{BuildHasher, Hash};

use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;

use crate::ds::{SlotArena, SlotId};
use crate::error::ConfigError;
#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;
use crate::traits::{CoreIndex, DirectoryIndex};

/// One bucket: a flat list of entries agreeing on the low `local_depth`
/// hash bits. Capacity is enforced by the table, which owns `bucket_size`.
#[derive(Debug, Clone)]
struct Bucket<K, V> {
    local_depth: usize,
    items: Vec<(K, V)>,
}

impl<K: Eq, V> Bucket<K, V> {
    fn new(local_depth: usize, capacity: usize) -> Self {
        Self {
            local_depth,
            items: Vec::with_capacity(capacity),
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let pos = self.items.iter().position(|(k, _)| k == key)?;
        Some(self.items.swap_remove(pos).1)
    }

    /// Places the pair, overwriting an existing key. A full bucket hands
    /// the pair back so the caller can split and retry.
    fn try_insert(&mut self, key: K, value: V, capacity: usize) -> Result<Option<V>, (K, V)> {
        if let Some(entry) = self.items.iter_mut().find(|(k, _)| *k == key) {
            return Ok(Some(std::mem::replace(&mut entry.1, value)));
        }
        if self.items.len() >= capacity {
            return Err((key, value));
        }
        self.items.push((key, value));
        Ok(None)
    }
}

/// Extendible hash table with a doubling directory and splitting buckets.
///
/// Keys must be `Hash + Eq`; the hash function comes from the table's
/// `BuildHasher` (deterministic [`FxBuildHasher`] by default, swappable via
/// [`with_hasher`](Self::with_hasher); tests install a transparent hasher
/// to steer keys into chosen buckets).
///
/// # Example
///
/// ```
/// use framekit::index::extendible::ExtendibleHashTable;
///
/// let mut table = ExtendibleHashTable::new(2);
/// table.insert(7, "x");
/// table.insert(7, "y");
///
/// // Key uniqueness: the second insert overwrote
/// assert_eq!(table.get(&7), Some(&"y"));
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.num_buckets(), 1);
/// ```
pub struct ExtendibleHashTable<K, V, S = FxBuildHasher> {
    bucket_size: usize,
    global_depth: usize,
    directory: Vec<SlotId>,
    buckets: SlotArena<Bucket<K, V>>,
    entries: usize,
    hasher: S,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: Hash + Eq,
{
    /// Creates a table with a single empty bucket and global depth 0.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_size` is zero; use [`try_new`](Self::try_new) to
    /// validate caller-supplied configuration.
    pub fn new(bucket_size: usize) -> Self {
        Self::with_hasher(bucket_size, FxBuildHasher::default())
    }

    /// Fallible variant of [`new`](Self::new).
    pub fn try_new(bucket_size: usize) -> Result<Self, ConfigError> {
        Self::try_with_hasher(bucket_size, FxBuildHasher::default())
    }
}

impl<K, V, S> ExtendibleHashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a table with a caller-chosen `BuildHasher`.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_size` is zero.
    pub fn with_hasher(bucket_size: usize, hasher: S) -> Self {
        match Self::try_with_hasher(bucket_size, hasher) {
            Ok(table) => table,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible variant of [`with_hasher`](Self::with_hasher).
    pub fn try_with_hasher(bucket_size: usize, hasher: S) -> Result<Self, ConfigError> {
        if bucket_size == 0 {
            return Err(ConfigError::new("bucket_size must be > 0"));
        }
        let mut buckets = SlotArena::with_capacity(1);
        let root = buckets.insert(Bucket::new(0, bucket_size));
        Ok(Self {
            bucket_size,
            global_depth: 0,
            directory: vec![root],
            buckets,
            entries: 0,
            hasher,
        })
    }

    /// Returns the directory index a key currently routes to.
    #[inline]
    pub fn index_of(&self, key: &K) -> usize {
        (self.hash_of(key) as usize) & self.dir_mask()
    }

    /// Inserts or overwrites, returning the previous value if one existed.
    ///
    /// A full bucket is split (raising its local depth) and the directory
    /// doubles whenever the bucket already uses every directory bit; the
    /// insert then retries. Splitting is invisible to readers of other
    /// buckets: only the slots that referenced the full bucket move.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut pair = (key, value);
        loop {
            let index = self.index_of(&pair.0);
            let id = self.directory[index];
            let bucket = self
                .buckets
                .get_mut(id)
                .expect("directory slot references a live bucket");
            match bucket.try_insert(pair.0, pair.1, self.bucket_size) {
                Ok(previous) => {
                    if previous.is_none() {
                        self.entries += 1;
                    }
                    return previous;
                }
                Err(returned) => pair = returned,
            }

            if self.local_depth(index) == self.global_depth {
                self.double_directory();
            }
            self.split_bucket(&pair.0);
        }
    }

    /// Returns a reference to the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let id = self.directory[self.index_of(key)];
        self.buckets.get(id)?.get(key)
    }

    /// Removes the entry under `key`, returning its value if one existed.
    ///
    /// Buckets are never merged and the directory never shrinks.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.directory[self.index_of(key)];
        let removed = self.buckets.get_mut(id)?.remove(key);
        if removed.is_some() {
            self.entries -= 1;
        }
        removed
    }

    /// Number of hash bits used to index the directory.
    #[inline]
    pub fn global_depth(&self) -> usize {
        self.global_depth
    }

    /// Local depth of the bucket referenced by directory slot `dir_index`.
    ///
    /// # Panics
    ///
    /// Panics if `dir_index >= 2^global_depth`.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        let id = self.directory[dir_index];
        self.buckets
            .get(id)
            .expect("directory slot references a live bucket")
            .local_depth
    }

    /// Number of distinct buckets reachable from the directory.
    #[inline]
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Maximum number of entries a single bucket holds.
    #[inline]
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Number of entries currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Returns `true` if the table holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    #[inline]
    fn hash_of(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn dir_mask(&self) -> usize {
        (1usize << self.global_depth) - 1
    }

    /// Doubles the directory in place; slot `i + old_len` aliases slot `i`.
    fn double_directory(&mut self) {
        self.directory.extend_from_within(..);
        self.global_depth += 1;
    }

    /// Splits the bucket `key` routes to by the next bit of its local mask.
    ///
    /// Requires `local_depth < global_depth` for the target bucket, which
    /// the insert loop guarantees by doubling first.
    fn split_bucket(&mut self, key: &K) {
        let old_id = self.directory[self.index_of(key)];
        let old_depth = self
            .buckets
            .get(old_id)
            .expect("directory slot references a live bucket")
            .local_depth;
        debug_assert!(old_depth < self.global_depth);
        let split_bit = 1usize << old_depth;

        // Allocate the replacements before retiring the old bucket so the
        // three ids are distinct while the directory is rewritten.
        let low_id = self.buckets.insert(Bucket::new(old_depth + 1, self.bucket_size));
        let high_id = self.buckets.insert(Bucket::new(old_depth + 1, self.bucket_size));

        for slot in 0..self.directory.len() {
            if self.directory[slot] == old_id {
                self.directory[slot] = if slot & split_bit != 0 { high_id } else { low_id };
            }
        }

        let old = self
            .buckets
            .remove(old_id)
            .expect("split target is a live bucket");
        for (k, v) in old.items {
            let hash = self.hash_of(&k) as usize;
            let target = if hash & split_bit != 0 { high_id } else { low_id };
            self.buckets
                .get_mut(target)
                .expect("freshly split bucket is live")
                .items
                .push((k, v));
        }
    }

    /// Validates every structural invariant of the directory and buckets.
    ///
    /// Compiled only for tests and debug builds; the checks walk the whole
    /// structure and are far too slow for release paths.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.directory.len() != 1usize << self.global_depth {
            return Err(InvariantError::new(format!(
                "directory length {} != 2^global_depth (depth {})",
                self.directory.len(),
                self.global_depth
            )));
        }

        for (slot, id) in self.directory.iter().enumerate() {
            if !self.buckets.contains(*id) {
                return Err(InvariantError::new(format!(
                    "directory slot {slot} references a vacant bucket"
                )));
            }
        }

        let mut total_items = 0usize;
        for (id, bucket) in self.buckets.iter() {
            total_items += bucket.items.len();

            if bucket.local_depth > self.global_depth {
                return Err(InvariantError::new(format!(
                    "bucket {:?} local depth {} exceeds global depth {}",
                    id, bucket.local_depth, self.global_depth
                )));
            }
            if bucket.items.len() > self.bucket_size {
                return Err(InvariantError::new(format!(
                    "bucket {:?} holds {} items, bucket_size is {}",
                    id,
                    bucket.items.len(),
                    self.bucket_size
                )));
            }

            let referrers: Vec<usize> = (0..self.directory.len())
                .filter(|&slot| self.directory[slot] == id)
                .collect();
            let expected = 1usize << (self.global_depth - bucket.local_depth);
            if referrers.len() != expected {
                return Err(InvariantError::new(format!(
                    "bucket {:?} referenced by {} slots, expected {}",
                    id,
                    referrers.len(),
                    expected
                )));
            }

            let local_mask = (1usize << bucket.local_depth) - 1;
            let anchor = referrers[0] & local_mask;
            for &slot in &referrers {
                if slot & local_mask != anchor {
                    return Err(InvariantError::new(format!(
                        "bucket {:?} referred from slots disagreeing on low bits ({slot:#b})",
                        id
                    )));
                }
            }
            for (k, _) in &bucket.items {
                if (self.hash_of(k) as usize) & local_mask != anchor {
                    return Err(InvariantError::new(format!(
                        "bucket {:?} holds a key outside its hash prefix",
                        id
                    )));
                }
            }
        }

        if total_items != self.entries {
            return Err(InvariantError::new(format!(
                "entry count {} != items reachable from directory {}",
                self.entries, total_items
            )));
        }
        Ok(())
    }
}

impl<K, V, S> fmt::Debug for ExtendibleHashTable<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendibleHashTable")
            .field("bucket_size", &self.bucket_size)
            .field("global_depth", &self.global_depth)
            .field("num_buckets", &self.buckets.len())
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl<K, V, S> CoreIndex<K, V> for ExtendibleHashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        ExtendibleHashTable::insert(self, key, value)
    }

    fn get(&self, key: &K) -> Option<&V> {
        ExtendibleHashTable::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        ExtendibleHashTable::remove(self, key)
    }

    fn len(&self) -> usize {
        ExtendibleHashTable::len(self)
    }
}

impl<K, V, S> DirectoryIndex<K, V> for ExtendibleHashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn global_depth(&self) -> usize {
        ExtendibleHashTable::global_depth(self)
    }

    fn local_depth(&self, dir_index: usize) -> usize {
        ExtendibleHashTable::local_depth(self, dir_index)
    }

    fn num_buckets(&self) -> usize {
        ExtendibleHashTable::num_buckets(self)
    }

    fn bucket_size(&self) -> usize {
        ExtendibleHashTable::bucket_size(self)
    }
}

/// Thread-safe extendible hash table behind a single `parking_lot::Mutex`.
///
/// Every operation acquires the table latch on entry and releases it on
/// every return path; the guard is never held across anything that blocks.
/// This is the shape a buffer pool embeds as its page table.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use framekit::index::extendible::ConcurrentExtendibleHashTable;
///
/// let table = Arc::new(ConcurrentExtendibleHashTable::new(4));
///
/// let writers: Vec<_> = (0..4u64)
///     .map(|t| {
///         let table = Arc::clone(&table);
///         thread::spawn(move || {
///             for i in 0..64u64 {
///                 table.insert(t * 64 + i, i);
///             }
///         })
///     })
///     .collect();
/// for handle in writers {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(table.len(), 256);
/// assert_eq!(table.get(&70), Some(6));
/// ```
pub struct ConcurrentExtendibleHashTable<K, V, S = FxBuildHasher> {
    inner: Mutex<ExtendibleHashTable<K, V, S>>,
}

impl<K, V> ConcurrentExtendibleHashTable<K, V>
where
    K: Hash + Eq,
{
    /// Creates a concurrent table with the default hasher.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_size` is zero.
    pub fn new(bucket_size: usize) -> Self {
        Self {
            inner: Mutex::new(ExtendibleHashTable::new(bucket_size)),
        }
    }

    /// Fallible variant of [`new`](Self::new).
    pub fn try_new(bucket_size: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Mutex::new(ExtendibleHashTable::try_new(bucket_size)?),
        })
    }
}

impl<K, V, S> ConcurrentExtendibleHashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a concurrent table with a caller-chosen `BuildHasher`.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_size` is zero.
    pub fn with_hasher(bucket_size: usize, hasher: S) -> Self {
        Self {
            inner: Mutex::new(ExtendibleHashTable::with_hasher(bucket_size, hasher)),
        }
    }

    /// Inserts or overwrites, returning the previous value if one existed.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().insert(key, value)
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().get(key).is_some()
    }

    /// Removes the entry under `key`, returning its value if one existed.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Number of hash bits used to index the directory.
    pub fn global_depth(&self) -> usize {
        self.inner.lock().global_depth()
    }

    /// Local depth of the bucket referenced by directory slot `dir_index`.
    ///
    /// # Panics
    ///
    /// Panics if `dir_index >= 2^global_depth`.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        self.inner.lock().local_depth(dir_index)
    }

    /// Number of distinct buckets reachable from the directory.
    pub fn num_buckets(&self) -> usize {
        self.inner.lock().num_buckets()
    }

    /// Maximum number of entries a single bucket holds.
    pub fn bucket_size(&self) -> usize {
        self.inner.lock().bucket_size()
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Runs `f` against the locked core table.
    ///
    /// Useful for multi-step reads that must observe one consistent
    /// snapshot. `f` must not call back into this wrapper.
    pub fn with_table<R>(&self, f: impl FnOnce(&ExtendibleHashTable<K, V, S>) -> R) -> R {
        f(&self.inner.lock())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

impl<K, V, S> fmt::Debug for ConcurrentExtendibleHashTable<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.lock().fmt(f)
    }
}
