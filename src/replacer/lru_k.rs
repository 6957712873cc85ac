//! # LRU-K Replacer
//!
//! This module provides the victim-selection policy of the buffer pool:
//! LRU-K eviction over frame ids. LRU-K improves on plain LRU by ranking
//! frames by the age of their K-th most recent access, so a one-pass scan
//! cannot flush the pages a workload actually re-reads.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          LrukReplacer                                │
//!   │                                                                      │
//!   │   frames: FxHashMap<FrameId, FrameState>                             │
//!   │   ┌─────────┬──────────────────────────────┬───────────┐             │
//!   │   │  frame  │  access history (oldest→new) │ evictable │             │
//!   │   ├─────────┼──────────────────────────────┼───────────┤             │
//!   │   │    4    │  [t₂, t₇]          (≥ K)     │   true    │             │
//!   │   │    1    │  [t₅]              (< K)     │   false   │             │
//!   │   │    6    │  [t₃, t₆, t₉]      (≥ K)     │   true    │             │
//!   │   └─────────┴──────────────────────────────┴───────────┘             │
//!   │                                                                      │
//!   │   history_queue: frames with < K accesses, first-access order        │
//!   │   cache_queue:   frames promoted on their K-th access                │
//!   │                                                                      │
//!   │   curr_size = number of tracked frames with evictable = true         │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Eviction Policy
//!
//! A frame's backward K-distance is `now − t(K-th most recent access)`,
//! and +∞ while fewer than K accesses have been recorded. Among evictable
//! frames:
//!
//! 1. +∞ beats every finite distance: the history queue is scanned first,
//!    in first-access order, so ties at +∞ go to the frame touched first
//!    longest ago.
//! 2. Otherwise the cache queue frame maximising the backward K-distance
//!    (oldest K-th access) is chosen.
//!
//! ```text
//!   K = 2, now = t₉:
//!
//!     frame 1: [t₅]        < K  → +∞   ┐ history queue, t₅ first
//!     frame 3: [t₈]        < K  → +∞   ┘ → frame 1 evicted first
//!
//!     frame 4: [t₂, t₇]    dist = t₉ − t₂ = 7  ← largest, next victim
//!     frame 6: [t₆, t₉]    dist = t₉ − t₆ = 3
//! ```
//!
//! ## Core Operations
//!
//! | Method               | Complexity | Description                          |
//! |----------------------|------------|--------------------------------------|
//! | `new(frames, k)`     | O(1)       | Empty replacer, nothing evictable    |
//! | `record_access(f)`   | O(1)*      | Stamp one access (O(k) on promotion) |
//! | `set_evictable(f,b)` | O(1)       | Toggle, adjusts `size()`             |
//! | `evict()`            | O(n)       | Select + forget max-distance frame   |
//! | `remove(f)`          | O(n)       | Forget regardless of distance        |
//! | `size()`             | O(1)       | Count of evictable frames            |
//!
//! ## Per-frame State Machine
//!
//! ```text
//!   Absent ──record_access──► History(<K) ──K-th access──► Cache(≥K)
//!     ▲                           │                            │
//!     └────────── evict / remove ─┴────────────────────────────┘
//! ```
//!
//! The evictable flag is orthogonal to the state: it gates eligibility and
//! the `size()` accounting, nothing else. Each history retains `k + 1`
//! timestamps so the pre-access K-th timestamp survives the access that
//! displaces it; retaining exactly `k` would pick the same victims.
//!
//! With `k == 1` the promotion edge never fires (the first access creates
//! the frame, and only a subsequent access reaching exactly K promotes),
//! so every frame stays on the history queue and eviction degenerates to
//! first-access order.
//!
//! ## Thread Safety
//!
//! - `LrukReplacer` is **not** thread-safe; it is the single-owner core
//!   with `&mut self` mutators.
//! - [`ConcurrentLrukReplacer`] wraps the core behind one
//!   `parking_lot::Mutex`; operations are linearisable and the internal
//!   forget path runs under the already-held lock, never re-acquiring it.
//!
//! ## Example Usage
//!
//! ```
//! use framekit::replacer::lru_k::LrukReplacer;
//!
//! let mut replacer = LrukReplacer::new(8, 2);
//!
//! // Pages land in frames 0 and 1 and are pinned by their readers.
//! replacer.record_access(0);
//! replacer.record_access(1);
//! replacer.record_access(0);
//! assert_eq!(replacer.size(), 0); // nothing released yet
//!
//! // Readers finish; both frames become candidates.
//! replacer.set_evictable(0, true);
//! replacer.set_evictable(1, true);
//! assert_eq!(replacer.size(), 2);
//!
//! // Frame 1 has a single access: infinite K-distance, evicted first.
//! assert_eq!(replacer.evict(), Some(1));
//! assert_eq!(replacer.evict(), Some(0));
//! assert_eq!(replacer.evict(), None);
//! ```
//!
//! ## Academic Reference
//!
//! O'Neil, E. J., O'Neil, P. E., & Weikum, G. (1993).
//! "The LRU-K page replacement algorithm for database disk buffering."
//! ACM SIGMOD Record, 22(2), 297-306.

use std::collections::VecDeque;
use std::collections::hash_map::Entry;
use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::ds::AccessHistory;
use crate::error::{ConfigError, PinnedFrameError};
#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;
use crate::replacer::FrameId;
use crate::traits::Replacer;

/// Tracked state for one frame: its bounded access history plus the
/// evictable flag the caller toggles as pin counts rise and fall.
#[derive(Debug, Clone)]
struct FrameState {
    history: AccessHistory,
    evictable: bool,
}

impl FrameState {
    fn new(retain: usize) -> Self {
        Self {
            history: AccessHistory::new(retain),
            evictable: false,
        }
    }
}

/// LRU-K victim selector over buffer-pool frame ids.
///
/// Tracks up to `k + 1` access timestamps per frame and evicts the
/// evictable frame with the greatest backward K-distance; frames with
/// fewer than `k` accesses count as infinitely distant and go first, in
/// first-access order.
///
/// # Example
///
/// ```
/// use framekit::replacer::lru_k::LrukReplacer;
///
/// let mut replacer = LrukReplacer::new(4, 2);
/// for frame in 0..3 {
///     replacer.record_access(frame);
///     replacer.set_evictable(frame, true);
/// }
///
/// // Re-reading frame 0 promotes it past the single-access frames.
/// replacer.record_access(0);
/// assert_eq!(replacer.evict(), Some(1));
/// assert_eq!(replacer.evict(), Some(2));
/// assert_eq!(replacer.evict(), Some(0));
/// ```
pub struct LrukReplacer {
    capacity: usize,
    k: usize,
    current_timestamp: u64,
    curr_size: usize,
    frames: FxHashMap<FrameId, FrameState>,
    history_queue: VecDeque<FrameId>,
    cache_queue: VecDeque<FrameId>,
}

impl LrukReplacer {
    /// Creates a replacer for frames `0..num_frames` with parameter `k`.
    ///
    /// # Panics
    ///
    /// Panics if `num_frames` is zero or `k` is zero; use
    /// [`try_new`](Self::try_new) to validate caller-supplied configuration.
    pub fn new(num_frames: usize, k: usize) -> Self {
        match Self::try_new(num_frames, k) {
            Ok(replacer) => replacer,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible variant of [`new`](Self::new).
    pub fn try_new(num_frames: usize, k: usize) -> Result<Self, ConfigError> {
        if num_frames == 0 {
            return Err(ConfigError::new("num_frames must be > 0"));
        }
        if k == 0 {
            return Err(ConfigError::new("k must be >= 1"));
        }
        Ok(Self {
            capacity: num_frames,
            k,
            current_timestamp: 0,
            curr_size: 0,
            frames: FxHashMap::default(),
            history_queue: VecDeque::new(),
            cache_queue: VecDeque::new(),
        })
    }

    /// Registers one access to `frame_id` at a fresh timestamp.
    ///
    /// The first access starts tracking the frame (pinned, on the history
    /// queue); the access that brings its recorded count to exactly `k`
    /// promotes it to the cache queue. Evictability is untouched.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id >= num_frames`.
    pub fn record_access(&mut self, frame_id: FrameId) {
        assert!(
            frame_id < self.capacity,
            "frame {frame_id} out of range for replacer over {} frames",
            self.capacity
        );
        self.current_timestamp += 1;
        let timestamp = self.current_timestamp;

        match self.frames.entry(frame_id) {
            Entry::Occupied(mut entry) => {
                let state = entry.get_mut();
                state.history.record(timestamp);
                if state.history.len() == self.k {
                    detach(&mut self.history_queue, frame_id);
                    self.cache_queue.push_back(frame_id);
                }
            }
            Entry::Vacant(entry) => {
                let state = entry.insert(FrameState::new(self.k + 1));
                state.history.record(timestamp);
                self.history_queue.push_back(frame_id);
            }
        }
    }

    /// Marks `frame_id` evictable or pinned.
    ///
    /// Unknown frames are a no-op; `size()` changes only when the flag
    /// actually flips.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id >= num_frames`.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        assert!(
            frame_id < self.capacity,
            "frame {frame_id} out of range for replacer over {} frames",
            self.capacity
        );
        if let Some(state) = self.frames.get_mut(&frame_id) {
            if state.evictable != evictable {
                state.evictable = evictable;
                if evictable {
                    self.curr_size += 1;
                } else {
                    self.curr_size -= 1;
                }
            }
        }
    }

    /// Selects, forgets, and returns the evictable frame with the greatest
    /// backward K-distance, or `None` if nothing is evictable.
    ///
    /// Frames still short of `k` accesses are infinitely distant and are
    /// taken first, oldest first access winning; otherwise the cache queue
    /// is scanned for the oldest K-th-most-recent access.
    pub fn evict(&mut self) -> Option<FrameId> {
        if self.curr_size == 0 {
            return None;
        }

        let from_history = self
            .history_queue
            .iter()
            .copied()
            .find(|frame_id| matches!(self.frames.get(frame_id), Some(state) if state.evictable));
        if let Some(frame_id) = from_history {
            self.forget(frame_id);
            return Some(frame_id);
        }

        let mut victim: Option<(FrameId, u64)> = None;
        for &frame_id in &self.cache_queue {
            let state = match self.frames.get(&frame_id) {
                Some(state) => state,
                None => continue,
            };
            if !state.evictable {
                continue;
            }
            let kth = match state.history.kth_most_recent(self.k) {
                Some(kth) => kth,
                None => continue,
            };
            let distance = self.current_timestamp - kth;
            let replace = match victim {
                Some((_, best)) => distance > best,
                None => true,
            };
            if replace {
                victim = Some((frame_id, distance));
            }
        }

        let (frame_id, _) = victim?;
        self.forget(frame_id);
        Some(frame_id)
    }

    /// Forgets `frame_id` regardless of its K-distance.
    ///
    /// Returns `Ok(true)` if the frame was tracked and dropped, `Ok(false)`
    /// if it was unknown, and [`PinnedFrameError`] if the frame is tracked
    /// but not evictable; forcibly dropping a pinned frame is a caller
    /// bug.
    pub fn remove(&mut self, frame_id: FrameId) -> Result<bool, PinnedFrameError> {
        match self.frames.get(&frame_id) {
            None => Ok(false),
            Some(state) if !state.evictable => Err(PinnedFrameError::new(frame_id)),
            Some(_) => {
                self.forget(frame_id);
                Ok(true)
            }
        }
    }

    /// Returns the number of evictable frames.
    #[inline]
    pub fn size(&self) -> usize {
        self.curr_size
    }

    /// Returns the number of tracked frames, evictable or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if no frame is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the `k` parameter.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the frame range bound (`num_frames`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if `frame_id` is tracked and currently evictable.
    pub fn is_evictable(&self, frame_id: FrameId) -> bool {
        self.frames
            .get(&frame_id)
            .map(|state| state.evictable)
            .unwrap_or(false)
    }

    /// Drops all tracking state for `frame_id`.
    ///
    /// Runs under the caller's borrow; contract checks (pinned, unknown)
    /// belong to the public entry points.
    fn forget(&mut self, frame_id: FrameId) {
        if let Some(state) = self.frames.remove(&frame_id) {
            if state.evictable {
                self.curr_size -= 1;
            }
            if !detach(&mut self.history_queue, frame_id) {
                detach(&mut self.cache_queue, frame_id);
            }
        }
    }

    /// Validates the evictable-set accounting and queue bookkeeping.
    ///
    /// Compiled only for tests and debug builds.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let evictable = self.frames.values().filter(|state| state.evictable).count();
        if evictable != self.curr_size {
            return Err(InvariantError::new(format!(
                "curr_size {} != evictable frame count {}",
                self.curr_size, evictable
            )));
        }

        if self.history_queue.len() + self.cache_queue.len() != self.frames.len() {
            return Err(InvariantError::new(format!(
                "queues hold {} frames, map tracks {}",
                self.history_queue.len() + self.cache_queue.len(),
                self.frames.len()
            )));
        }

        for (queue, name) in [(&self.history_queue, "history"), (&self.cache_queue, "cache")] {
            for &frame_id in queue {
                if frame_id >= self.capacity {
                    return Err(InvariantError::new(format!(
                        "{name} queue holds out-of-range frame {frame_id}"
                    )));
                }
                let state = match self.frames.get(&frame_id) {
                    Some(state) => state,
                    None => {
                        return Err(InvariantError::new(format!(
                            "{name} queue holds untracked frame {frame_id}"
                        )));
                    }
                };
                if state.history.is_empty() || state.history.len() > self.k + 1 {
                    return Err(InvariantError::new(format!(
                        "frame {frame_id} history length {} outside 1..={}",
                        state.history.len(),
                        self.k + 1
                    )));
                }
                state.history.debug_validate_invariants();
            }
        }

        // Promotion fires on the access reaching exactly k, so with k >= 2
        // the queues partition frames by access count; with k == 1 nothing
        // ever promotes.
        if self.k == 1 {
            if !self.cache_queue.is_empty() {
                return Err(InvariantError::new("cache queue populated with k == 1"));
            }
        } else {
            for &frame_id in &self.history_queue {
                if self.frames[&frame_id].history.len() >= self.k {
                    return Err(InvariantError::new(format!(
                        "frame {frame_id} has >= k accesses but sits on the history queue"
                    )));
                }
            }
            for &frame_id in &self.cache_queue {
                if self.frames[&frame_id].history.len() < self.k {
                    return Err(InvariantError::new(format!(
                        "frame {frame_id} has < k accesses but sits on the cache queue"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Removes the first occurrence of `frame_id` from `queue`.
fn detach(queue: &mut VecDeque<FrameId>, frame_id: FrameId) -> bool {
    match queue.iter().position(|&f| f == frame_id) {
        Some(pos) => {
            queue.remove(pos);
            true
        }
        None => false,
    }
}

impl fmt::Debug for LrukReplacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LrukReplacer")
            .field("capacity", &self.capacity)
            .field("k", &self.k)
            .field("tracked", &self.frames.len())
            .field("evictable", &self.curr_size)
            .field("timestamp", &self.current_timestamp)
            .finish_non_exhaustive()
    }
}

impl Replacer for LrukReplacer {
    fn record_access(&mut self, frame_id: FrameId) {
        LrukReplacer::record_access(self, frame_id)
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        LrukReplacer::set_evictable(self, frame_id, evictable)
    }

    fn evict(&mut self) -> Option<FrameId> {
        LrukReplacer::evict(self)
    }

    fn remove(&mut self, frame_id: FrameId) -> Result<bool, PinnedFrameError> {
        LrukReplacer::remove(self, frame_id)
    }

    fn size(&self) -> usize {
        LrukReplacer::size(self)
    }
}

/// Thread-safe LRU-K replacer behind a single `parking_lot::Mutex`.
///
/// Every operation acquires the replacer latch on entry and releases it on
/// every return path, including the error path of [`remove`](Self::remove).
/// Victim selection and the internal forget run under one acquisition.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use framekit::replacer::lru_k::ConcurrentLrukReplacer;
///
/// let replacer = Arc::new(ConcurrentLrukReplacer::new(64, 2));
///
/// let recorders: Vec<_> = (0..4usize)
///     .map(|t| {
///         let replacer = Arc::clone(&replacer);
///         thread::spawn(move || {
///             for frame in (t * 16)..(t * 16 + 16) {
///                 replacer.record_access(frame);
///                 replacer.set_evictable(frame, true);
///             }
///         })
///     })
///     .collect();
/// for handle in recorders {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(replacer.size(), 64);
/// assert!(replacer.evict().is_some());
/// assert_eq!(replacer.size(), 63);
/// ```
pub struct ConcurrentLrukReplacer {
    inner: Mutex<LrukReplacer>,
}

impl ConcurrentLrukReplacer {
    /// Creates a concurrent replacer for frames `0..num_frames`.
    ///
    /// # Panics
    ///
    /// Panics if `num_frames` is zero or `k` is zero.
    pub fn new(num_frames: usize, k: usize) -> Self {
        Self {
            inner: Mutex::new(LrukReplacer::new(num_frames, k)),
        }
    }

    /// Fallible variant of [`new`](Self::new).
    pub fn try_new(num_frames: usize, k: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Mutex::new(LrukReplacer::try_new(num_frames, k)?),
        })
    }

    /// Registers one access to `frame_id` at a fresh timestamp.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id >= num_frames`.
    pub fn record_access(&self, frame_id: FrameId) {
        self.inner.lock().record_access(frame_id)
    }

    /// Marks `frame_id` evictable or pinned; unknown frames are a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id >= num_frames`.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        self.inner.lock().set_evictable(frame_id, evictable)
    }

    /// Selects, forgets, and returns the next victim frame.
    pub fn evict(&self) -> Option<FrameId> {
        self.inner.lock().evict()
    }

    /// Forgets `frame_id`; pinned frames are refused.
    pub fn remove(&self, frame_id: FrameId) -> Result<bool, PinnedFrameError> {
        self.inner.lock().remove(frame_id)
    }

    /// Returns the number of evictable frames.
    pub fn size(&self) -> usize {
        self.inner.lock().size()
    }

    /// Returns the number of tracked frames, evictable or not.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if no frame is tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns the `k` parameter.
    pub fn k(&self) -> usize {
        self.inner.lock().k()
    }

    /// Returns the frame range bound (`num_frames`).
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Returns `true` if `frame_id` is tracked and currently evictable.
    pub fn is_evictable(&self, frame_id: FrameId) -> bool {
        self.inner.lock().is_evictable(frame_id)
    }

    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

impl fmt::Debug for ConcurrentLrukReplacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.lock().fmt(f)
    }
}
