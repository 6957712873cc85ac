//! Frame replacement policies.
//!
//! A replacer decides which buffer-pool frame to reclaim when every frame
//! is occupied. It sees only frame ids and access events; pages, pin
//! counts, and disk I/O stay with the caller.

pub mod lru_k;

/// Identifier of a buffer-pool frame slot.
///
/// Frames are dense indices in `0..num_frames`; the replacer treats them
/// as opaque.
pub type FrameId = usize;

pub use lru_k::{ConcurrentLrukReplacer, LrukReplacer};
