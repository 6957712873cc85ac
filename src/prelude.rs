pub use crate::ds::{AccessHistory, SlotArena, SlotId};
pub use crate::error::{ConfigError, InvariantError, PinnedFrameError};
pub use crate::index::extendible::{ConcurrentExtendibleHashTable, ExtendibleHashTable};
pub use crate::replacer::lru_k::{ConcurrentLrukReplacer, LrukReplacer};
pub use crate::replacer::FrameId;
pub use crate::traits::{CoreIndex, DirectoryIndex, Replacer};
