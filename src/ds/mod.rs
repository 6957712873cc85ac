pub mod access_history;
pub mod slot_arena;

pub use access_history::AccessHistory;
pub use slot_arena::{SlotArena, SlotId};
