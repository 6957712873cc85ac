pub mod extendible;

pub use extendible::{ConcurrentExtendibleHashTable, ExtendibleHashTable};
