pub mod elements;
pub mod store;

pub use elements::MemoryElements;
pub use store::MemoryStore;
