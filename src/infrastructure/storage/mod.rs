pub mod file_storage;
pub mod memory_storage;

pub use file_storage::JsonFileStorage;
pub use memory_storage::MemoryStorage;
