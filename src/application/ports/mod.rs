pub mod draft_storage;
pub mod storage_events;

pub use draft_storage::DraftStorage;
pub use storage_events::{ListenerId, StorageEvent, StorageEventSource, StorageListener};
