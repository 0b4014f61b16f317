pub mod draft;

pub use draft::{DraftKey, EntityId, EntityType, TabId};
