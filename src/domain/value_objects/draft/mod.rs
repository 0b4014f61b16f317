pub mod draft_key;
pub mod entity_id;
pub mod entity_type;
pub mod tab_id;

pub use draft_key::{DraftKey, DRAFT_KEY_PREFIX};
pub use entity_id::EntityId;
pub use entity_type::EntityType;
pub use tab_id::TabId;
