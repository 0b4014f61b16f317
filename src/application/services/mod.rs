pub mod change_tracker;
pub mod draft_service;
pub mod key_normalizer;

pub use change_tracker::{
    apply_patch, categorize_changes, format_field_label, format_value, ChangeTracker,
};
pub use draft_service::DraftStore;
pub use key_normalizer::normalize_keys;
