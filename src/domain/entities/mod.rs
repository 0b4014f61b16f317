pub mod change_set;
pub mod draft;

pub use change_set::{ChangeSet, ChangeType, FieldChange, Patch, Record};
pub use draft::{Draft, DraftMetadata, DraftUpdate};
