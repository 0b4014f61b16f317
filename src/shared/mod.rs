pub mod config;
pub mod error;
pub mod logging;

pub use config::{DraftConfig, DRAFT_SCHEMA_VERSION};
pub use error::{DraftError, Result, StorageError};
