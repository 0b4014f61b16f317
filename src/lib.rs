//! 編集フォーム向けの差分検出とドラフト保存
//!
//! - `ChangeTracker`: 元レコードと編集中レコードのフィールド単位の差分・パッチを求める
//! - `DraftStore`: 編集途中のレコードを共有ストレージに保存し、他のタブへの変更も通知する
//!
//! ドラフトはあくまで復元補助であり、保存に失敗しても利用者の作業を止めない。

// モジュール定義
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{DraftStorage, StorageEvent, StorageEventSource};
pub use application::services::{
    apply_patch, categorize_changes, format_field_label, format_value, normalize_keys,
    ChangeTracker, DraftStore,
};
pub use domain::entities::{
    ChangeSet, ChangeType, Draft, DraftMetadata, DraftUpdate, FieldChange, Patch, Record,
};
pub use domain::value_objects::{DraftKey, EntityId, EntityType, TabId};
pub use infrastructure::storage::{JsonFileStorage, MemoryStorage};
pub use shared::config::{DraftConfig, DRAFT_SCHEMA_VERSION};
pub use shared::error::{DraftError, Result, StorageError};
pub use shared::logging::init_logging;
