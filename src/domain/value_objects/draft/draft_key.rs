use super::{EntityId, EntityType};
use std::fmt;

/// ドラフト名前空間のキー接頭辞
pub const DRAFT_KEY_PREFIX: &str = "draft_";

/// `draft_{entityType}_{entityId}` 形式のストレージキー
///
/// この形式は `get_all_drafts` の接頭辞走査と `load_draft` / `clear_draft` の
/// キー再構築の両方が依存しているため、スキーマバージョンを上げずに変更しないこと。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey(String);

impl DraftKey {
    pub fn new(entity_type: &EntityType, entity_id: &EntityId) -> Self {
        Self(format!("{DRAFT_KEY_PREFIX}{entity_type}_{entity_id}"))
    }

    /// 指定したエンティティ種別の全ドラフトに共通する接頭辞
    pub fn prefix_for(entity_type: &EntityType) -> String {
        format!("{DRAFT_KEY_PREFIX}{entity_type}_")
    }

    /// ドラフト名前空間に属するキーかどうか
    pub fn is_draft_key(key: &str) -> bool {
        key.starts_with(DRAFT_KEY_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DraftKey> for String {
    fn from(value: DraftKey) -> Self {
        value.0
    }
}
