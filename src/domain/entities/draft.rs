use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 編集途中のレコードを復元するためのスナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub data: Value,
    pub metadata: DraftMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMetadata {
    pub entity_id: String,
    pub entity_type: String,
    pub tab_id: String,
    pub saved_at: DateTime<Utc>,
    /// エンベロープ自体のスキーマバージョン（ペイロードのバージョンではない）
    pub version: u32,
}

impl Draft {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 保存からの経過時間
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.metadata.saved_at)
    }

    pub fn is_version(&self, version: u32) -> bool {
        self.metadata.version == version
    }
}

/// 更新通知のペイロード。`draft` が `None` の場合は削除を表す
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftUpdate {
    pub key: String,
    pub draft: Option<Draft>,
}

impl DraftUpdate {
    pub fn saved(key: impl Into<String>, draft: Draft) -> Self {
        Self {
            key: key.into(),
            draft: Some(draft),
        }
    }

    pub fn cleared(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            draft: None,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.draft.is_none()
    }
}
