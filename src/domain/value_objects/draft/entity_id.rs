use crate::shared::error::DraftError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_LEN: usize = 128;

/// ドラフト対象レコードの識別子
///
/// 新規作成中のレコードには `new` などの仮 ID を使ってよい。
/// 空文字・空白・制御文字はキーを壊すため受け付けない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Result<Self, DraftError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DraftError::InvalidEntity("entity id cannot be empty".to_string()));
        }
        if value.len() > MAX_LEN {
            return Err(DraftError::InvalidEntity(format!(
                "entity id exceeds {MAX_LEN} bytes"
            )));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DraftError::InvalidEntity(format!(
                "entity id contains whitespace or control characters: {value:?}"
            )));
        }
        Ok(Self(value))
    }

    /// 数値 ID からの変換
    pub fn from_number(id: u64) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityId {
    type Error = DraftError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}
