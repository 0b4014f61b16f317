use crate::shared::error::DraftError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_LEN: usize = 64;
const KEY_SEPARATOR: char = '_';

/// ドラフトを保存する対象の種別（`employee`, `overtimeRequest` など）
///
/// ストレージキー `draft_{type}_{id}` では接頭辞の後の最初の `_` が種別の終わりになるため、
/// 種別には `_` を含められない。空白・制御文字も受け付けない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityType(String);

impl EntityType {
    pub fn new(value: impl Into<String>) -> Result<Self, DraftError> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_LEN {
            return Err(DraftError::InvalidEntity(format!(
                "entity type must be 1..={MAX_LEN} bytes, got {}",
                value.len()
            )));
        }
        if let Some(bad) = value
            .chars()
            .find(|c| *c == KEY_SEPARATOR || c.is_whitespace() || c.is_control())
        {
            return Err(DraftError::InvalidEntity(format!(
                "entity type contains {bad:?}: {value:?}"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntityType {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityType {
    type Error = DraftError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.0
    }
}
