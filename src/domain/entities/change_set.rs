use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 比較対象のレコード（属性の列挙順は挿入順）
pub type Record = Map<String, Value>;

/// 変更のあったフィールドだけを現在値で持つ部分レコード
pub type Patch = Map<String, Value>;

/// 表示・パッチ整形用の値の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::String => "string",
            ChangeType::Number => "number",
            ChangeType::Boolean => "boolean",
            ChangeType::Date => "date",
            ChangeType::Object => "object",
            ChangeType::Array => "array",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 元レコードと現在レコードの間で検出された1フィールド分の差分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub label: String,
    pub old_value: Value,
    pub new_value: Value,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
}

/// 2つのレコードを比較した結果
///
/// `changes` と `modified_fields` は常に同じ件数を保つ。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    changes: Vec<FieldChange>,
    has_changes: bool,
    modified_fields: IndexSet<String>,
    change_count: usize,
}

impl ChangeSet {
    pub fn from_changes(changes: Vec<FieldChange>) -> Self {
        let modified_fields: IndexSet<String> =
            changes.iter().map(|change| change.field.clone()).collect();
        let change_count = changes.len();
        Self {
            has_changes: change_count > 0,
            changes,
            modified_fields,
            change_count,
        }
    }

    pub fn empty() -> Self {
        Self::from_changes(Vec::new())
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    pub fn modified_fields(&self) -> &IndexSet<String> {
        &self.modified_fields
    }

    pub fn change_count(&self) -> usize {
        self.change_count
    }

    pub fn is_modified(&self, field: &str) -> bool {
        self.modified_fields.contains(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|change| change.field == field)
    }
}

impl Default for ChangeSet {
    fn default() -> Self {
        Self::empty()
    }
}
