//! レコードの差分検出とパッチ生成
//!
//! 保存前の確認ダイアログ用に、元レコードと編集中レコードのフィールド単位の差分を求める。
//! 状態を持たない純粋関数のみで構成され、どのスレッドから同時に呼び出してもよい。
//!
//! 値の比較規則（上から順に評価）:
//! 1. 完全一致なら未変更
//! 2. 両方が null（欠落を含む）なら未変更
//! 3. 片方だけが null なら変更
//! 4. 両方が日時なら epoch ミリ秒で比較
//! 5. 両方が配列なら長さが違えば変更、同じなら構造比較
//! 6. 両方がオブジェクトならキー順に依存しない構造比較
//! 7. それ以外はプリミティブとして比較

use crate::domain::entities::{ChangeSet, ChangeType, FieldChange, Patch, Record};
use crate::shared::error::Result;
use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// どのカテゴリにも属さない変更の分類名
pub const OTHER_CATEGORY: &str = "Other";

/// 値が空のときに表示するプレースホルダー
pub const EMPTY_PLACEHOLDER: &str = "\u{2014}";

static NULL_VALUE: Value = Value::Null;

#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    field_labels: HashMap<String, String>,
    exclude_fields: HashSet<String>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// フィールドごとの表示名を設定
    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.field_labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// 比較対象から外すフィールド（内部管理用の項目など）
    pub fn excluding<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn is_excluded(&self, field: &str) -> bool {
        self.exclude_fields.contains(field)
    }

    pub fn label_for(&self, field: &str) -> String {
        self.field_labels
            .get(field)
            .cloned()
            .unwrap_or_else(|| format_field_label(field))
    }

    /// `current` の属性順に走査し、値が異なるフィールドを変更として列挙する
    pub fn track_changes(&self, original: &Record, current: &Record) -> ChangeSet {
        let changes: Vec<FieldChange> = self
            .divergent_fields(original, current)
            .map(|(field, old_value, new_value)| FieldChange {
                field: field.clone(),
                label: self.label_for(field),
                old_value: old_value.clone(),
                new_value: new_value.clone(),
                change_type: classify_value(new_value),
            })
            .collect();

        trace!(changed = changes.len(), "tracked record changes");
        ChangeSet::from_changes(changes)
    }

    /// 変更のあったフィールドだけを現在値で持つパッチを生成
    pub fn generate_patch(&self, original: &Record, current: &Record) -> Patch {
        self.divergent_fields(original, current)
            .map(|(field, _, new_value)| (field.clone(), new_value.clone()))
            .collect()
    }

    /// 任意のシリアライズ可能な型同士を比較する
    ///
    /// JSON オブジェクトにならない値は空のレコードとして扱う。
    pub fn track_changes_of<T: Serialize>(
        &self,
        original: &T,
        current: &T,
    ) -> Result<ChangeSet> {
        let original = to_record(original)?;
        let current = to_record(current)?;
        Ok(self.track_changes(&original, &current))
    }

    pub fn generate_patch_of<T: Serialize>(
        &self,
        original: &T,
        current: &T,
    ) -> Result<Patch> {
        let original = to_record(original)?;
        let current = to_record(current)?;
        Ok(self.generate_patch(&original, &current))
    }

    fn divergent_fields<'a>(
        &'a self,
        original: &'a Record,
        current: &'a Record,
    ) -> impl Iterator<Item = (&'a String, &'a Value, &'a Value)> + 'a {
        current
            .iter()
            .filter(move |(field, _)| !self.is_excluded(field))
            .filter_map(move |(field, new_value)| {
                let old_value = original.get(field).unwrap_or(&NULL_VALUE);
                values_differ(old_value, new_value).then_some((field, old_value, new_value))
            })
    }
}

fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Record::new()),
    }
}

/// パッチを元レコードにフィールド単位で上書きする
pub fn apply_patch(original: &Record, patch: &Patch) -> Record {
    let mut merged = original.clone();
    for (field, value) in patch {
        merged.insert(field.clone(), value.clone());
    }
    merged
}

/// 2つの値が異なるかどうか
pub fn values_differ(old_value: &Value, new_value: &Value) -> bool {
    if old_value == new_value {
        return false;
    }

    match (old_value, new_value) {
        (Value::Null, Value::Null) => false,
        (Value::Null, _) | (_, Value::Null) => true,
        (Value::String(a), Value::String(b)) => match (parse_date(a), parse_date(b)) {
            (Some(a), Some(b)) => a.timestamp_millis() != b.timestamp_millis(),
            _ => a != b,
        },
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return true;
            }
            !a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(_), Value::Object(_)) => !deep_equal(old_value, new_value),
        (Value::Number(a), Value::Number(b)) => !numbers_equal(a, b),
        _ => true,
    }
}

/// キーの挿入順に依存しない構造比較
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| deep_equal(l, r)))
        }
        _ => false,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// RFC 3339 形式の文字列を日時として解釈する
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}

/// 表示用の値分類。null は既定の `String` に入る
pub fn classify_value(value: &Value) -> ChangeType {
    match value {
        Value::Null => ChangeType::String,
        Value::String(s) if parse_date(s).is_some() => ChangeType::Date,
        Value::String(_) => ChangeType::String,
        Value::Number(_) => ChangeType::Number,
        Value::Bool(_) => ChangeType::Boolean,
        Value::Array(_) => ChangeType::Array,
        Value::Object(_) => ChangeType::Object,
    }
}

/// `camelCase` のフィールド名を `Camel Case` 形式の表示名に変換
pub fn format_field_label(field: &str) -> String {
    let mut spaced = String::with_capacity(field.len() + 4);
    for ch in field.chars() {
        if ch.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(ch);
    }

    let trimmed = spaced.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 差分表示用に値を文字列化する
pub fn format_value(value: &Value, change_type: ChangeType) -> String {
    match value {
        Value::Null => return EMPTY_PLACEHOLDER.to_string(),
        Value::String(s) if s.is_empty() => return EMPTY_PLACEHOLDER.to_string(),
        _ => {}
    }

    match (change_type, value) {
        (ChangeType::Date, Value::String(raw)) => match parse_date(raw) {
            Some(date) => date.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
            None => coerce_to_string(value),
        },
        (ChangeType::Boolean, Value::Bool(flag)) => {
            if *flag {
                "Yes".to_string()
            } else {
                "No".to_string()
            }
        }
        (ChangeType::Array, Value::Array(items)) => items
            .iter()
            .map(coerce_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        (ChangeType::Object, Value::Object(_)) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| coerce_to_string(value))
        }
        _ => coerce_to_string(value),
    }
}

fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(coerce_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// 変更をカテゴリごとに振り分ける
///
/// フィールドは最初に一致したカテゴリに入り、どれにも属さなければ `Other` に入る。
/// 結果はカテゴリの指定順で、最後に `Other` が続く。空のカテゴリは含めない。
pub fn categorize_changes(
    changes: &[FieldChange],
    categories: &IndexMap<String, Vec<String>>,
) -> IndexMap<String, Vec<FieldChange>> {
    let mut grouped: IndexMap<String, Vec<FieldChange>> = categories
        .keys()
        .map(|name| (name.clone(), Vec::new()))
        .collect();
    grouped.entry(OTHER_CATEGORY.to_string()).or_default();

    for change in changes {
        let category = categories
            .iter()
            .find(|(_, fields)| fields.iter().any(|f| f == &change.field))
            .map(|(name, _)| name.as_str())
            .unwrap_or(OTHER_CATEGORY);
        if let Some(bucket) = grouped.get_mut(category) {
            bucket.push(change.clone());
        }
    }

    grouped.retain(|_, bucket| !bucket.is_empty());
    grouped
}
