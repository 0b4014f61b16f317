//! API レスポンスのキーを camelCase に正規化する
//!
//! バックエンドが snake_case や PascalCase で返すフィールドを、
//! 差分検出やドラフト保存で扱う camelCase のレコード形式にそろえる。

use serde_json::{Map, Value};

/// オブジェクトのキーを再帰的に camelCase に変換する
///
/// 配列の要素も再帰的に処理する。スカラー値はそのまま返す。
/// 変換後のキーが衝突した場合は後に現れた値が残る。
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let normalized: Map<String, Value> = map
                .into_iter()
                .map(|(key, inner)| (to_camel_case(&key), normalize_keys(inner)))
                .collect();
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// `snake_case` / `kebab-case` / `PascalCase` を `camelCase` に変換する
pub fn to_camel_case(key: &str) -> String {
    let mut result = String::with_capacity(key.len());
    let mut capitalize_next = false;

    for ch in key.chars() {
        if ch == '_' || ch == '-' {
            capitalize_next = !result.is_empty();
            continue;
        }

        if result.is_empty() {
            result.extend(ch.to_lowercase());
        } else if capitalize_next {
            result.extend(ch.to_uppercase());
        } else {
            result.push(ch);
        }
        capitalize_next = false;
    }

    result
}
