use std::sync::Arc;

/// 他の実行コンテキストで共有媒体が変更されたことを表すイベント
///
/// `new_value` が `None` の場合はエントリの削除。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

impl StorageEvent {
    pub fn written(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: Some(value.into()),
        }
    }

    pub fn removed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type StorageListener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// コンテキスト間の変更通知チャネルのポート
///
/// 購読者は自分のコンテキストで行った変更を受け取らない。
pub trait StorageEventSource: Send + Sync {
    fn subscribe(&self, listener: StorageListener) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId);
}
