use crate::application::ports::{
    DraftStorage, ListenerId, StorageEvent, StorageEventSource, StorageListener,
};
use crate::shared::error::StorageError;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::trace;

struct RegisteredListener {
    id: ListenerId,
    context: u64,
    listener: StorageListener,
}

struct SharedState {
    entries: RwLock<IndexMap<String, String>>,
    quota_bytes: Option<usize>,
    listeners: Mutex<Vec<RegisteredListener>>,
    next_listener: AtomicU64,
    next_context: AtomicU64,
}

/// メモリ上の共有キーバリュー媒体
///
/// 同じオリジンの複数タブが共有するストレージを模したもの。
/// `context()` で実行コンテキストごとのハンドルを作り、あるハンドル経由の書き込みは
/// 他のハンドルで登録されたリスナーにだけ通知される。
/// `clone()` したハンドルは同じコンテキストを共有する。
#[derive(Clone)]
pub struct MemoryStorage {
    shared: Arc<SharedState>,
    context: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// キーと値のバイト数の合計に上限を設ける
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self::build(Some(quota_bytes))
    }

    fn build(quota_bytes: Option<usize>) -> Self {
        Self {
            shared: Arc::new(SharedState {
                entries: RwLock::new(IndexMap::new()),
                quota_bytes,
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                next_context: AtomicU64::new(1),
            }),
            context: 0,
        }
    }

    /// 同じ媒体を共有する別の実行コンテキスト用ハンドルを作成
    pub fn context(&self) -> Self {
        let context = self.shared.next_context.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
            context,
        }
    }

    pub fn context_id(&self) -> u64 {
        self.context
    }

    pub fn quota_bytes(&self) -> Option<usize> {
        self.shared.quota_bytes
    }

    /// 現在使用中のバイト数
    pub fn used_bytes(&self) -> Result<usize, StorageError> {
        let entries = self.read_entries()?;
        Ok(entries.iter().map(|(k, v)| entry_size(k, v)).sum())
    }

    fn read_entries(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, IndexMap<String, String>>, StorageError> {
        self.shared
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))
    }

    fn write_entries(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, IndexMap<String, String>>, StorageError> {
        self.shared
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))
    }

    fn notify_other_contexts(&self, event: StorageEvent) {
        let targets: Vec<StorageListener> = {
            let listeners = self
                .shared
                .listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            listeners
                .iter()
                .filter(|registered| registered.context != self.context)
                .map(|registered| Arc::clone(&registered.listener))
                .collect()
        };

        trace!(key = %event.key, listeners = targets.len(), "dispatching storage event");
        for listener in targets {
            listener(&event);
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

impl DraftStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        {
            let mut entries = self.write_entries()?;
            if entries.get(key).map(String::as_str) == Some(value) {
                return Ok(());
            }

            if let Some(quota) = self.shared.quota_bytes {
                let used: usize = entries
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| entry_size(k, v))
                    .sum();
                let required = entry_size(key, value);
                let available = quota.saturating_sub(used);
                if required > available {
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        required,
                        available,
                    });
                }
            }

            entries.insert(key.to_string(), value.to_string());
        }

        self.notify_other_contexts(StorageEvent::written(key, value));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.write_entries()?.shift_remove(key);
        if removed.is_some() {
            self.notify_other_contexts(StorageEvent::removed(key));
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.read_entries()?.keys().cloned().collect())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.read_entries()?.len())
    }
}

impl StorageEventSource for MemoryStorage {
    fn subscribe(&self, listener: StorageListener) -> ListenerId {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RegisteredListener {
                id,
                context: self.context,
                listener,
            });
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|registered| registered.id != id);
    }
}
