use crate::application::ports::{
    DraftStorage, ListenerId, StorageEvent, StorageEventSource, StorageListener,
};
use crate::domain::entities::{Draft, DraftMetadata, DraftUpdate};
use crate::domain::value_objects::{DraftKey, EntityId, EntityType, TabId};
use crate::shared::config::DraftConfig;
use crate::shared::error::{DraftError, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// 編集途中のレコードを永続化媒体に保存するドラフトストア
///
/// ドラフトの状態はメモリに保持せず、媒体に対する薄いファサードとして振る舞う。
/// 保存・削除は同じコンテキストの購読者へ即座に通知され、
/// イベントソースを渡した場合は他のコンテキストでの変更も同じストリームに流れる。
pub struct DraftStore {
    storage: Arc<dyn DraftStorage>,
    event_source: Option<(Arc<dyn StorageEventSource>, ListenerId)>,
    updates: broadcast::Sender<DraftUpdate>,
    tab_id: TabId,
    config: DraftConfig,
}

impl DraftStore {
    pub fn new(storage: Arc<dyn DraftStorage>, config: DraftConfig) -> Result<Self> {
        config.validate().map_err(DraftError::Configuration)?;
        let (updates, _) = broadcast::channel(config.channel_capacity);
        let tab_id = TabId::generate();
        debug!(tab_id = %tab_id, "draft store created");

        Ok(Self {
            storage,
            event_source: None,
            updates,
            tab_id,
            config,
        })
    }

    /// 他のコンテキストからの変更通知を購読するストアを作成
    pub fn with_event_source(
        storage: Arc<dyn DraftStorage>,
        event_source: Arc<dyn StorageEventSource>,
        config: DraftConfig,
    ) -> Result<Self> {
        let mut store = Self::new(storage, config)?;

        let sender = store.updates.clone();
        let listener: StorageListener =
            Arc::new(move |event: &StorageEvent| relay_storage_event(&sender, event));
        let listener_id = event_source.subscribe(listener);
        store.event_source = Some((event_source, listener_id));

        Ok(store)
    }

    pub fn tab_id(&self) -> &TabId {
        &self.tab_id
    }

    pub fn config(&self) -> &DraftConfig {
        &self.config
    }

    /// ドラフトを保存する
    ///
    /// 失敗しても呼び出し元にエラーは返さない。容量超過の場合は古いドラフトを
    /// 削除するが、今回の書き込みは再試行しない。保存できたかを確認したい場合は
    /// `has_draft` か `try_save_draft` を使うこと。
    pub fn save_draft<T: Serialize>(
        &self,
        entity_type: &EntityType,
        entity_id: &EntityId,
        data: &T,
    ) {
        if let Err(e) = self.try_save_draft(entity_type, entity_id, data) {
            error!(
                entity_type = %entity_type,
                entity_id = %entity_id,
                "Failed to save draft: {e}"
            );
        }
    }

    /// `save_draft` と同じだが、書き込みの失敗をエラーとして返す
    pub fn try_save_draft<T: Serialize>(
        &self,
        entity_type: &EntityType,
        entity_id: &EntityId,
        data: &T,
    ) -> Result<Draft> {
        let key = DraftKey::new(entity_type, entity_id);
        let draft = Draft {
            data: serde_json::to_value(data)?,
            metadata: DraftMetadata {
                entity_id: entity_id.to_string(),
                entity_type: entity_type.to_string(),
                tab_id: self.tab_id.to_string(),
                saved_at: Utc::now(),
                version: self.config.schema_version,
            },
        };
        let raw = draft.to_json_string()?;

        if let Err(e) = self.storage.set_item(key.as_str(), &raw) {
            if e.is_quota_exceeded() {
                warn!(key = %key, "Draft storage quota exceeded, evicting old drafts");
                let removed = self.evict_oldest();
                info!(key = %key, removed, "Evicted old drafts after quota failure");
            }
            return Err(e.into());
        }

        debug!(key = %key, "Draft saved");
        let _ = self
            .updates
            .send(DraftUpdate::saved(key.as_str(), draft.clone()));
        Ok(draft)
    }

    /// ドラフトを読み込む
    ///
    /// スキーマバージョンが異なるもの、または解析できないものは削除して `None` を返す。
    pub fn load_draft(&self, entity_type: &EntityType, entity_id: &EntityId) -> Option<Draft> {
        let key = DraftKey::new(entity_type, entity_id);
        let raw = match self.storage.get_item(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, "Failed to read draft: {e}");
                return None;
            }
        };

        match Draft::from_json_str(&raw) {
            Ok(draft) if draft.is_version(self.config.schema_version) => Some(draft),
            Ok(draft) => {
                info!(
                    key = %key,
                    stored = draft.metadata.version,
                    expected = self.config.schema_version,
                    "Discarding draft with stale schema version"
                );
                self.discard(&key);
                None
            }
            Err(e) => {
                warn!(key = %key, "Discarding corrupt draft: {e}");
                self.discard(&key);
                None
            }
        }
    }

    /// ドラフトを削除し、削除通知を流す（存在しなくてもよい）
    pub fn clear_draft(&self, entity_type: &EntityType, entity_id: &EntityId) {
        let key = DraftKey::new(entity_type, entity_id);
        match self.storage.remove_item(key.as_str()) {
            Ok(()) => {
                debug!(key = %key, "Draft cleared");
                let _ = self.updates.send(DraftUpdate::cleared(key.as_str()));
            }
            Err(e) => error!(key = %key, "Failed to clear draft: {e}"),
        }
    }

    pub fn has_draft(&self, entity_type: &EntityType, entity_id: &EntityId) -> bool {
        let key = DraftKey::new(entity_type, entity_id);
        self.storage.contains_key(key.as_str()).unwrap_or_else(|e| {
            warn!(key = %key, "Failed to check draft presence: {e}");
            false
        })
    }

    /// 指定したエンティティ種別のドラフトをすべて取得
    ///
    /// 解析できないエントリは読み飛ばすだけで削除しない（`load_draft` とは異なる）。
    pub fn get_all_drafts(&self, entity_type: &EntityType) -> Vec<Draft> {
        let prefix = DraftKey::prefix_for(entity_type);
        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to enumerate drafts: {e}");
                return Vec::new();
            }
        };

        keys.into_iter()
            .filter(|key| key.starts_with(&prefix))
            .filter_map(|key| {
                let raw = self.storage.get_item(&key).ok().flatten()?;
                match Draft::from_json_str(&raw) {
                    Ok(draft) => Some(draft),
                    Err(e) => {
                        debug!(key = %key, "Skipping unreadable draft: {e}");
                        None
                    }
                }
            })
            .filter(|draft| draft.metadata.entity_type == entity_type.as_str())
            .collect()
    }

    /// 保存・削除の通知ストリームを購読
    ///
    /// 購読開始以降の更新のみが届く。
    pub fn on_draft_updated(&self) -> broadcast::Receiver<DraftUpdate> {
        self.updates.subscribe()
    }

    /// 保存日時が古い順にドラフトを削除し、削除件数を返す
    ///
    /// 解析できないエントリは候補から外し、そのまま残す。
    /// 削除したキーごとに `draft: None` の更新を流すため、このタブの購読者にも
    /// 他のタブが受け取る削除イベントと同じ変化が届く。
    pub fn evict_oldest(&self) -> usize {
        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to enumerate drafts for eviction: {e}");
                return 0;
            }
        };

        let mut candidates: Vec<(String, chrono::DateTime<Utc>)> = keys
            .into_iter()
            .filter(|key| DraftKey::is_draft_key(key))
            .filter_map(|key| {
                let raw = self.storage.get_item(&key).ok().flatten()?;
                let draft = Draft::from_json_str(&raw).ok()?;
                Some((key, draft.metadata.saved_at))
            })
            .collect();

        candidates.sort_by(|a, b| a.1.cmp(&b.1));
        let evict_count = eviction_count(candidates.len(), self.config.eviction_fraction);

        let mut removed = 0;
        for (key, _) in candidates.into_iter().take(evict_count) {
            match self.storage.remove_item(&key) {
                Ok(()) => {
                    debug!(key = %key, "Evicted draft");
                    let _ = self.updates.send(DraftUpdate::cleared(key.as_str()));
                    removed += 1;
                }
                Err(e) => warn!(key = %key, "Failed to evict draft: {e}"),
            }
        }
        removed
    }

    fn discard(&self, key: &DraftKey) {
        if let Err(e) = self.storage.remove_item(key.as_str()) {
            warn!(key = %key, "Failed to discard draft: {e}");
        }
    }
}

impl Drop for DraftStore {
    fn drop(&mut self) {
        if let Some((source, listener_id)) = self.event_source.take() {
            source.unsubscribe(listener_id);
        }
    }
}

/// 浮動小数の誤差で `30 * 0.1` が 3 を僅かに超えても 4 にならないようにする
const EVICTION_EPSILON: f64 = 1e-9;

fn eviction_count(candidates: usize, fraction: f64) -> usize {
    let product = candidates as f64 * fraction;
    let count = (product - EVICTION_EPSILON).ceil().max(0.0) as usize;
    count.min(candidates)
}

/// 他のコンテキストで発生した変更をドラフト更新通知に変換する
fn relay_storage_event(updates: &broadcast::Sender<DraftUpdate>, event: &StorageEvent) {
    if !DraftKey::is_draft_key(&event.key) {
        return;
    }

    let update = match &event.new_value {
        Some(raw) => match Draft::from_json_str(raw) {
            Ok(draft) => DraftUpdate::saved(event.key.as_str(), draft),
            Err(e) => {
                warn!(key = %event.key, "Ignoring unreadable draft from another context: {e}");
                return;
            }
        },
        None => DraftUpdate::cleared(event.key.as_str()),
    };

    debug!(key = %event.key, cleared = update.is_clear(), "Relaying draft change from another context");
    let _ = updates.send(update);
}
