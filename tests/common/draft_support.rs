use std::sync::{Arc, Mutex};

use draftline_lib::application::ports::{
    ListenerId, StorageEvent, StorageEventSource, StorageListener,
};
use draftline_lib::shared::logging::init_test_tracing;
use draftline_lib::{DraftConfig, DraftStore, EntityId, EntityType, MemoryStorage};

pub fn employee() -> EntityType {
    EntityType::new("employee").expect("entity type")
}

pub fn entity_id(value: &str) -> EntityId {
    EntityId::new(value).expect("entity id")
}

/// 同じ媒体を共有する2つのタブ
pub struct TwoTabs {
    pub storage: MemoryStorage,
    pub tab_a: DraftStore,
    pub tab_b: DraftStore,
}

pub fn open_two_tabs() -> TwoTabs {
    init_test_tracing();
    let storage = MemoryStorage::new();

    let context_a = storage.context();
    let context_b = storage.context();
    let tab_a = DraftStore::with_event_source(
        Arc::new(context_a.clone()),
        Arc::new(context_a),
        DraftConfig::default(),
    )
    .expect("tab a");
    let tab_b = DraftStore::with_event_source(
        Arc::new(context_b.clone()),
        Arc::new(context_b),
        DraftConfig::default(),
    )
    .expect("tab b");

    TwoTabs {
        storage,
        tab_a,
        tab_b,
    }
}

/// 外部のストレージ変更イベントを手動で発火できるテスト用イベントソース
#[derive(Default)]
pub struct ManualEventSource {
    listeners: Mutex<Vec<(ListenerId, StorageListener)>>,
    next_id: Mutex<u64>,
}

impl ManualEventSource {
    pub fn emit(&self, event: StorageEvent) {
        let listeners: Vec<StorageListener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

impl StorageEventSource for ManualEventSource {
    fn subscribe(&self, listener: StorageListener) -> ListenerId {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let id = ListenerId(*next_id);
        self.listeners.lock().unwrap().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|(listener_id, _)| *listener_id != id);
    }
}
