mod common;

use std::sync::Arc;

use common::draft_support::{employee, entity_id, open_two_tabs, ManualEventSource};
use common::fixtures::create_test_absence;
use draftline_lib::application::ports::StorageEvent;
use draftline_lib::shared::logging::init_test_tracing;
use draftline_lib::{
    DraftConfig, DraftStorage, DraftStore, EntityType, MemoryStorage, DRAFT_SCHEMA_VERSION,
};
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::{timeout, Duration};

fn single_store() -> (MemoryStorage, DraftStore) {
    init_test_tracing();
    let storage = MemoryStorage::new();
    let store = DraftStore::new(Arc::new(storage.clone()), DraftConfig::default()).expect("store");
    (storage, store)
}

#[test]
fn saved_draft_is_read_back_immediately() {
    let (_, store) = single_store();
    let payload = json!({"firstName": "Aiko", "overtime": [{"date": "2024-02-01", "hours": 2}]});

    store.save_draft(&employee(), &entity_id("42"), &payload);
    let draft = store
        .load_draft(&employee(), &entity_id("42"))
        .expect("draft should be present");

    assert_eq!(draft.data, payload);
    assert_eq!(draft.metadata.entity_id, "42");
    assert_eq!(draft.metadata.entity_type, "employee");
    assert_eq!(draft.metadata.version, DRAFT_SCHEMA_VERSION);
}

#[test]
fn subsequent_saves_overwrite_the_same_key() {
    let (storage, store) = single_store();

    store.save_draft(&employee(), &entity_id("42"), &json!({"step": 1}));
    store.save_draft(&employee(), &entity_id("42"), &json!({"step": 2}));

    assert_eq!(storage.len().unwrap(), 1);
    let draft = store.load_draft(&employee(), &entity_id("42")).unwrap();
    assert_eq!(draft.data, json!({"step": 2}));
}

#[test]
fn stale_schema_version_is_rejected_and_removed() {
    let (storage, store) = single_store();
    let stale = json!({
        "data": {"firstName": "Old"},
        "metadata": {
            "entityId": "42",
            "entityType": "employee",
            "tabId": "tab_1_old",
            "savedAt": "2023-12-31T23:59:59Z",
            "version": DRAFT_SCHEMA_VERSION + 1
        }
    });
    storage
        .set_item("draft_employee_42", &stale.to_string())
        .unwrap();

    assert!(store.has_draft(&employee(), &entity_id("42")));
    assert!(store.load_draft(&employee(), &entity_id("42")).is_none());
    assert!(!store.has_draft(&employee(), &entity_id("42")));
}

#[test]
fn clearing_twice_is_harmless() {
    let (_, store) = single_store();
    store.save_draft(&employee(), &entity_id("42"), &json!({}));

    store.clear_draft(&employee(), &entity_id("42"));
    assert!(!store.has_draft(&employee(), &entity_id("42")));
    store.clear_draft(&employee(), &entity_id("42"));
    assert!(!store.has_draft(&employee(), &entity_id("42")));
}

#[test]
fn quota_failure_evicts_the_two_oldest_of_five() {
    init_test_tracing();
    let storage = MemoryStorage::new();
    for (i, saved_at) in [
        "2024-01-01T00:00:00Z",
        "2024-01-02T00:00:00Z",
        "2024-01-03T00:00:00Z",
        "2024-01-04T00:00:00Z",
        "2024-01-05T00:00:00Z",
    ]
    .iter()
    .enumerate()
    {
        let envelope = json!({
            "data": {},
            "metadata": {
                "entityId": i.to_string(),
                "entityType": "employee",
                "tabId": "tab_seed",
                "savedAt": saved_at,
                "version": DRAFT_SCHEMA_VERSION
            }
        });
        storage
            .set_item(&format!("draft_employee_{i}"), &envelope.to_string())
            .unwrap();
    }

    // 現在の使用量ちょうどを上限にして、次の書き込みを必ず失敗させる
    let used = storage.used_bytes().unwrap();
    let limited = MemoryStorage::with_quota(used);
    for key in storage.keys().unwrap() {
        let value = storage.get_item(&key).unwrap().unwrap();
        limited.set_item(&key, &value).unwrap();
    }

    let store = DraftStore::new(Arc::new(limited.clone()), DraftConfig::default()).unwrap();
    store.save_draft(&employee(), &entity_id("new"), &json!({"firstName": "Ren"}));

    assert!(!store.has_draft(&employee(), &entity_id("new")));
    let remaining = limited.keys().unwrap();
    assert_eq!(
        remaining,
        vec![
            "draft_employee_2".to_string(),
            "draft_employee_3".to_string(),
            "draft_employee_4".to_string(),
        ]
    );
}

#[test]
fn bulk_scan_lists_drafts_of_one_type_and_skips_corrupt_entries() {
    let (storage, store) = single_store();
    let absence = EntityType::new("absence").unwrap();

    store.save_draft(&absence, &entity_id("a1"), &create_test_absence("a1", "emp-1"));
    store.save_draft(&absence, &entity_id("a2"), &create_test_absence("a2", "emp-2"));
    store.save_draft(&employee(), &entity_id("emp-1"), &json!({}));
    storage.set_item("draft_absence_broken", "{").unwrap();

    let drafts = store.get_all_drafts(&absence);
    let ids: Vec<&str> = drafts
        .iter()
        .map(|d| d.metadata.entity_id.as_str())
        .collect();
    assert_eq!(ids, vec!["a1", "a2"]);
    assert!(storage.contains_key("draft_absence_broken").unwrap());
}

#[tokio::test]
async fn local_saves_and_clears_are_published() {
    let (_, store) = single_store();
    let mut updates = store.on_draft_updated();

    store.save_draft(&employee(), &entity_id("7"), &json!({"firstName": "Mio"}));
    store.clear_draft(&employee(), &entity_id("7"));

    let saved = updates.recv().await.unwrap();
    assert_eq!(saved.key, "draft_employee_7");
    assert_eq!(saved.draft.unwrap().data, json!({"firstName": "Mio"}));

    let cleared = updates.recv().await.unwrap();
    assert_eq!(cleared.key, "draft_employee_7");
    assert!(cleared.draft.is_none());
}

#[tokio::test]
async fn writes_in_one_tab_reach_the_other_tab() {
    let tabs = open_two_tabs();
    let mut updates_a = tabs.tab_a.on_draft_updated();
    let mut updates_b = tabs.tab_b.on_draft_updated();

    tabs.tab_a
        .save_draft(&employee(), &entity_id("42"), &json!({"lastName": "Sato"}));

    let remote = timeout(Duration::from_secs(1), updates_b.recv())
        .await
        .expect("tab b should be notified")
        .unwrap();
    let draft = remote.draft.expect("remote write carries the draft");
    assert_eq!(draft.metadata.tab_id, tabs.tab_a.tab_id().as_str());
    assert_eq!(draft.data, json!({"lastName": "Sato"}));

    // 自タブの書き込みはローカル通知の1件だけ
    let local = updates_a.recv().await.unwrap();
    assert_eq!(local.key, "draft_employee_42");
    assert!(matches!(updates_a.try_recv(), Err(TryRecvError::Empty)));

    tabs.tab_b.clear_draft(&employee(), &entity_id("42"));
    let removal = updates_a.recv().await.unwrap();
    assert!(removal.draft.is_none());
    assert!(!tabs.tab_a.has_draft(&employee(), &entity_id("42")));
    assert_eq!(tabs.storage.len().unwrap(), 0);
}

#[tokio::test]
async fn external_events_are_filtered_to_the_draft_namespace() {
    init_test_tracing();
    let source = Arc::new(ManualEventSource::default());
    let store = DraftStore::with_event_source(
        Arc::new(MemoryStorage::new()),
        source.clone(),
        DraftConfig::default(),
    )
    .unwrap();
    let mut updates = store.on_draft_updated();

    let envelope = json!({
        "data": {"hours": 3},
        "metadata": {
            "entityId": "ot-5",
            "entityType": "overtime",
            "tabId": "tab_other",
            "savedAt": "2024-04-01T10:00:00Z",
            "version": DRAFT_SCHEMA_VERSION
        }
    });

    source.emit(StorageEvent::written("theme", "dark"));
    source.emit(StorageEvent::written("draft_overtime_ot-5", envelope.to_string()));
    source.emit(StorageEvent::removed("sidebar_state"));
    source.emit(StorageEvent::removed("draft_overtime_ot-5"));

    let written = updates.recv().await.unwrap();
    assert_eq!(written.key, "draft_overtime_ot-5");
    assert_eq!(written.draft.unwrap().data, json!({"hours": 3}));

    let removed = updates.recv().await.unwrap();
    assert_eq!(removed.key, "draft_overtime_ot-5");
    assert!(removed.draft.is_none());

    assert!(matches!(updates.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn dropping_the_store_unsubscribes_from_external_events() {
    let source = Arc::new(ManualEventSource::default());
    let store = DraftStore::with_event_source(
        Arc::new(MemoryStorage::new()),
        source.clone(),
        DraftConfig::default(),
    )
    .unwrap();
    assert_eq!(source.listener_count(), 1);

    drop(store);
    assert_eq!(source.listener_count(), 0);
}

#[test]
fn each_store_gets_its_own_tab_id() {
    let tabs = open_two_tabs();
    assert_ne!(tabs.tab_a.tab_id(), tabs.tab_b.tab_id());
    assert!(tabs.tab_a.tab_id().as_str().starts_with("tab_"));
}
