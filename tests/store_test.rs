mod common;

use common::create_test_dir;
use migrate_runner::{ExecutionStore, JsonFileStore, StoreError};

#[tokio::test]
async fn test_records_survive_a_new_store_instance() {
    let temp_dir = create_test_dir();
    let path = temp_dir.path().join(".migrate/state.json");

    let store = JsonFileStore::new(&path);
    store
        .log_migration("20230101000000-a", Some("sum-a"))
        .await
        .expect("Should log");
    store
        .log_migration("20230102000000-b", None)
        .await
        .expect("Should log");
    drop(store);

    let reopened = JsonFileStore::new(&path);
    let records = reopened.executed().await.expect("Should read");
    let ids: Vec<&str> = records.iter().map(|r| r.migration_id.as_str()).collect();
    assert_eq!(ids, vec!["20230101000000-a", "20230102000000-b"]);
    assert_eq!(records[0].checksum.as_deref(), Some("sum-a"));
    assert!(
        chrono::DateTime::parse_from_rfc3339(&records[0].executed_at).is_ok(),
        "executed_at should be valid RFC3339"
    );
}

#[tokio::test]
async fn test_executed_is_ordered_by_id_not_insertion() {
    let temp_dir = create_test_dir();
    let store = JsonFileStore::new(temp_dir.path().join("state.json"));

    store.log_migration("20230103000000-c", None).await.unwrap();
    store.log_migration("20230101000000-a", None).await.unwrap();
    store.log_migration("20230102000000-b", None).await.unwrap();

    let ids: Vec<String> = store
        .executed()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.migration_id)
        .collect();
    assert_eq!(
        ids,
        vec!["20230101000000-a", "20230102000000-b", "20230103000000-c"]
    );
}

#[tokio::test]
async fn test_double_log_is_rejected() {
    let temp_dir = create_test_dir();
    let store = JsonFileStore::new(temp_dir.path().join("state.json"));

    store.log_migration("20230101000000-a", None).await.unwrap();
    let result = store.log_migration("20230101000000-a", None).await;
    assert!(matches!(result, Err(StoreError::AlreadyLogged(_))));
    assert_eq!(store.executed().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unlog_removes_record() {
    let temp_dir = create_test_dir();
    let store = JsonFileStore::new(temp_dir.path().join("state.json"));

    store.log_migration("20230101000000-a", None).await.unwrap();
    store.unlog_migration("20230101000000-a").await.unwrap();
    assert!(store.executed().await.unwrap().is_empty());

    let again = store.unlog_migration("20230101000000-a").await;
    assert!(matches!(again, Err(StoreError::NotLogged(_))));
}

#[tokio::test]
async fn test_state_file_uses_camel_case_keys() {
    let temp_dir = create_test_dir();
    let path = temp_dir.path().join("state.json");
    let store = JsonFileStore::new(&path);
    store.log_migration("20230101000000-a", None).await.unwrap();

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["schemaVersion"], 1);
    assert!(json["updatedAt"].is_string());
    assert_eq!(json["migrations"][0]["migrationId"], "20230101000000-a");
}
