//! Store integration tests: sharding, record layout, set/get/del.
//!
//! Run with: `cargo test`

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use shardkv::config::Config;
use shardkv::storage::fs::{FileSystem, LocalFs};
use shardkv::storage::{path_for, Json, Value};
use shardkv::{create, is_valid_key, Store, StoreError};

fn tmp_dir() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

async fn open(dir: &TempDir) -> Store {
    create(dir.path()).await.expect("open store")
}

#[tokio::test]
async fn test_binary_record_layout_on_disk() {
    let dir = tmp_dir();
    let store = open(&dir).await;

    store
        .set("bin1", &Value::from(vec![0xDE, 0xAD, 0xBE, 0xEF]))
        .await
        .expect("set");

    let sp = path_for("bin1");
    let file = dir.path().join(&sp.shard).join(&sp.file);
    assert_eq!(store.path_of("bin1"), file);
    assert_eq!(sp.shard.len(), 2);
    assert_eq!(sp.file.len(), 38);

    let raw = std::fs::read(&file).expect("record file exists");
    let mut expected = b"{\"type\":\"binary\",\"key\":\"bin1\"}\n".to_vec();
    expected.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(raw, expected);

    let got = store.get("bin1").await.expect("get");
    assert_eq!(got, Some(Value::Binary(Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF]))));
}

#[tokio::test]
async fn test_json_dates_revived_on_read() {
    let dir = tmp_dir();
    let store = open(&dir).await;

    store
        .set("j1", &Value::from(json!({"when": "2024-01-01T00:00:00.000Z"})))
        .await
        .expect("set");

    let got = store.get("j1").await.expect("get").expect("present");
    let when = got.as_json().and_then(|j| j.get("when")).expect("when field");
    assert_eq!(when.as_date(), Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    assert_eq!(when.as_str(), None, "ISO string must not survive as text");
}

#[tokio::test]
async fn test_json_round_trip_with_lossy_dates() {
    let dir = tmp_dir();
    let store = open(&dir).await;
    let date = Utc.with_ymd_and_hms(2021, 6, 15, 12, 30, 0).unwrap();

    let mut doc = match Json::from(json!({
        "name": "ada",
        "age": 36,
        "ratio": 0.5,
        "tags": ["x", "1999-12-31T23:59:59Z", null, true],
        "nested": {"note": "2000-01-01T00:00:00+01:00", "plain": "2000-01-01"},
    })) {
        Json::Object(map) => map,
        other => panic!("expected object, got {other:?}"),
    };
    doc.insert("created".into(), Json::Date(date));
    store.set("doc", &Value::Json(Json::Object(doc))).await.expect("set");

    let got = store.get("doc").await.expect("get").expect("present");
    let got = got.as_json().expect("json value");

    assert_eq!(got.get("name"), Some(&Json::String("ada".into())));
    assert_eq!(got.get("age"), Some(&Json::from(json!(36))));
    assert_eq!(got.get("ratio"), Some(&Json::from(json!(0.5))));
    assert_eq!(got.get("created").and_then(Json::as_date), Some(date));

    // Text that happens to look like a timestamp comes back as a date.
    let tags = got.get("tags").and_then(Json::as_array).expect("tags");
    assert_eq!(tags[0], Json::String("x".into()));
    assert_eq!(tags[1].as_date(), Some(Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap()));
    assert_eq!(tags[2], Json::Null);
    assert_eq!(tags[3], Json::Bool(true));

    let nested = got.get("nested").expect("nested");
    assert_eq!(
        nested.get("note").and_then(Json::as_date),
        Some(Utc.with_ymd_and_hms(1999, 12, 31, 23, 0, 0).unwrap())
    );
    assert_eq!(nested.get("plain"), Some(&Json::String("2000-01-01".into())));
}

#[tokio::test]
async fn test_absent_and_deleted_keys() {
    let dir = tmp_dir();
    let store = open(&dir).await;

    assert_eq!(store.get("never").await.expect("get"), None);

    // Deleting something that was never written is fine.
    store.del("never").await.expect("del absent");
    assert_eq!(store.get("never").await.expect("get"), None);

    store.set("k", &Value::from(json!(1))).await.expect("set");
    assert!(store.get("k").await.expect("get").is_some());
    store.del("k").await.expect("del");
    assert_eq!(store.get("k").await.expect("get"), None);
    assert!(!store.path_of("k").exists());
}

#[tokio::test]
async fn test_last_write_wins() {
    let dir = tmp_dir();
    let store = open(&dir).await;

    store.set("k", &Value::from(json!({"v": 1}))).await.expect("set v1");
    store.set("k", &Value::from(vec![1u8, 2, 3])).await.expect("set v2");
    assert_eq!(store.get("k").await.expect("get"), Some(Value::from(vec![1u8, 2, 3])));

    store.set("k", &Value::from(json!({"v": 3}))).await.expect("set v3");
    assert_eq!(store.get("k").await.expect("get"), Some(Value::from(json!({"v": 3}))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sets_leave_one_complete_record() {
    let dir = tmp_dir();
    let store = open(&dir).await;

    let mut handles = Vec::new();
    for i in 0..32u8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let payload = vec![i; 4096];
            store.set("contended", &Value::from(payload)).await
        }));
    }
    for h in handles {
        h.await.expect("join").expect("set");
    }

    let got = store.get("contended").await.expect("get").expect("present");
    let bytes = got.as_binary().expect("binary");
    assert_eq!(bytes.len(), 4096);
    assert!(bytes.iter().all(|b| *b == bytes[0]), "record mixes two writers");

    // No temp files left behind in the shard directory.
    let shard_dir = store.path_of("contended").parent().unwrap().to_path_buf();
    let names: Vec<_> = std::fs::read_dir(shard_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec![path_for("contended").file]);
}

#[tokio::test]
async fn test_get_entry_reports_stored_key() {
    let dir = tmp_dir();
    let store = open(&dir).await;
    store.set("user:42", &Value::from(json!("x"))).await.expect("set");

    let entry = store.get_entry("user:42").await.expect("get").expect("present");
    assert_eq!(entry.key, "user:42");
    assert_eq!(entry.value, Value::from(json!("x")));
}

#[tokio::test]
async fn test_corrupt_record_is_an_error_not_absent() {
    let dir = tmp_dir();
    let store = open(&dir).await;
    store.set("bad", &Value::from(json!(1))).await.expect("set");
    std::fs::write(store.path_of("bad"), b"garbage without a header").unwrap();

    match store.get("bad").await {
        Err(StoreError::CorruptRecord { path, .. }) => {
            assert_eq!(path, Some(store.path_of("bad")));
        }
        other => panic!("expected CorruptRecord, got {other:?}"),
    }
}

#[tokio::test]
async fn test_key_validation() {
    assert!(is_valid_key("a"));
    assert!(is_valid_key(" "));
    assert!(!is_valid_key(""));

    let dir = tmp_dir();
    let store = open(&dir).await;
    let v = Value::from(json!(null));
    assert!(matches!(store.checked_set("", &v).await, Err(StoreError::Validation(_))));
    assert!(matches!(store.checked_get("").await, Err(StoreError::Validation(_))));
    assert!(matches!(store.checked_del("").await, Err(StoreError::Validation(_))));

    store.checked_set("ok", &v).await.expect("checked set");
    assert_eq!(store.checked_get("ok").await.expect("checked get"), Some(v));
}

#[tokio::test]
async fn test_revival_can_be_disabled() {
    let dir = tmp_dir();
    let config = Config::from_toml(&format!(
        "[storage]\nbase_path = {:?}\nrevive_dates = false\n",
        dir.path().display().to_string()
    ))
    .expect("config");
    let store = Store::open(config).await.expect("open");

    store
        .set("j", &Value::from(json!({"when": "2024-01-01T00:00:00.000Z"})))
        .await
        .expect("set");
    let got = store.get("j").await.expect("get").expect("present");
    assert_eq!(
        got.as_json().and_then(|j| j.get("when")),
        Some(&Json::String("2024-01-01T00:00:00.000Z".into()))
    );
}

#[test]
fn test_config_defaults_and_validation() {
    let cfg = Config::from_toml("[storage]\nbase_path = \"/tmp/kv\"\n").expect("config");
    assert!(cfg.storage.revive_dates);
    assert_eq!(cfg.scan.concurrency, 16);
    assert_eq!(cfg.scan.channel_capacity, 64);
    assert!(!cfg.scan.fail_fast);

    let bad = Config::from_toml("[storage]\nbase_path = \"/tmp/kv\"\n[scan]\nconcurrency = 0\n");
    assert!(matches!(bad, Err(StoreError::Config(_))));

    let missing = Config::from_toml("[scan]\nconcurrency = 2\n");
    assert!(matches!(missing, Err(StoreError::Config(_))));
}

#[tokio::test]
async fn test_reopen_sees_previous_records() {
    let dir = tmp_dir();
    {
        let store = open(&dir).await;
        store.set("persist", &Value::from(json!({"n": 7}))).await.expect("set");
    }
    let store = Store::open(Config::new(dir.path())).await.expect("reopen");
    assert_eq!(store.get("persist").await.expect("get"), Some(Value::from(json!({"n": 7}))));

    // Stores share nothing in memory; a second handle sees the same files.
    let other = open(&dir).await;
    other.del("persist").await.expect("del");
    assert_eq!(store.get("persist").await.expect("get"), None);
}

#[tokio::test]
async fn test_failed_safe_write_leaves_no_temp_file() {
    let dir = tmp_dir();
    // A non-empty directory where the record should go makes the final step fail.
    let target = dir.path().join("ab").join("record");
    std::fs::create_dir_all(target.join("occupied")).unwrap();

    let res = LocalFs.safe_write(&target, b"payload").await;
    assert!(matches!(res, Err(StoreError::Io(_))), "got {res:?}");

    let names: Vec<_> = std::fs::read_dir(dir.path().join("ab"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["record".to_string()]);
}

#[tokio::test]
async fn test_out_of_range_date_is_rejected_on_set() {
    let dir = tmp_dir();
    let store = open(&dir).await;

    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    let res = store.set("far", &Value::Json(Json::Date(far))).await;
    assert!(matches!(res, Err(StoreError::Serialization(_))), "got {res:?}");
    assert_eq!(store.get("far").await.expect("get"), None);

    let edge = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
    store.set("edge", &Value::Json(Json::Date(edge))).await.expect("set edge");
    let got = store.get("edge").await.expect("get").expect("present");
    assert_eq!(got.as_json().and_then(Json::as_date), Some(edge));
}
