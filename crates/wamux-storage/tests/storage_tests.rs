// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite repositories.

use chrono::{Duration, Utc};

use wamux_core::{
    ApiKey, ApiKeyPermission, ApiKeyRepository, ApiKeyStatus, Device, DeviceFilter,
    DeviceRepository, DeviceStatus, ErrorKind,
};
use wamux_quickresponse::{OfficerInfo, QuickResponse, QuickResponseRepository};
use wamux_storage::{
    Database, SqliteApiKeyRepository, SqliteDeviceRepository, SqliteQuickResponseRepository,
};

fn device(name: &str, owner: &str, age_minutes: i64) -> Device {
    let created = Utc::now() - Duration::minutes(age_minutes);
    Device {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        owner: owner.to_string(),
        description: format!("{name} counter"),
        status: DeviceStatus::Active,
        jid: None,
        created_at: created,
        updated_at: created,
    }
}

async fn devices() -> SqliteDeviceRepository {
    SqliteDeviceRepository::new(Database::open_in_memory().await.unwrap())
}

// ---- Devices ----

#[tokio::test]
async fn test_device_create_and_find() {
    let repo = devices().await;
    let shop = device("shop1", "owner-a", 0);
    repo.create(&shop).await.unwrap();

    let by_id = repo.find_by_id(&shop.id).await.unwrap().unwrap();
    assert_eq!(by_id.name, "shop1");
    assert_eq!(by_id.description, "shop1 counter");
    assert_eq!(by_id.status, DeviceStatus::Active);
    assert_eq!(by_id.created_at.timestamp_micros(), shop.created_at.timestamp_micros());

    let by_name = repo.find_by_name("shop1").await.unwrap().unwrap();
    assert_eq!(by_name.id, shop.id);
    assert!(repo.find_by_name("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_live_name_is_conflict() {
    let repo = devices().await;
    repo.create(&device("shop1", "owner-a", 0)).await.unwrap();

    let err = repo.create(&device("shop1", "owner-b", 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_soft_deleted_name_can_be_reused() {
    let repo = devices().await;
    let old = device("shop1", "owner-a", 10);
    repo.create(&old).await.unwrap();
    repo.delete(&old.id).await.unwrap();

    assert!(repo.find_by_name("shop1").await.unwrap().is_none());
    let deleted = repo.find_by_id(&old.id).await.unwrap().unwrap();
    assert_eq!(deleted.status, DeviceStatus::Deleted);

    repo.create(&device("shop1", "owner-a", 0)).await.unwrap();
    assert!(repo.find_by_name("shop1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_find_all_filters_orders_and_paginates() {
    let repo = devices().await;
    repo.create(&device("oldest", "owner-a", 30)).await.unwrap();
    repo.create(&device("middle", "owner-a", 20)).await.unwrap();
    repo.create(&device("newest", "owner-a", 10)).await.unwrap();
    repo.create(&device("other", "owner-b", 5)).await.unwrap();
    let gone = device("gone", "owner-a", 1);
    repo.create(&gone).await.unwrap();
    repo.delete(&gone.id).await.unwrap();

    let owner_a = DeviceFilter {
        owner: Some("owner-a".into()),
        status: None,
    };
    let names: Vec<String> = repo
        .find_all(&owner_a, 0, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["newest", "middle", "oldest"]);
    assert_eq!(repo.count(&owner_a).await.unwrap(), 3);

    let page: Vec<String> = repo
        .find_all(&owner_a, 1, 1)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(page, vec!["middle"]);

    let deleted = DeviceFilter {
        owner: None,
        status: Some(DeviceStatus::Deleted),
    };
    assert_eq!(repo.count(&deleted).await.unwrap(), 1);
    assert_eq!(repo.count(&DeviceFilter::default()).await.unwrap(), 4);
}

#[tokio::test]
async fn test_update_jid_and_status() {
    let repo = devices().await;
    let shop = device("shop1", "owner-a", 0);
    repo.create(&shop).await.unwrap();

    repo.update_jid(&shop.id, "62811@s.whatsapp.net").await.unwrap();
    repo.update_status(&shop.id, DeviceStatus::Inactive).await.unwrap();

    let stored = repo.find_by_id(&shop.id).await.unwrap().unwrap();
    assert_eq!(stored.jid.as_deref(), Some("62811@s.whatsapp.net"));
    assert_eq!(stored.status, DeviceStatus::Inactive);
    assert!(stored.updated_at >= shop.updated_at);
}

#[tokio::test]
async fn test_mutations_on_unknown_id_are_not_found() {
    let repo = devices().await;
    let ghost = device("ghost", "owner-a", 0);

    for err in [
        repo.update(&ghost).await.unwrap_err(),
        repo.delete(&ghost.id).await.unwrap_err(),
        repo.update_jid(&ghost.id, "62811@s.whatsapp.net").await.unwrap_err(),
        repo.update_status(&ghost.id, DeviceStatus::Inactive).await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_rename_onto_live_name_is_conflict() {
    let repo = devices().await;
    repo.create(&device("shop1", "owner-a", 0)).await.unwrap();
    let mut second = device("shop2", "owner-a", 0);
    repo.create(&second).await.unwrap();

    second.name = "shop1".into();
    let err = repo.update(&second).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_devices_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wamux.db");
    let path = path.to_str().unwrap();

    let shop = device("shop1", "owner-a", 0);
    {
        let repo = SqliteDeviceRepository::new(Database::open(path).await.unwrap());
        repo.create(&shop).await.unwrap();
    }
    let repo = SqliteDeviceRepository::new(Database::open(path).await.unwrap());
    assert_eq!(repo.find_by_name("shop1").await.unwrap().unwrap().id, shop.id);
}

// ---- Quick responses ----

fn report(officer: &str, age_minutes: i64) -> QuickResponse {
    QuickResponse {
        id: uuid::Uuid::new_v4().to_string(),
        device_name: "shop1".into(),
        sender: "62811@s.whatsapp.net".into(),
        officer: OfficerInfo {
            name: officer.into(),
            position: "Juru Pengairan".into(),
            assignment: "D.I Cipamingkis".into(),
        },
        activity: Default::default(),
        output: Default::default(),
        created_at: Utc::now() - Duration::minutes(age_minutes),
    }
}

#[tokio::test]
async fn test_quick_response_round_trip_and_listing() {
    let repo = SqliteQuickResponseRepository::new(Database::open_in_memory().await.unwrap());
    let older = report("Budi", 10);
    let newer = report("Sari", 1);
    repo.save(&older).await.unwrap();
    repo.save(&newer).await.unwrap();

    let stored = repo.find_by_id(&older.id).await.unwrap().unwrap();
    assert_eq!(stored.officer, older.officer);
    assert_eq!(stored.sender, older.sender);

    let names: Vec<String> = repo
        .find_all(0, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.officer.name)
        .collect();
    assert_eq!(names, vec!["Sari", "Budi"]);
    assert_eq!(repo.count().await.unwrap(), 2);

    repo.delete(&older.id).await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 1);
    let err = repo.delete(&older.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ---- API keys ----

fn api_key(name: &str, owner: &str, age_minutes: i64) -> ApiKey {
    let created = Utc::now() - Duration::minutes(age_minutes);
    ApiKey {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        owner: owner.to_string(),
        key_hash: format!("hash-of-{name}"),
        key_hint: "3f9a01bc".into(),
        permissions: vec![ApiKeyPermission::new("devices", &["read", "write"])],
        status: ApiKeyStatus::Active,
        rate_limit: 60,
        last_used_at: None,
        expires_at: None,
        created_at: created,
        updated_at: created,
    }
}

async fn api_keys() -> SqliteApiKeyRepository {
    SqliteApiKeyRepository::new(Database::open_in_memory().await.unwrap())
}

#[tokio::test]
async fn test_api_key_create_and_lookup() {
    let repo = api_keys().await;
    let key = api_key("ci bot", "ops", 0);
    repo.create(&key).await.unwrap();

    let by_hash = repo.find_by_hash("hash-of-ci bot").await.unwrap().unwrap();
    assert_eq!(by_hash.id, key.id);
    assert_eq!(by_hash.key_hash, key.key_hash);
    assert_eq!(by_hash.permissions, key.permissions);
    assert_eq!(by_hash.rate_limit, 60);
    assert_eq!(by_hash.expires_at, None);

    assert_eq!(repo.find_by_id(&key.id).await.unwrap().unwrap().name, "ci bot");
    assert!(repo.find_by_hash("unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_api_key_hash_is_conflict() {
    let repo = api_keys().await;
    repo.create(&api_key("ci bot", "ops", 0)).await.unwrap();

    let err = repo.create(&api_key("ci bot", "someone-else", 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_api_keys_list_by_owner_newest_first() {
    let repo = api_keys().await;
    repo.create(&api_key("oldest", "ops", 30)).await.unwrap();
    repo.create(&api_key("newest", "ops", 1)).await.unwrap();
    repo.create(&api_key("middle", "ops", 10)).await.unwrap();
    repo.create(&api_key("foreign", "sales", 0)).await.unwrap();

    let names = |keys: Vec<ApiKey>| keys.into_iter().map(|k| k.name).collect::<Vec<_>>();
    assert_eq!(
        names(repo.find_by_owner("ops", 0, 10).await.unwrap()),
        vec!["newest", "middle", "oldest"]
    );
    assert_eq!(names(repo.find_by_owner("ops", 1, 1).await.unwrap()), vec!["middle"]);
    assert_eq!(repo.count_by_owner("ops").await.unwrap(), 3);
    assert_eq!(repo.count_by_owner("nobody").await.unwrap(), 0);
}

#[tokio::test]
async fn test_api_key_update_touch_and_delete() {
    let repo = api_keys().await;
    let mut key = api_key("ci bot", "ops", 5);
    repo.create(&key).await.unwrap();

    key.name = "deploy bot".into();
    key.status = ApiKeyStatus::Inactive;
    key.permissions = vec![ApiKeyPermission::full_access()];
    repo.update(&key).await.unwrap();

    let used = Utc::now();
    repo.touch_last_used(&key.id, used).await.unwrap();

    let stored = repo.find_by_id(&key.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "deploy bot");
    assert_eq!(stored.status, ApiKeyStatus::Inactive);
    assert_eq!(stored.permissions, vec![ApiKeyPermission::full_access()]);
    assert_eq!(
        stored.last_used_at.map(|t| t.timestamp_micros()),
        Some(used.timestamp_micros())
    );

    repo.delete(&key.id).await.unwrap();
    assert!(repo.find_by_id(&key.id).await.unwrap().is_none());
    for err in [
        repo.delete(&key.id).await.unwrap_err(),
        repo.update(&key).await.unwrap_err(),
        repo.touch_last_used(&key.id, used).await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_expire_stale_only_touches_lapsed_active_keys() {
    let repo = api_keys().await;
    let now = Utc::now();

    let mut lapsed = api_key("lapsed", "ops", 0);
    lapsed.expires_at = Some(now - Duration::hours(1));
    let mut lapsed_inactive = api_key("lapsed-inactive", "ops", 0);
    lapsed_inactive.expires_at = Some(now - Duration::hours(1));
    lapsed_inactive.status = ApiKeyStatus::Inactive;
    let mut future = api_key("future", "ops", 0);
    future.expires_at = Some(now + Duration::days(3));
    let forever = api_key("forever", "ops", 0);
    for key in [&lapsed, &lapsed_inactive, &future, &forever] {
        repo.create(key).await.unwrap();
    }

    assert_eq!(repo.expire_stale(now).await.unwrap(), 1);
    assert_eq!(repo.expire_stale(now).await.unwrap(), 0);

    let status = |id: String| {
        let repo = &repo;
        async move { repo.find_by_id(&id).await.unwrap().unwrap().status }
    };
    assert_eq!(status(lapsed.id.clone()).await, ApiKeyStatus::Expired);
    assert_eq!(status(lapsed_inactive.id.clone()).await, ApiKeyStatus::Inactive);
    assert_eq!(status(future.id.clone()).await, ApiKeyStatus::Active);
    assert_eq!(status(forever.id.clone()).await, ApiKeyStatus::Active);
}
