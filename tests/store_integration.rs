//! SQLite store scenarios against a real database file.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tempfile::TempDir;

use docport::accounts;
use docport::config::Config;
use docport::sqlite_store::SqliteStore;
use docport_core::error::DocError;
use docport_core::models::{
    now_millis, parse_effective_date, DocumentFields, NewDocument, UpdateDocument,
};
use docport_core::query::{ListQuery, PageRequest};
use docport_core::store::memory::InMemoryStore;
use docport_core::store::DocumentStore;

fn test_config(tmp: &TempDir) -> Config {
    let root = tmp.path().display();
    let config_content = format!(
        r#"[db]
path = "{root}/data/docport.sqlite"

[storage]
files_dir = "{root}/files"

[server]
bind = "127.0.0.1:0"
"#
    );
    toml::from_str(&config_content).unwrap()
}

async fn open_store(tmp: &TempDir) -> SqliteStore {
    SqliteStore::open(&test_config(tmp)).await.unwrap()
}

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
}

fn fields(title: &str, date: NaiveDate) -> DocumentFields {
    DocumentFields {
        title: title.to_string(),
        application: "portal".to_string(),
        description: String::new(),
        effective_date: date,
    }
}

fn new_doc(owner: &str, title: &str, date: NaiveDate) -> NewDocument {
    NewDocument {
        owner_username: owner.to_string(),
        fields: fields(title, date),
        content_ref: format!("files/{title}.pdf"),
    }
}

#[tokio::test]
async fn test_create_then_get_round_trips() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let created = store.create(new_doc("alice", "plan", day(3))).await.unwrap();
    let fetched = store.get(&created.id).await.unwrap();

    assert_eq!(fetched, created);
    assert!(fetched.history.is_empty());
    assert_eq!(fetched.created_at, fetched.updated_at);
}

#[tokio::test]
async fn test_owner_pages_split_fifteen_documents() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    for i in 0..15 {
        store
            .create(new_doc("bob", &format!("doc{i}"), day(i)))
            .await
            .unwrap();
    }
    store.create(new_doc("carol", "other", day(0))).await.unwrap();

    let first = store
        .list(&ListQuery::owner("bob", PageRequest::new(1, 10).unwrap()))
        .await
        .unwrap();
    let second = store
        .list(&ListQuery::owner("bob", PageRequest::new(2, 10).unwrap()))
        .await
        .unwrap();
    let third = store
        .list(&ListQuery::owner("bob", PageRequest::new(3, 10).unwrap()))
        .await
        .unwrap();

    assert_eq!(first.items.len(), 10);
    assert_eq!(second.items.len(), 5);
    assert_eq!(second.total_pages, 2);
    assert!(third.items.is_empty());
    assert_eq!(third.total_pages, 2);

    let ids: HashSet<String> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|d| d.id.clone())
        .collect();
    assert_eq!(ids.len(), 15);
    assert!(first
        .items
        .iter()
        .chain(second.items.iter())
        .all(|d| d.owner_username == "bob"));

    // newest first, ties broken by id
    let mut all = first.items.clone();
    all.extend(second.items.clone());
    for pair in all.windows(2) {
        assert!(
            (pair[0].created_at, &pair[0].id) >= (pair[1].created_at, &pair[1].id),
            "owner listing out of order"
        );
    }
}

#[tokio::test]
async fn test_global_listing_orders_by_effective_date() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    store.create(new_doc("a", "middle", day(5))).await.unwrap();
    store.create(new_doc("b", "oldest", day(1))).await.unwrap();
    store.create(new_doc("c", "newest", day(9))).await.unwrap();

    let page = store
        .list(&ListQuery::global(PageRequest::new(1, 7).unwrap()))
        .await
        .unwrap();
    let titles: Vec<&str> = page.items.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["newest", "middle", "oldest"]);
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn test_updates_append_history_in_order() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let doc = store.create(new_doc("alice", "v1", day(1))).await.unwrap();

    let second = store
        .update(
            &doc.id,
            UpdateDocument {
                fields: fields("v2", day(2)),
                content_ref: Some("files/v2.pdf".to_string()),
            },
        )
        .await
        .unwrap();
    let third = store
        .update(
            &doc.id,
            UpdateDocument {
                fields: fields("v3", day(3)),
                content_ref: None,
            },
        )
        .await
        .unwrap();

    assert!(second.updated_at > doc.updated_at);
    assert!(third.updated_at > second.updated_at);
    assert_eq!(third.content_ref, "files/v2.pdf");

    let stored = store.get(&doc.id).await.unwrap();
    assert_eq!(stored, third);
    assert_eq!(stored.owner_username, "alice");
    assert_eq!(stored.created_at, doc.created_at);

    let versions: Vec<u32> = stored.history.iter().map(|s| s.version).collect();
    assert_eq!(versions, vec![1, 2]);
    assert_eq!(stored.history[0].title, "v1");
    assert_eq!(stored.history[0].content_ref, "files/v1.pdf");
    assert_eq!(stored.history[0].superseded_at, second.updated_at);
    assert_eq!(stored.history[1].title, "v2");
    assert_eq!(stored.history[1].effective_date, day(2));
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    assert!(matches!(store.get("missing").await, Err(DocError::NotFound(_))));
    assert!(matches!(store.delete("missing").await, Err(DocError::NotFound(_))));
    let update = UpdateDocument {
        fields: fields("x", day(0)),
        content_ref: None,
    };
    assert!(matches!(
        store.update("missing", update).await,
        Err(DocError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_writing() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let mut blank = new_doc("alice", "t", day(0));
    blank.fields.title = "  ".to_string();
    assert!(matches!(store.create(blank).await, Err(DocError::Validation(_))));
    assert_eq!(store.count_all().await.unwrap(), 0);

    let doc = store.create(new_doc("alice", "t", day(0))).await.unwrap();
    let bad = UpdateDocument {
        fields: fields("", day(1)),
        content_ref: None,
    };
    assert!(matches!(store.update(&doc.id, bad).await, Err(DocError::Validation(_))));
    assert_eq!(store.get(&doc.id).await.unwrap(), doc);
}

#[tokio::test]
async fn test_delete_removes_document_and_versions() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let doc = store.create(new_doc("alice", "gone", day(0))).await.unwrap();
    store
        .update(
            &doc.id,
            UpdateDocument {
                fields: fields("gone2", day(0)),
                content_ref: None,
            },
        )
        .await
        .unwrap();

    store.delete(&doc.id).await.unwrap();

    assert!(store.get(&doc.id).await.unwrap_err().is_not_found());
    assert_eq!(store.count_by_owner("alice").await.unwrap(), 0);
    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_versions")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn test_count_matches_unbounded_listing() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    for i in 0..4 {
        store.create(new_doc("dana", &format!("d{i}"), day(i))).await.unwrap();
    }
    store.create(new_doc("erin", "e", day(0))).await.unwrap();

    let all = store
        .list(&ListQuery::owner("dana", PageRequest::everything()))
        .await
        .unwrap();
    assert_eq!(store.count_by_owner("dana").await.unwrap(), all.items.len() as u64);
    assert_eq!(store.count_by_owner("nobody").await.unwrap(), 0);
    assert_eq!(store.count_all().await.unwrap(), 5);
    assert_eq!(
        store
            .count_created_since(now_millis() - Duration::days(1))
            .await
            .unwrap(),
        5
    );
}

#[tokio::test]
async fn test_concurrent_updates_keep_every_version() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(open_store(&tmp).await);
    let doc = store.create(new_doc("alice", "base", day(0))).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        let id = doc.id.clone();
        handles.push(tokio::spawn(async move {
            store
                .update(
                    &id,
                    UpdateDocument {
                        fields: fields(&format!("edit{i}"), day(i)),
                        content_ref: None,
                    },
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.get(&doc.id).await.unwrap();
    let versions: Vec<u32> = stored.history.iter().map(|s| s.version).collect();
    assert_eq!(versions, (1..=8).collect::<Vec<u32>>());
    assert_eq!(stored.history[0].title, "base");
    for pair in stored.history.windows(2) {
        assert!(pair[0].superseded_at < pair[1].superseded_at);
    }
}

#[tokio::test]
async fn test_update_racing_delete_leaves_no_orphans() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(open_store(&tmp).await);
    let doc = store.create(new_doc("alice", "race", day(0))).await.unwrap();

    let updater = {
        let store = store.clone();
        let id = doc.id.clone();
        tokio::spawn(async move {
            store
                .update(
                    &id,
                    UpdateDocument {
                        fields: fields("late", day(1)),
                        content_ref: None,
                    },
                )
                .await
        })
    };
    let deleter = {
        let store = store.clone();
        let id = doc.id.clone();
        tokio::spawn(async move { store.delete(&id).await })
    };

    let update_result = updater.await.unwrap();
    deleter.await.unwrap().unwrap();

    if let Err(e) = update_result {
        assert!(e.is_not_found(), "unexpected update error: {e}");
    }
    assert!(store.get(&doc.id).await.unwrap_err().is_not_found());
    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_versions")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn test_account_counters() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let now = now_millis();

    for (name, age_days) in [("old", 30), ("recent", 2), ("today", 0)] {
        sqlx::query("INSERT INTO users (username, created_at) VALUES (?, ?)")
            .bind(name)
            .bind((now - Duration::days(age_days)).timestamp_millis())
            .execute(store.pool())
            .await
            .unwrap();
    }

    assert_eq!(accounts::count_users(store.pool()).await.unwrap(), 3);
    let since = accounts::window_start(7);
    assert_eq!(accounts::count_users_since(store.pool(), since).await.unwrap(), 2);
}

#[tokio::test]
async fn test_global_order_matches_memory_store_at_year_bounds() {
    let tmp = TempDir::new().unwrap();
    let sqlite = open_store(&tmp).await;
    let memory = InMemoryStore::new();

    for (title, raw) in [("now", "2024-06-01"), ("far", "9999-12-31"), ("early", "0000-01-01")] {
        let date = parse_effective_date(raw).unwrap();
        sqlite.create(new_doc("alice", title, date)).await.unwrap();
        memory.create(new_doc("alice", title, date)).await.unwrap();
    }

    let query = ListQuery::global(PageRequest::everything());
    let titles = |docs: Vec<docport_core::Document>| -> Vec<String> {
        docs.into_iter().map(|d| d.title).collect()
    };
    let from_sqlite = titles(sqlite.list(&query).await.unwrap().items);
    let from_memory = titles(memory.list(&query).await.unwrap().items);

    assert_eq!(from_sqlite, vec!["far", "now", "early"]);
    assert_eq!(from_sqlite, from_memory);
}

#[tokio::test]
async fn test_failed_update_write_leaves_document_untouched() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let original = store.create(new_doc("alice", "stable", day(1))).await.unwrap();

    sqlx::query(
        "CREATE TRIGGER reject_title BEFORE UPDATE OF title ON documents \
         BEGIN SELECT RAISE(ABORT, 'boom'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let result = store
        .update(
            &original.id,
            UpdateDocument {
                fields: fields("changed", day(2)),
                content_ref: Some("files/changed.pdf".to_string()),
            },
        )
        .await;
    assert!(matches!(result, Err(DocError::Store(_))), "got {result:?}");

    let stored = store.get(&original.id).await.unwrap();
    assert_eq!(stored, original);
    assert!(stored.history.is_empty());
    let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_versions")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(versions, 0);
}

#[tokio::test]
async fn test_count_created_since() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let before = now_millis() - Duration::milliseconds(1);

    store.create(new_doc("alice", "fresh", day(0))).await.unwrap();

    assert_eq!(store.count_created_since(before).await.unwrap(), 1);
    assert_eq!(
        store
            .count_created_since(now_millis() + Duration::hours(1))
            .await
            .unwrap(),
        0
    );
}
