use std::sync::Arc;

use chainaudit_application::LedgerRepository;
use chainaudit_core::AppError;
use serde_json::json;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::PostgresLedgerRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres ledger tests: {error}");
    }

    Some(pool)
}

fn unique_event_id(label: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{label}-{}", &suffix[..12])
}

#[tokio::test]
async fn append_links_to_the_current_tail() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresLedgerRepository::new(pool);

    let first = repository
        .append(&unique_event_id("pg-link"), json!({"b": 2, "a": 1}))
        .await
        .unwrap_or_else(|error| panic!("first append failed: {error}"));
    let second = repository
        .append(
            &unique_event_id("pg-link"),
            json!({"nested": {"z": true, "y": [1, 2]}}),
        )
        .await
        .unwrap_or_else(|error| panic!("second append failed: {error}"));

    assert!(second.seq > first.seq);
    let predecessor = repository
        .find_by_seq(second.seq - 1)
        .await
        .unwrap_or_default()
        .map(|entry| entry.hash);
    assert_eq!(second.prev_hash, predecessor);
    assert!(matches!(repository.last_hash().await, Ok(Some(_))));

    let stored = repository.find_by_seq(first.seq).await.unwrap_or_default();
    let Some(stored) = stored else {
        panic!("appended row should be readable");
    };
    assert!(stored.finding_matches_canonical());
    assert_eq!(stored.recompute_hash(), first.hash);
}

#[tokio::test]
async fn duplicate_event_id_is_rejected() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresLedgerRepository::new(pool);
    let event_id = unique_event_id("pg-dup");

    assert!(repository.append(&event_id, json!({"n": 1})).await.is_ok());
    let duplicate = repository.append(&event_id, json!({"n": 2})).await;

    assert_eq!(duplicate, Err(AppError::DuplicateEvent(event_id.clone())));
    let found = repository.find_by_event_id(&event_id).await.unwrap_or_default();
    assert_eq!(found.map(|entry| entry.finding), Some(json!({"n": 1})));
}

#[tokio::test]
async fn concurrent_appends_stay_contiguous() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = Arc::new(PostgresLedgerRepository::new(pool));

    let mut handles = Vec::new();
    for index in 0..20 {
        let repository = repository.clone();
        handles.push(tokio::spawn(async move {
            repository
                .append(&unique_event_id("pg-par"), json!({"index": index}))
                .await
        }));
    }

    let mut links = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(link)) => links.push(link),
            other => panic!("concurrent append failed: {other:?}"),
        }
    }
    links.sort_by_key(|link| link.seq);

    let (Some(first), Some(last)) = (links.first(), links.last()) else {
        panic!("appends should return links");
    };
    let rows = repository
        .entries_in_range(first.seq, Some(last.seq), 1_000)
        .await
        .unwrap_or_default();

    for pair in rows.windows(2) {
        assert_eq!(pair[1].seq, pair[0].seq + 1);
        assert_eq!(pair[1].prev_hash.as_deref(), Some(pair[0].hash.as_str()));
    }
    for link in &links {
        assert!(rows.iter().any(|row| row.hash == link.hash));
    }
}

#[tokio::test]
async fn tail_is_newest_first() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresLedgerRepository::new(pool);

    for _ in 0..3 {
        assert!(
            repository
                .append(&unique_event_id("pg-tail"), json!({"kind": "tail"}))
                .await
                .is_ok()
        );
    }

    let tail = repository.tail(3).await.unwrap_or_default();
    assert_eq!(tail.len(), 3);
    assert!(tail.windows(2).all(|pair| pair[0].seq > pair[1].seq));
}
