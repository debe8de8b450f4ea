/*!
 * Integration tests for the user pronoun store lifecycle
 */

use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use pronouns::database::{DatabaseConnection, Repository};
use pronouns::{StoreError, UserPronounStore};

use crate::common::{self, sets};

const SHE: &str = "she/her/she's/her/hers/herself";
const THEY: &str = "they/them/they're/their/theirs/themselves";

fn user() -> Uuid {
    Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
}

#[tokio::test]
async fn test_set_thenGet_shouldReturnSameOrder() {
    common::init_logging();
    let store = UserPronounStore::in_memory().unwrap();

    let selection = sets(&[
        "she/her/her/hers/herself/herself",
        "they/them/their/theirs/themself/themselves",
    ]);

    store.set(user(), selection.clone());

    assert_eq!(store.get(user()).await.unwrap(), selection);
}

#[tokio::test]
async fn test_set_afterRestart_shouldBeDurableInOrder() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::storage_config(dir.path());

    {
        let store = UserPronounStore::open(&config).unwrap();
        store.set(user(), sets(&[THEY, SHE]));
        assert_ok!(store.flush().await);
    }

    let reopened = UserPronounStore::open(&config).unwrap();
    assert_eq!(reopened.cached_users(), 0);
    assert_eq!(reopened.get(user()).await.unwrap(), sets(&[THEY, SHE]));
    assert_eq!(reopened.stats().store_reads, 1);
}

#[tokio::test]
async fn test_clear_withEviction_shouldLeaveNoTrace() {
    common::init_logging();
    let store = UserPronounStore::in_memory().unwrap();
    let other = Uuid::from_u128(2);
    store.set(user(), sets(&[SHE]));
    store.set(other, sets(&[THEY]));

    store.clear(user());
    store.on_disconnect(user());
    assert_ok!(store.flush().await);

    assert!(store.get(user()).await.unwrap().is_empty());
    let all = store.get_all().await.unwrap();
    assert!(!all.contains_key(&user()));
    assert_eq!(all.get(&other), Some(&sets(&[THEY])));
}

#[tokio::test]
async fn test_onDisconnect_shouldForceFreshStoreRead() {
    common::init_logging();
    let store = UserPronounStore::in_memory().unwrap();
    store.set_confirmed(user(), sets(&[SHE])).wait().await.unwrap();

    assert_eq!(store.get(user()).await.unwrap(), sets(&[SHE]));
    assert_eq!(store.stats().store_reads, 0);

    store.on_disconnect(user());
    assert_eq!(store.get_cached(user()), None);
    assert_eq!(store.get(user()).await.unwrap(), sets(&[SHE]));
    assert_eq!(store.stats().store_reads, 1);

    // Second read is served from the repopulated cache
    store.get(user()).await.unwrap();
    assert_eq!(store.stats().store_reads, 1);
}

#[tokio::test]
async fn test_get_afterEvictionWithPendingWrite_shouldSeeThatWrite() {
    common::init_logging();
    let store = UserPronounStore::in_memory().unwrap();

    store.set(user(), sets(&[SHE, THEY]));
    store.on_disconnect(user());

    assert_eq!(store.get(user()).await.unwrap(), sets(&[SHE, THEY]));
}

#[tokio::test]
async fn test_set_manyTimes_shouldPersistLastValue() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::storage_config(dir.path());
    let store = Arc::new(UserPronounStore::open(&config).unwrap());

    for round in 0..20 {
        let value = format!("set-{}", round);
        store.set(user(), vec![value, SHE.to_string()]);
    }
    assert_ok!(store.flush().await);

    store.on_disconnect(user());
    assert_eq!(store.get(user()).await.unwrap(), sets(&["set-19", SHE]));
    assert_eq!(store.stats().writes_completed, 20);
}

#[tokio::test]
async fn test_concurrentSets_shouldConvergeWithCache() {
    common::init_logging();
    let store = Arc::new(UserPronounStore::in_memory().unwrap());

    let mut handles = Vec::new();
    for task in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.set(user(), vec![format!("task-{}", task)]);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_ok!(store.flush().await);

    let cached = store.get_cached(user()).unwrap();
    let durable = store.get_all().await.unwrap();
    assert_eq!(durable.get(&user()), Some(&cached));
}

#[tokio::test]
async fn test_open_withLegacySchema_shouldMigrateAndReadRows() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::storage_config(dir.path());
    {
        let conn = rusqlite::Connection::open(&config.database_path).unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE pronouns_players (playerUuid VARCHAR(36), pronouns TEXT);
             INSERT INTO pronouns_players VALUES ('{}', 'legacy/set/a/b/c/d');",
            user()
        ))
        .unwrap();
    }

    let store = UserPronounStore::open(&config).unwrap();

    assert_eq!(store.get(user()).await.unwrap(), sets(&["legacy/set/a/b/c/d"]));
}

#[tokio::test]
async fn test_open_withUnusablePath_shouldFailInitialization() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let mut config = common::storage_config(dir.path());
    // A directory cannot be opened as a database file
    config.database_path = dir.path().to_path_buf();

    let result = UserPronounStore::open(&config);

    assert!(matches!(result, Err(StoreError::Initialization(_))));
}

#[tokio::test]
async fn test_backingStoreFailure_shouldSurfaceOnReadsAndCountOnWrites() {
    common::init_logging();
    let db = DatabaseConnection::new_in_memory().unwrap();
    let store = UserPronounStore::with_repository(Repository::new(db.clone())).unwrap();
    db.execute(|conn| {
        conn.execute_batch("DROP TABLE pronouns_players;")?;
        Ok(())
    })
    .unwrap();

    let read = store.get(user()).await;
    assert!(matches!(read, Err(StoreError::Unavailable(_))));

    store.set(user(), sets(&[SHE]));
    // The caller still sees the new value
    assert_eq!(store.get(user()).await.unwrap(), sets(&[SHE]));
    assert_ok!(store.flush().await);
    assert_eq!(store.stats().write_failures, 1);

    let confirmed = store.set_confirmed(user(), sets(&[THEY])).wait().await;
    assert!(matches!(confirmed, Err(StoreError::Unavailable(_))));

    assert_err!(store.get_all().await);
}
