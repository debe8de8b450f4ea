/*!
 * Integration tests for the remote catalog cache
 */

use std::collections::BTreeSet;
use std::sync::Arc;

use pronouns::catalog::mock::MockCatalogClient;
use pronouns::catalog::snapshot::ERROR_SOURCE;
use pronouns::{PronounSet, RemoteCatalogCache};

use crate::common::{self, SAMPLE_DOCUMENT};

fn parsed(items: &[&str]) -> BTreeSet<PronounSet> {
    items.iter().map(|s| PronounSet::parse(s).unwrap()).collect()
}

#[tokio::test]
async fn test_open_withWorkingService_shouldLoadExactlyServedSets() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::catalog_config(dir.path());
    let client = Arc::new(MockCatalogClient::serving(SAMPLE_DOCUMENT));

    let catalog = RemoteCatalogCache::open(&config, client.clone()).await;

    assert_eq!(
        catalog.get(),
        parsed(&[
            "she/her/she's/her/hers/herself",
            "they/them/they're/their/theirs/themselves"
        ])
    );
    assert_eq!(catalog.snapshot().unwrap().source, "pn.lucypoulton.net");
    assert_eq!(std::fs::read_to_string(&config.cache_file).unwrap(), SAMPLE_DOCUMENT);
    assert_eq!(client.fetch_count(), 1);
    assert_eq!(catalog.stats().refreshes, 1);
}

#[tokio::test]
async fn test_update_withNewDocument_shouldReplaceWholesale() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::catalog_config(dir.path());
    let client = Arc::new(MockCatalogClient::serving(SAMPLE_DOCUMENT));
    let catalog = RemoteCatalogCache::open(&config, client.clone()).await;

    client.set_body(Some(
        r#"{"source": "v2", "updatedAt": "2024-04-01T00:00:00Z", "sets": ["xe/xem/xe's/xyr/xyrs/xemself"]}"#
            .to_string(),
    ));
    catalog.update().await;

    assert_eq!(catalog.get(), parsed(&["xe/xem/xe's/xyr/xyrs/xemself"]));
    assert_eq!(catalog.snapshot().unwrap().source, "v2");
}

#[tokio::test]
async fn test_open_withCorruptFileAndNoNetwork_shouldBeEmpty() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::catalog_config(dir.path());
    common::create_test_file(dir.path(), "cloud.json", "{ this is not json").unwrap();
    let client = Arc::new(MockCatalogClient::failing());

    let catalog = RemoteCatalogCache::open(&config, client).await;

    assert!(catalog.get().is_empty());
    let snapshot = catalog.snapshot().unwrap();
    assert!(snapshot.is_fallback());
    assert_eq!(snapshot.source, ERROR_SOURCE);
}

#[tokio::test]
async fn test_open_withMissingFileAndNoNetwork_shouldBeEmpty() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::catalog_config(dir.path());
    let client = Arc::new(MockCatalogClient::failing());

    let catalog = RemoteCatalogCache::open(&config, client.clone()).await;

    assert!(catalog.get().is_empty());
    assert!(!config.cache_file.exists());
    // Initial update, then the bootstrap attempt from reload
    assert_eq!(client.fetch_count(), 2);
    assert_eq!(catalog.stats().refresh_failures, 2);
}

#[tokio::test]
async fn test_update_withServiceDown_shouldKeepSnapshot() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::catalog_config(dir.path());
    let client = Arc::new(MockCatalogClient::serving(SAMPLE_DOCUMENT));
    let catalog = RemoteCatalogCache::open(&config, client.clone()).await;

    client.set_body(None);
    catalog.update().await;

    assert_eq!(catalog.get().len(), 2);
    assert_eq!(catalog.stats().refresh_failures, 1);
}

#[tokio::test]
async fn test_reload_withCorruptedFile_shouldKeepLastGoodSnapshot() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::catalog_config(dir.path());
    let client = Arc::new(MockCatalogClient::serving(SAMPLE_DOCUMENT));
    let catalog = RemoteCatalogCache::open(&config, client).await;

    std::fs::write(&config.cache_file, "garbage").unwrap();
    catalog.reload().await;

    assert_eq!(catalog.get().len(), 2);
    assert!(!catalog.snapshot().unwrap().is_fallback());
}

#[tokio::test]
async fn test_open_withSyncDisabled_shouldReadLocalFileOnly() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let mut config = common::catalog_config(dir.path());
    config.sync_enabled = false;
    common::create_test_file(dir.path(), "cloud.json", SAMPLE_DOCUMENT).unwrap();
    let client = Arc::new(MockCatalogClient::serving("{}"));

    let catalog = RemoteCatalogCache::open(&config, client.clone()).await;

    assert_eq!(catalog.get().len(), 2);
    assert_eq!(client.fetch_count(), 0);
}

#[tokio::test]
async fn test_submit_shouldSendSetWithSourceTag() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::catalog_config(dir.path());
    let client = Arc::new(MockCatalogClient::serving(SAMPLE_DOCUMENT));
    let catalog = RemoteCatalogCache::new(&config, client.clone());
    let set = PronounSet::parse("fae/faer/fae's/faer/faers/faerself").unwrap();

    catalog.submit(&set).await;

    let submissions = client.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].set, "fae/faer/fae's/faer/faers/faerself");
    assert_eq!(submissions[0].source, "pronouns-tests 1.2.3 (test)");
    assert_eq!(catalog.stats().submission_failures, 0);
}

#[tokio::test]
async fn test_submit_withRejectingService_shouldOnlyCountFailure() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = common::catalog_config(dir.path());
    let client = Arc::new(MockCatalogClient::serving(SAMPLE_DOCUMENT));
    client.set_reject_submissions(true);
    let catalog = RemoteCatalogCache::new(&config, client.clone());
    let set = PronounSet::parse("she/her/she's/her/hers/herself").unwrap();

    catalog.submit(&set).await;

    assert_eq!(client.submissions().len(), 1);
    let stats = catalog.stats();
    assert_eq!(stats.submissions, 1);
    assert_eq!(stats.submission_failures, 1);
}

#[tokio::test]
async fn test_get_beforeAnyLoad_shouldBeEmpty() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::catalog_config(dir.path());
    let catalog = RemoteCatalogCache::new(&config, Arc::new(MockCatalogClient::failing()));

    assert!(catalog.get().is_empty());
    assert!(catalog.snapshot().is_none());
}
