pub mod generator;

use depense_repo::attachment_store::AttachmentStore;
use depense_repo::depense_repo::DepenseRepo;
use serde::Deserialize;
use std::env;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[allow(dead_code)]
#[derive(Debug)]
pub enum RepoType {
    SQLx,
    Mem,
}

#[derive(Deserialize)]
struct TestConfig {
    database_url: String,
}

/// `TEST_DATABASE_URL` wins over the `database_url` in `config_test.toml`.
fn test_database_url() -> String {
    if let Ok(database_url) = env::var("TEST_DATABASE_URL") {
        return database_url;
    }
    let config = fs::read_to_string("config_test.toml")
        .expect("set TEST_DATABASE_URL or provide config_test.toml to run the SQLx tests");
    let config: TestConfig = toml::from_str(&config).unwrap();
    config.database_url
}

#[allow(dead_code)]
pub async fn build_repo(repo_type: RepoType) -> Arc<dyn DepenseRepo> {
    match repo_type {
        RepoType::SQLx => depense_repo::sqlx_repo::create_repos(&test_database_url(), 1)
            .await
            .unwrap(),
        RepoType::Mem => depense_repo::mem_repo::create_repos().0,
    }
}

#[allow(dead_code)]
#[derive(Debug)]
pub enum StoreType {
    Fs,
    Mem,
}

#[allow(dead_code)]
/// The `TempDir` must be kept alive for as long as the store is used.
pub fn build_store(store_type: StoreType) -> (Arc<dyn AttachmentStore>, Option<TempDir>) {
    match store_type {
        StoreType::Fs => {
            let dir = tempfile::tempdir().unwrap();
            let store = depense_repo::fs_store::create_store(dir.path().to_path_buf());
            (store, Some(dir))
        }
        StoreType::Mem => (depense_repo::mem_repo::create_repos().1, None),
    }
}
