//! Common test utilities and fixtures.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use docstore::{DocumentService, StoreConfig};
use tempfile::TempDir;

/// Writer identity used by every test fixture.
pub const WRITER_ID: &str = "test-node";

/// A document service over a fresh temporary root.
pub struct TestStore {
    pub docs: DocumentService,
    pub root: PathBuf,
    _temp_dir: TempDir, // Keep alive for test duration
}

impl TestStore {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_lock_timeout(Duration::from_secs(5))
    }

    pub fn with_lock_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("json-storage");
        let docs = DocumentService::open(&Self::config(&root).with_lock_timeout(timeout))?;
        Ok(Self {
            docs,
            root,
            _temp_dir: temp_dir,
        })
    }

    /// Configuration for another writer over the same root.
    pub fn config(root: &std::path::Path) -> StoreConfig {
        StoreConfig::new(root).with_writer_id(WRITER_ID).with_sync(false)
    }

    /// Number of record files in the root.
    pub fn record_count(&self) -> anyhow::Result<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(&self.root)? {
            if entry?.file_name().to_string_lossy().ends_with(".json") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Names of leftover temp files in the root.
    pub fn temp_files(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(".tmp") {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[cfg(feature = "server")]
pub use app::TestApp;

#[cfg(feature = "server")]
mod app {
    use axum_test::TestServer;
    use docstore::DocumentService;
    use docstore::server::{AppState, router};
    use serde_json::Value;

    use super::TestStore;

    /// Test application wrapper around a temporary store.
    pub struct TestApp {
        pub server: TestServer,
        pub store: TestStore,
    }

    impl TestApp {
        pub fn new() -> anyhow::Result<Self> {
            Self::with_body_limit(1024 * 1024)
        }

        pub fn with_body_limit(max_body_bytes: usize) -> anyhow::Result<Self> {
            let store = TestStore::new()?;
            let docs = DocumentService::open(&TestStore::config(&store.root))?;
            let server = TestServer::new(router(AppState::new(docs, max_body_bytes)))?;
            Ok(Self { server, store })
        }

        /// POST a document and return the created record.
        pub async fn create(&self, data: Value) -> anyhow::Result<Value> {
            let response = self
                .server
                .post("/json")
                .json(&serde_json::json!({ "data": data }))
                .await;
            response.assert_status(axum::http::StatusCode::CREATED);
            Ok(response.json())
        }
    }
}
