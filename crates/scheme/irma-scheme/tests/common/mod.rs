#![allow(dead_code)]

use async_trait::async_trait;
use irma_scheme::{FetchError, SchemeFetcher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../../testdata")
        .join(name)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// A scratch storage folder holding a copy of `testdata/<name>`.
pub fn storage_copy(name: &str) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    copy_dir(&testdata(name), tmp.path());
    tmp
}

/// Serves the files of a local directory as if it were published at `base_url`.
pub struct DirectoryFetcher {
    base_url: String,
    root: PathBuf,
    delay: Option<Duration>,
    pub requests: Mutex<Vec<String>>,
}

impl DirectoryFetcher {
    pub fn new(base_url: &str, root: PathBuf) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            root,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SchemeFetcher for DirectoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let rel = url
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| FetchError::NotFound(url.to_string()))?;
        std::fs::read(self.root.join(rel)).map_err(|_| FetchError::NotFound(url.to_string()))
    }
}
