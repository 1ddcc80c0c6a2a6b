use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Result, SignError};
use crate::features::codec;
use crate::features::pdf;
use crate::features::placement::PageSize;

/// A PDF on local storage. Replaced, never edited, when a signed copy is produced.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub bytes: Arc<[u8]>,
    pub pages: Vec<PageSize>,
}

impl Document {
    pub fn from_bytes(path: PathBuf, bytes: Vec<u8>) -> Result<Self> {
        let parsed = pdf::parse(&bytes)?;
        let pages = pdf::page_sizes(&parsed);
        Ok(Self {
            path,
            bytes: bytes.into(),
            pages,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn uri(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Plain unauthenticated GET. The client is built per request since a
/// session downloads a single document.
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SignError::Network(format!("http_client_init_failed:{e}")))?;
        let response = client
            .get(url)
            .send()
            .map_err(|e| SignError::Network(format!("http_get_failed:{e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SignError::Network(format!("http_status:{}", status.as_u16())));
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| SignError::Network(format!("http_body_failed:{e}")))
    }
}

pub fn parse_file_uri_path(uri: &str) -> Option<PathBuf> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if uri.starts_with('/') {
        return Some(PathBuf::from(uri));
    }
    None
}

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Wall-clock millis, bumped so that no two calls in this process collide.
fn unique_stamp() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let mut prev = LAST_STAMP.load(Ordering::SeqCst);
    loop {
        let next = now.max(prev + 1);
        match LAST_STAMP.compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

pub struct DocumentStore {
    root: PathBuf,
    transport: Box<dyn Transport>,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>, transport: Box<dyn Transport>) -> Self {
        Self {
            root: root.into(),
            transport,
        }
    }

    /// Downloads `url` into `<root>/<file_name>`, overwriting any earlier copy.
    pub fn fetch(&self, url: &str, file_name: &str) -> Result<Document> {
        let bytes = match parse_file_uri_path(url) {
            Some(local) => self.read(&local)?,
            None => self.transport.get(url)?,
        };
        let doc = Document::from_bytes(self.root.join(file_name), bytes)?;
        self.write_atomic(&doc.path, &doc.bytes)?;
        log::info!("fetched {} bytes from {url} into {}", doc.bytes.len(), doc.path.display());
        Ok(doc)
    }

    /// Writes a fresh `<stem>_signed_<millis>.pdf` and returns it as a document.
    pub fn persist(&self, bytes: Vec<u8>, stem: &str) -> Result<Document> {
        let path = self.root.join(format!("{stem}_signed_{}.pdf", unique_stamp()));
        let doc = Document::from_bytes(path, bytes)?;
        self.write_atomic(&doc.path, &doc.bytes)?;
        log::info!("persisted {} bytes to {}", doc.bytes.len(), doc.path.display());
        Ok(doc)
    }

    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| SignError::from_io(path, e))
    }

    pub fn read_base64(&self, path: &Path) -> Result<String> {
        self.read(path).map(|bytes| codec::encode(&bytes))
    }

    fn write_atomic(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| SignError::storage("documents_dir_create_failed", e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| SignError::storage("temp_create_failed", e))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| SignError::storage("temp_write_failed", e))?;
        tmp.persist(dest)
            .map_err(|e| SignError::storage(&dest.display().to_string(), e.error))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory transport keyed by URL; unknown URLs fail like a dead network.
    #[derive(Default)]
    pub struct StubTransport {
        pub responses: HashMap<String, Vec<u8>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl Transport for StubTransport {
        fn get(&self, url: &str) -> Result<Vec<u8>> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(url.to_string());
            }
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| SignError::Network(format!("unreachable:{url}")))
        }
    }
}
