//! Shared fixtures: a scripted remote service and candidate builders.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::{AssetMetadata, CandidateAsset, FingerprintId, UploadError};
use ferry_services::{DedupRegistry, RemoteAssetService, UploadContext, WorkerPool};

/// What the fake server does for one fingerprint.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Accept,
    Unsupported,
    Overload,
    Reject(u16),
}

/// In-memory remote. Accepts everything not scripted otherwise.
pub struct FakeRemote {
    known: HashSet<FingerprintId>,
    script: HashMap<String, Reply>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            known: HashSet::new(),
            script: HashMap::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn knows(mut self, id: &str) -> Self {
        self.known.insert(id.into());
        self
    }

    pub fn reply(mut self, id: &str, reply: Reply) -> Self {
        self.script.insert(id.to_string(), reply);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Fingerprints that reached `upload_asset`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteAssetService for FakeRemote {
    async fn list_known_fingerprints(
        &self,
        _device_id: &str,
    ) -> anyhow::Result<HashSet<FingerprintId>> {
        Ok(self.known.clone())
    }

    async fn upload_asset(&self, asset: &CandidateAsset) -> Result<AssetMetadata, UploadError> {
        self.calls.lock().unwrap().push(asset.id.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.script.get(asset.id.as_str()).copied().unwrap_or(Reply::Accept) {
            Reply::Accept => Ok(AssetMetadata {
                id: format!("srv-{}", asset.id),
                duplicate: false,
            }),
            Reply::Unsupported => Err(UploadError::UnsupportedMedia {
                path: asset.full_path(),
                mime: "image/x-unknown".into(),
            }),
            Reply::Overload => Err(UploadError::SystemicOverload { errors: 3 }),
            Reply::Reject(status) => Err(UploadError::Server {
                status,
                message: "rejected".into(),
            }),
        }
    }
}

pub fn asset(name: &str, size: u64) -> CandidateAsset {
    CandidateAsset::new(Arc::from(Path::new("/media")), PathBuf::from(name), size)
}

/// Context seeded from the fake's inventory, the way the binary seeds it.
pub async fn context(remote: Arc<FakeRemote>) -> UploadContext {
    let known = remote.list_known_fingerprints("test-device").await.unwrap();
    UploadContext::new(remote, DedupRegistry::seeded(known))
}

pub fn started_pool(workers: usize) -> WorkerPool {
    let mut pool = WorkerPool::new(workers * 4);
    pool.start(workers).unwrap();
    pool
}
