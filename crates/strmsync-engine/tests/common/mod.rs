//! In-process fakes for the engine's ports

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use strmsync_core::domain::{
    ContentMode, MappingId, MappingSpec, RefreshMode, RemoteItem, RunId, TaskRecord,
};
use strmsync_core::ports::{IMappingStore, IRemoteLister, ITaskRecorder, IUrlResolver};
use strmsync_engine::engine::StrmGenerator;
use strmsync_engine::runner::MappingRunner;
use tokio_util::sync::CancellationToken;

/// Lister returning a fixed set of items, or failing
#[derive(Default)]
pub struct FakeLister {
    pub items: Mutex<Vec<RemoteItem>>,
    pub fail: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl FakeLister {
    pub fn with_paths(paths: &[&str]) -> Arc<Self> {
        let lister = Self::default();
        *lister.items.lock().unwrap() = paths.iter().map(|p| RemoteItem::file(*p)).collect();
        Arc::new(lister)
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let lister = Self::default();
        *lister.fail.lock().unwrap() = Some(message.to_string());
        Arc::new(lister)
    }
}

#[async_trait::async_trait]
impl IRemoteLister for FakeLister {
    async fn list_recursive(
        &self,
        _root: &str,
        _extensions: &[String],
    ) -> anyhow::Result<Vec<RemoteItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail.lock().unwrap().clone() {
            return Err(anyhow!(message));
        }
        Ok(self.items.lock().unwrap().clone())
    }
}

/// Resolver producing `http://media.test/d<path>` and tracking concurrency
#[derive(Default)]
pub struct FakeResolver {
    pub delay: Duration,
    pub failing_paths: Vec<String>,
    /// Cancels the token when the given call (1-based) starts
    pub cancel_on_call: Option<(usize, CancellationToken)>,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn failing_on(paths: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing_paths: paths.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        })
    }

    pub fn cancelling_on_call(
        call: usize,
        token: CancellationToken,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            delay,
            cancel_on_call: Some((call, token)),
            ..Self::default()
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IUrlResolver for FakeResolver {
    async fn resolve(&self, remote_path: &str) -> anyhow::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on_call {
            if call == *at {
                token.cancel();
            }
        }
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing_paths.iter().any(|p| p == remote_path) {
            return Err(anyhow!("object not found"));
        }
        Ok(format!("http://media.test/d{remote_path}"))
    }
}

/// Mapping store backed by a HashMap
#[derive(Default)]
pub struct MemoryStore {
    mappings: Mutex<HashMap<i64, MappingSpec>>,
    next_id: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            mappings: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        })
    }

    pub fn insert(&self, mut spec: MappingSpec) -> MappingId {
        if !spec.id.is_assigned() {
            spec.id = MappingId::new(self.next_id.fetch_add(1, Ordering::SeqCst) as i64);
        }
        let id = spec.id;
        self.mappings.lock().unwrap().insert(id.get(), spec);
        id
    }
}

#[async_trait::async_trait]
impl IMappingStore for MemoryStore {
    async fn list_mappings(&self) -> anyhow::Result<Vec<MappingSpec>> {
        let mut all: Vec<_> = self.mappings.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn list_enabled_mappings(&self) -> anyhow::Result<Vec<MappingSpec>> {
        Ok(self
            .list_mappings()
            .await?
            .into_iter()
            .filter(|m| m.enabled)
            .collect())
    }

    async fn get_mapping(&self, id: MappingId) -> anyhow::Result<Option<MappingSpec>> {
        Ok(self.mappings.lock().unwrap().get(&id.get()).cloned())
    }

    async fn get_mapping_by_name(&self, name: &str) -> anyhow::Result<Option<MappingSpec>> {
        Ok(self
            .mappings
            .lock()
            .unwrap()
            .values()
            .find(|m| m.name == name)
            .cloned())
    }

    async fn save_mapping(&self, spec: &MappingSpec) -> anyhow::Result<MappingId> {
        Ok(self.insert(spec.clone()))
    }

    async fn delete_mapping(&self, id: MappingId) -> anyhow::Result<bool> {
        Ok(self.mappings.lock().unwrap().remove(&id.get()).is_some())
    }
}

/// Task recorder keeping every record in memory
#[derive(Default)]
pub struct MemoryRecorder {
    pub records: Mutex<Vec<TaskRecord>>,
    pub starts: AtomicUsize,
}

impl MemoryRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn started(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn all(&self) -> Vec<TaskRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ITaskRecorder for MemoryRecorder {
    async fn start_task(&self, record: &TaskRecord) -> anyhow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn finish_task(&self, record: &TaskRecord) -> anyhow::Result<()> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.run_id == record.run_id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn get_task(&self, run_id: &RunId) -> anyhow::Result<Option<TaskRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| &r.run_id == run_id)
            .cloned())
    }

    async fn list_tasks(&self, limit: u32) -> anyhow::Result<Vec<TaskRecord>> {
        let mut all = self.all();
        all.reverse();
        all.truncate(limit as usize);
        Ok(all)
    }
}

/// A mapping from `source` into `target` matching mp4 and mkv
pub fn mapping(name: &str, source: &str, target: &Path) -> MappingSpec {
    MappingSpec::new(name, source, target, vec!["mp4".into(), "mkv".into()])
}

pub fn with_modes(mut spec: MappingSpec, refresh: RefreshMode, content: ContentMode) -> MappingSpec {
    spec.refresh_mode = refresh;
    spec.content_mode = content;
    spec
}

pub fn generator(lister: Arc<FakeLister>, resolver: Arc<FakeResolver>) -> StrmGenerator {
    StrmGenerator::new(lister, resolver)
}

pub fn runner(
    lister: Arc<FakeLister>,
    store: Arc<MemoryStore>,
    recorder: Arc<MemoryRecorder>,
) -> Arc<MappingRunner> {
    let generator = Arc::new(StrmGenerator::new(lister, FakeResolver::new()));
    Arc::new(MappingRunner::new(generator, store, recorder))
}

/// Every regular file under `root`, relative, sorted
pub fn files_under(root: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                out.push(
                    path.strip_prefix(base)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/"),
                );
            }
        }
    }
    let mut out = Vec::new();
    if root.exists() {
        walk(root, root, &mut out);
    }
    out.sort();
    out
}
