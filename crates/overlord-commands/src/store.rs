//! File-backed and in-memory stores for commands and alerts.

use crate::command::CommandRecord;
use crate::error::ServiceError;
use crate::traits::{AlertStore, CommandStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Alerts available before anyone runs `!addalert`.
pub const DEFAULT_ALERTS: [(&str, &str); 4] = [
    ("takeoff", "Initiating takeoff sequence. All systems nominal."),
    ("landing", "Landing sequence engaged. Prepare for descent."),
    (
        "emergency",
        "ALERT: Emergency protocols activated. Stand by for instructions.",
    ),
    (
        "success",
        "Mission objective achieved. Performance noted in efficiency logs.",
    ),
];

fn default_alerts() -> BTreeMap<String, String> {
    DEFAULT_ALERTS
        .iter()
        .map(|(name, message)| ((*name).to_string(), (*message).to_string()))
        .collect()
}

/// Reads a JSON file, returning `None` when it does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ServiceError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replaces a JSON file atomically via a temporary file in the same directory.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ServiceError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ServiceError::Storage(e.to_string()))?;
    debug!(path = %path.display(), "Wrote JSON file");
    Ok(())
}

async fn write_off_thread<T>(path: PathBuf, value: T) -> Result<(), ServiceError>
where
    T: Serialize + Send + 'static,
{
    tokio::task::spawn_blocking(move || write_json_atomic(&path, &value))
        .await
        .map_err(|e| ServiceError::Storage(format!("write task failed: {e}")))?
}

/// Command store backed by one JSON file holding every record.
pub struct JsonCommandStore {
    path: PathBuf,
    records: tokio::sync::Mutex<Option<BTreeMap<String, CommandRecord>>>,
}

impl JsonCommandStore {
    /// Store at `path`. Nothing is read until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: tokio::sync::Mutex::new(None),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, CommandRecord>, ServiceError> {
        let records: Vec<CommandRecord> = read_json(&self.path)?.unwrap_or_default();
        Ok(records.into_iter().map(|r| (r.name.clone(), r)).collect())
    }

    async fn update<F>(&self, change: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut BTreeMap<String, CommandRecord>),
    {
        let mut guard = self.records.lock().await;
        let mut next = match guard.as_ref() {
            Some(records) => records.clone(),
            None => self.read_all()?,
        };
        change(&mut next);
        let snapshot: Vec<CommandRecord> = next.values().cloned().collect();
        write_off_thread(self.path.clone(), snapshot).await?;
        *guard = Some(next);
        Ok(())
    }
}

#[async_trait]
impl CommandStore for JsonCommandStore {
    async fn load(&self) -> Result<Vec<CommandRecord>, ServiceError> {
        let mut guard = self.records.lock().await;
        let records = self.read_all()?;
        info!(path = %self.path.display(), count = records.len(), "Loaded command store");
        let out = records.values().cloned().collect();
        *guard = Some(records);
        Ok(out)
    }

    async fn persist(&self, record: &CommandRecord) -> Result<(), ServiceError> {
        let record = record.clone();
        self.update(move |records| {
            records.insert(record.name.clone(), record);
        })
        .await
    }

    async fn remove(&self, name: &str) -> Result<(), ServiceError> {
        self.update(|records| {
            records.remove(name);
        })
        .await
    }
}

/// In-memory command store, used by tests and the console mode.
#[derive(Debug, Default)]
pub struct MemoryCommandStore {
    records: Mutex<BTreeMap<String, CommandRecord>>,
    fail_writes: AtomicBool,
    write_delay: Mutex<Duration>,
}

impl MemoryCommandStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = CommandRecord>) -> Self {
        let store = Self::new();
        store
            .records
            .lock()
            .extend(records.into_iter().map(|r| (r.name.clone(), r)));
        store
    }

    /// Makes subsequent writes fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delays the acknowledgement of each write after it has been applied.
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock() = delay;
    }

    /// Copy of the stored records.
    pub fn records(&self) -> Vec<CommandRecord> {
        self.records.lock().values().cloned().collect()
    }

    fn check_writable(&self) -> Result<(), ServiceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(ServiceError::Storage("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }

    async fn acknowledge(&self) {
        let delay = *self.write_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CommandStore for MemoryCommandStore {
    async fn load(&self) -> Result<Vec<CommandRecord>, ServiceError> {
        Ok(self.records())
    }

    async fn persist(&self, record: &CommandRecord) -> Result<(), ServiceError> {
        self.check_writable()?;
        self.records.lock().insert(record.name.clone(), record.clone());
        self.acknowledge().await;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), ServiceError> {
        self.check_writable()?;
        self.records.lock().remove(name);
        self.acknowledge().await;
        Ok(())
    }
}

/// Alert store backed by a JSON object of name to message.
pub struct JsonAlertStore {
    path: PathBuf,
    alerts: tokio::sync::Mutex<BTreeMap<String, String>>,
}

impl JsonAlertStore {
    /// Opens the store, seeding the default alerts when the file is new.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let path = path.into();
        let alerts = match read_json::<BTreeMap<String, String>>(&path)? {
            Some(alerts) => alerts,
            None => {
                let seeded = default_alerts();
                write_json_atomic(&path, &seeded)?;
                seeded
            }
        };
        Ok(Self {
            path,
            alerts: tokio::sync::Mutex::new(alerts),
        })
    }
}

#[async_trait]
impl AlertStore for JsonAlertStore {
    async fn save_alert(&self, name: &str, message: &str) -> Result<(), ServiceError> {
        let mut guard = self.alerts.lock().await;
        let mut next = guard.clone();
        next.insert(name.to_string(), message.to_string());
        write_off_thread(self.path.clone(), next.clone()).await?;
        *guard = next;
        Ok(())
    }

    async fn get_alert(&self, name: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.alerts.lock().await.get(name).cloned())
    }
}

/// In-memory alert store seeded with the default alerts.
#[derive(Debug)]
pub struct MemoryAlertStore {
    alerts: Mutex<BTreeMap<String, String>>,
}

impl Default for MemoryAlertStore {
    fn default() -> Self {
        Self {
            alerts: Mutex::new(default_alerts()),
        }
    }
}

impl MemoryAlertStore {
    /// Store holding the default alerts.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn save_alert(&self, name: &str, message: &str) -> Result<(), ServiceError> {
        self.alerts.lock().insert(name.to_string(), message.to_string());
        Ok(())
    }

    async fn get_alert(&self, name: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.alerts.lock().get(name).cloned())
    }
}
