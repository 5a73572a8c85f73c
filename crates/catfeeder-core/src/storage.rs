use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const FEEDINGS_KEY: &str = "feedingEntries";
pub const APPOINTMENTS_KEY: &str = "appointments";
pub const VIEW_STATE_KEY: &str = "viewState";

/// String-keyed persistent storage. Every value is a complete serialized document.
pub trait Storage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// One `<key>.json` file per key inside the data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    pub data_dir: PathBuf,
}

impl FileStorage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened storage");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    #[tracing::instrument(skip(self))]
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(file = %path.display(), "no stored value");
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, value))]
    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = value.len(), "writing value atomically");

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;

        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads a JSON array stored under `key`. Missing, unreadable or malformed
/// values all yield an empty collection.
#[tracing::instrument(skip(storage))]
pub fn load_collection<S, T>(storage: &S, key: &str) -> Vec<T>
where
    S: Storage,
    T: DeserializeOwned,
{
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(key, error = %err, "failed reading stored collection; starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(items) => {
            debug!(key, count = items.len(), "loaded collection");
            items
        }
        Err(err) => {
            warn!(key, error = %err, "stored collection is malformed; starting empty");
            Vec::new()
        }
    }
}

#[tracing::instrument(skip(storage, value))]
pub fn save_document<S, T>(storage: &mut S, key: &str, value: &T) -> anyhow::Result<()>
where
    S: Storage,
    T: Serialize + ?Sized,
{
    let serialized = serde_json::to_string(value)
        .with_context(|| format!("failed to serialize {key}"))?;
    storage
        .set_item(key, &serialized)
        .with_context(|| format!("failed to save {key}"))
}
