//! File-based recipient store.
//! The registry is one JSON array of chat ids, sorted and pretty-printed so
//! the file stays human-readable and diffs cleanly between writes.
//! Every mutation rewrites the whole file before returning.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use skycast_core::error::{Result, SkycastError};
use skycast_core::types::RecipientId;
use tokio::sync::Mutex;

/// What `load()` found on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// File parsed as a JSON array of integers.
    Present(BTreeSet<RecipientId>),
    /// No file yet.
    Absent,
    /// File exists but could not be read or parsed.
    Corrupt { reason: String },
}

impl LoadOutcome {
    /// Degrade absent or corrupt state to an empty registry.
    pub fn into_set(self) -> BTreeSet<RecipientId> {
        match self {
            Self::Present(set) => set,
            Self::Absent | Self::Corrupt { .. } => BTreeSet::new(),
        }
    }
}

/// Durable set of recipients.
pub struct RecipientStore {
    path: PathBuf,
    recipients: Mutex<BTreeSet<RecipientId>>,
}

impl RecipientStore {
    /// Open the store at `path`, loading whatever is there.
    /// Never fails: unreadable state starts an empty registry.
    pub fn open(path: &Path) -> Self {
        let outcome = Self::load_from(path);
        match &outcome {
            LoadOutcome::Present(set) => {
                tracing::info!("📇 Loaded {} recipient(s) from {}", set.len(), path.display());
            }
            LoadOutcome::Absent => {
                tracing::info!("📇 No recipient file at {}, starting empty", path.display());
            }
            LoadOutcome::Corrupt { reason } => {
                tracing::warn!(
                    "⚠️ Recipient file {} is unreadable ({reason}), starting empty",
                    path.display()
                );
            }
        }
        Self {
            path: path.to_path_buf(),
            recipients: Mutex::new(outcome.into_set()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file at this store's path.
    pub fn load(&self) -> LoadOutcome {
        Self::load_from(&self.path)
    }

    /// Read `path` without touching any in-memory state.
    pub fn load_from(path: &Path) -> LoadOutcome {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Absent,
            Err(e) => {
                return LoadOutcome::Corrupt {
                    reason: SkycastError::StorageRead(e.to_string()).to_string(),
                };
            }
        };
        match serde_json::from_str::<Vec<RecipientId>>(&json) {
            Ok(ids) => LoadOutcome::Present(ids.into_iter().collect()),
            Err(e) => LoadOutcome::Corrupt {
                reason: SkycastError::StorageRead(e.to_string()).to_string(),
            },
        }
    }

    /// Replace the whole registry with `set`, on disk and in memory.
    /// On a failed write neither side changes.
    pub async fn persist(&self, set: BTreeSet<RecipientId>) -> Result<()> {
        let mut recipients = self.recipients.lock().await;
        self.save(&set)?;
        *recipients = set;
        Ok(())
    }

    /// Write `set` over the store file (temp file + rename).
    /// Callers hold the lock and own keeping memory in step.
    fn save(&self, set: &BTreeSet<RecipientId>) -> Result<()> {
        write_atomic(&self.path, set)?;
        tracing::debug!("💾 Saved {} recipient(s) to {}", set.len(), self.path.display());
        Ok(())
    }

    /// Register `id`. Returns `true` if it was not already present.
    pub async fn add(&self, id: RecipientId) -> Result<bool> {
        let mut recipients = self.recipients.lock().await;
        if !recipients.insert(id) {
            return Ok(false);
        }
        if let Err(e) = self.save(&recipients) {
            recipients.remove(&id);
            return Err(e);
        }
        tracing::info!("➕ Recipient {id} registered ({} total)", recipients.len());
        Ok(true)
    }

    /// Unregister `id`. Returns `true` if it was present.
    pub async fn remove(&self, id: RecipientId) -> Result<bool> {
        let mut recipients = self.recipients.lock().await;
        if !recipients.remove(&id) {
            return Ok(false);
        }
        if let Err(e) = self.save(&recipients) {
            recipients.insert(id);
            return Err(e);
        }
        tracing::info!("➖ Recipient {id} unregistered ({} left)", recipients.len());
        Ok(true)
    }

    /// Remove every id in `ids` with a single write. Returns how many were present.
    pub async fn remove_all(&self, ids: &[RecipientId]) -> Result<usize> {
        let mut recipients = self.recipients.lock().await;
        let removed: Vec<RecipientId> = ids
            .iter()
            .copied()
            .filter(|id| recipients.remove(id))
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.save(&recipients) {
            recipients.extend(removed);
            return Err(e);
        }
        Ok(removed.len())
    }

    /// Copy of the current registry, ascending.
    pub async fn snapshot(&self) -> Vec<RecipientId> {
        self.recipients.lock().await.iter().copied().collect()
    }

    pub async fn contains(&self, id: RecipientId) -> bool {
        self.recipients.lock().await.contains(&id)
    }

    pub async fn len(&self) -> usize {
        self.recipients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.recipients.lock().await.is_empty()
    }
}

fn write_atomic(path: &Path, set: &BTreeSet<RecipientId>) -> Result<()> {
    let ids: Vec<RecipientId> = set.iter().copied().collect();
    let json = serde_json::to_string_pretty(&ids)
        .map_err(|e| SkycastError::StorageWrite(format!("Serialize error: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| SkycastError::StorageWrite(format!("{}: {e}", parent.display())))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, json)
        .map_err(|e| SkycastError::StorageWrite(format!("{}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        std::fs::remove_file(&tmp).ok();
        SkycastError::StorageWrite(format!("{}: {e}", path.display()))
    })
}
