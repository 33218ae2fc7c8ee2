use crate::domain::reader::{SessionRecord, ViewState};
use crate::error::AppResult;
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Storage key of the session record (text, sections, settings, progress)
pub const SESSION_KEY: &str = "reader-session";
/// Storage key of the pagination record
pub const VIEW_KEY: &str = "reader-view";

/// Keeps each record as one JSON file named after its key.
/// Writes and removals are serialized so the last save always wins.
pub struct SessionRepository {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SessionRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // an unreadable record is treated as absent so the reader still starts
                tracing::warn!(error = %e, path = %path.display(), "Ignoring corrupt record");
                Ok(None)
            }
        }
    }

    /// Write through a temp file so a crash never leaves half a record behind
    async fn save<T: Serialize>(&self, key: &str, record: &T) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{}.{}.tmp", key, Uuid::new_v4()));

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn load_session(&self) -> AppResult<Option<SessionRecord>> {
        self.load(SESSION_KEY).await
    }

    pub async fn save_session(&self, record: &SessionRecord) -> AppResult<()> {
        self.save(SESSION_KEY, record).await
    }

    pub async fn load_view(&self) -> AppResult<Option<ViewState>> {
        self.load(VIEW_KEY).await
    }

    pub async fn save_view(&self, view: &ViewState) -> AppResult<()> {
        self.save(VIEW_KEY, view).await
    }

    /// Forget both records
    pub async fn clear(&self) -> AppResult<()> {
        self.remove(SESSION_KEY).await?;
        self.remove(VIEW_KEY).await
    }
}
