use crate::errors::AppError;
use crate::models::PersistedSubmission;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File-name prefix shared by every persisted submission.
pub const FILE_PREFIX: &str = "health_assessment_";

/// How storage keys are derived from the submission time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKeyMode {
    /// `health_assessment_<unix_secs>.json`. Two submissions saved within the
    /// same second share a key and the later one overwrites the earlier.
    #[default]
    Timestamp,
    /// `health_assessment_<unix_secs>_<uuid>.json`. Never collides.
    Unique,
}

impl std::str::FromStr for StorageKeyMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestamp" => Ok(Self::Timestamp),
            "unique" => Ok(Self::Unique),
            other => anyhow::bail!("Unknown storage key mode '{}'", other),
        }
    }
}

/// Append-only, one-file-per-submission store
pub struct SubmissionStore {
    dir: PathBuf,
    key_mode: StorageKeyMode,
}

impl SubmissionStore {
    /// Open the store, creating its directory if needed.
    pub async fn open(dir: impl Into<PathBuf>, key_mode: StorageKeyMode) -> Result<Self, AppError> {
        let store = Self {
            dir: dir.into(),
            key_mode,
        };
        store.ensure_dir().await?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a submission and return its storage key.
    pub async fn save(&self, submission: &PersistedSubmission) -> Result<String, AppError> {
        self.save_at(submission, Utc::now()).await
    }

    /// Persist a submission under the key derived from `now`.
    pub async fn save_at(
        &self,
        submission: &PersistedSubmission,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        self.ensure_dir().await?;

        let path = self.dir.join(self.file_name(now));
        let key = path.display().to_string();

        let body = serde_json::to_vec_pretty(submission).map_err(|e| {
            AppError::StorageWriteFailed(format!("Failed to serialize submission: {}", e))
        })?;

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| AppError::StorageWriteFailed(format!("Failed to write {}: {}", key, e)))?;

        tracing::info!("Stored health assessment as {}", key);
        Ok(key)
    }

    /// Read one persisted submission back.
    pub async fn load(&self, key: impl AsRef<Path>) -> Result<PersistedSubmission, AppError> {
        let path = key.as_ref();
        let label = path.display().to_string();

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("Failed to read {}: {}", label, e)))?;

        serde_json::from_slice(&bytes).map_err(|e| AppError::MalformedRecord {
            key: label,
            message: e.to_string(),
        })
    }

    /// Paths of every persisted submission, sorted by file name.
    ///
    /// Fails with `StorageUnavailable` if the directory cannot be listed.
    pub async fn list(&self) -> Result<Vec<PathBuf>, AppError> {
        let unavailable = |e: std::io::Error| {
            AppError::StorageUnavailable(format!(
                "Failed to list {}: {}",
                self.dir.display(),
                e
            ))
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(unavailable)?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(FILE_PREFIX) {
                continue;
            }
            if !entry.file_type().await.map_err(unavailable)?.is_file() {
                continue;
            }
            paths.push(entry.path());
        }

        paths.sort();
        Ok(paths)
    }

    fn file_name(&self, now: DateTime<Utc>) -> String {
        match self.key_mode {
            StorageKeyMode::Timestamp => format!("{}{}.json", FILE_PREFIX, now.timestamp()),
            StorageKeyMode::Unique => format!(
                "{}{}_{}.json",
                FILE_PREFIX,
                now.timestamp(),
                Uuid::new_v4().simple()
            ),
        }
    }

    async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            AppError::StorageWriteFailed(format!(
                "Failed to create storage directory {}: {}",
                self.dir.display(),
                e
            ))
        })
    }
}
