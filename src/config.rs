use serde::Deserialize;
use std::path::PathBuf;

use crate::stats::MalformedPolicy;
use crate::storage::StorageKeyMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Directory holding one JSON file per submission.
    pub data_dir: PathBuf,
    /// Pre-trained classifier artifact loaded at startup.
    pub model_path: PathBuf,
    /// Static assets served under `/public`.
    pub public_dir: PathBuf,
    /// Submissions allowed per client IP per hour. 0 disables the limit.
    pub rate_limit_per_hour: u64,
    pub storage_key_mode: StorageKeyMode,
    /// Skip unparseable files in `/api/stats` instead of failing the request.
    pub stats_skip_malformed: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            data_dir: path_var("DATA_DIR", "data")?,
            model_path: path_var("MODEL_PATH", "health_prediction_model.json")?,
            public_dir: path_var("PUBLIC_DIR", "public")?,
            rate_limit_per_hour: std::env::var("RATE_LIMIT_PER_HOUR")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("RATE_LIMIT_PER_HOUR must be a non-negative integer")
                })
                .and_then(|limit: u64| {
                    if limit > 3600 {
                        anyhow::bail!("RATE_LIMIT_PER_HOUR cannot exceed 3600");
                    }
                    Ok(limit)
                })?,
            storage_key_mode: std::env::var("STORAGE_KEY_MODE")
                .unwrap_or_else(|_| "timestamp".to_string())
                .parse()?,
            stats_skip_malformed: std::env::var("STATS_SKIP_MALFORMED")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
                .unwrap_or(false),
        };

        tracing::debug!("Data directory: {}", config.data_dir.display());
        tracing::debug!("Model path: {}", config.model_path.display());
        tracing::debug!("Storage key mode: {:?}", config.storage_key_mode);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn malformed_policy(&self) -> MalformedPolicy {
        if self.stats_skip_malformed {
            MalformedPolicy::Skip
        } else {
            MalformedPolicy::Abort
        }
    }
}

/// Reads a path variable, falling back to `default` when unset.
fn path_var(var: &str, default: &str) -> anyhow::Result<PathBuf> {
    let value = std::env::var(var).unwrap_or_else(|_| default.to_string());
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", var);
    }
    Ok(PathBuf::from(value))
}
