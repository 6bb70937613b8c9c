//! Utility to inspect the submission store and report unreadable files.
//!
//! `/api/stats` fails as a whole when a single file is malformed; this tool
//! lists every file with its status so the bad ones can be found. It never
//! modifies the store.

use dotenvy::dotenv;
use health_assessment_api::errors::AppError;
use health_assessment_api::storage::{StorageKeyMode, SubmissionStore};
use std::env;

/// Main entry point for the store inspection utility.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
    if !std::path::Path::new(&data_dir).is_dir() {
        println!("No submission store at {}", data_dir);
        return Ok(());
    }
    let store = SubmissionStore::open(&data_dir, StorageKeyMode::default()).await?;

    let files = store.list().await?;
    println!("Found {} submission file(s) in {}", files.len(), data_dir);

    let mut malformed = 0;
    for path in &files {
        match store.load(path).await {
            Ok(submission) => println!(
                "OK         {}  risk={}  submitted={}",
                path.display(),
                submission.health_report.overall_risk_level,
                submission.record.submission_timestamp
            ),
            Err(AppError::MalformedRecord { key, message }) => {
                malformed += 1;
                println!("MALFORMED  {}  {}", key, message);
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    println!(
        "{} readable, {} malformed",
        files.len() - malformed,
        malformed
    );

    Ok(())
}
