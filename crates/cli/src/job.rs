//! Job files handed to `finisher process`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use finisher_core::{Item, ItemMetadata};

/// Items to post-process in one run.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub items: Vec<JobItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobItem {
    pub item: Item,
    #[serde(default)]
    pub metadata: ItemMetadata,
    /// The file was already on disk; skip the stages and only record it.
    #[serde(default)]
    pub already_exists: bool,
}

/// What a run did, printed as JSON when it finishes.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub processed: usize,
    pub already_existed: usize,
    pub failed: Vec<FailedItem>,
    pub manifests_written: usize,
}

#[derive(Debug, Serialize)]
pub struct FailedItem {
    pub local_id: String,
    pub error: String,
}

pub fn load_job(path: &Path) -> Result<Job> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file {:?}", path))?;
    serde_json::from_str(&data).with_context(|| format!("Invalid job file {:?}", path))
}
