//! Stub stages for driving the post-processor.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::PostProcessError;
use crate::item::{Item, ItemMetadata};
use crate::stage::Stage;

/// Counts calls and succeeds.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    calls: AtomicUsize,
}

impl RecordingStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, _item: &Item, _metadata: &ItemMetadata) -> Result<(), PostProcessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Always fails with a corrupt-input error.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
}

impl FailingStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, item: &Item, _metadata: &ItemMetadata) -> Result<(), PostProcessError> {
        Err(PostProcessError::corrupt_input(
            &item.file_path,
            format!("{} failed", self.name),
        ))
    }
}
