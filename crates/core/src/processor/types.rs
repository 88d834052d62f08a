//! Types for the processor module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PostProcessError;

/// Where an item is in the post-processing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Converting,
    Embedding,
    ThumbnailEmbedding,
    Stripping,
    Done,
    Failed,
}

impl ItemState {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Converting => 1,
            Self::Embedding => 2,
            Self::ThumbnailEmbedding => 3,
            Self::Stripping => 4,
            Self::Done | Self::Failed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// States only move forward. `Done` and `Failed` are reachable from any
    /// non-terminal state, so optional stages may be skipped.
    pub fn can_transition_to(self, next: ItemState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.is_terminal() || next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Converting => "converting",
            Self::Embedding => "embedding",
            Self::ThumbnailEmbedding => "thumbnail_embedding",
            Self::Stripping => "stripping",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one item through the state machine.
#[derive(Debug, Clone)]
pub struct ItemProgress {
    pub local_id: String,
    state: ItemState,
}

impl ItemProgress {
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            state: ItemState::Pending,
        }
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn advance(&mut self, next: ItemState) -> Result<(), PostProcessError> {
        if !self.state.can_transition_to(next) {
            return Err(PostProcessError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!("Item {} {} -> {}", self.local_id, self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Result of post-processing one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub local_id: String,
    pub item_id: String,
    pub state: ItemState,
    /// Whether this item completed its playlist and the manifest was written.
    pub manifest_written: bool,
    pub finished_at: DateTime<Utc>,
}
