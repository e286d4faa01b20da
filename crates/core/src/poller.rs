//! Update polling for the shared message file
//!
//! There is no push channel, so each client watches the message file's
//! modification time on a one second cadence and reloads when it moves.
//! The count delta doubles as a self-observed "new messages" signal for
//! sessions whose participant id predates everyone else's notification
//! queues.

use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::error::Result;
use crate::storage::{write_json_pretty, Message, SharedFolder};

/// What one poll pass observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The message file was missing; an empty one was created.
    Created,
    /// Nothing changed since the last pass.
    Unchanged,
    /// The file was rewritten; the caller should reload and redisplay.
    Changed { old_count: usize, new_count: usize },
}

impl PollOutcome {
    /// How many messages arrived, zero unless the count actually grew.
    /// A rewrite that keeps the count flat (a recovered corrupt file, a
    /// pruning pass) advances the baseline without signalling anything.
    pub fn new_messages(&self) -> usize {
        match self {
            PollOutcome::Changed {
                old_count,
                new_count,
            } => new_count.saturating_sub(*old_count),
            _ => 0,
        }
    }
}

/// Watches the message file's mtime between passes.
#[derive(Debug, Default)]
pub struct UpdatePoller {
    /// Baseline mtime, unix float seconds. Zero means never observed.
    last_update: f64,
    /// Message count at the last observation.
    last_count: Option<usize>,
}

impl UpdatePoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one poll pass against the shared folder.
    pub fn poll(&mut self, folder: &SharedFolder) -> Result<PollOutcome> {
        let path = folder.messages_path();
        if !path.exists() {
            write_json_pretty(&path, &Vec::<Message>::new())?;
            self.last_update = file_mtime(&path).unwrap_or_default();
            self.last_count = Some(0);
            return Ok(PollOutcome::Created);
        }

        let mtime = file_mtime(&path)?;
        if mtime <= self.last_update {
            return Ok(PollOutcome::Unchanged);
        }

        let new_count = folder.messages().count();
        // First observation of a pre-existing file sets the baseline
        // without reporting its whole history as new.
        let old_count = self.last_count.unwrap_or(new_count);
        self.last_count = Some(new_count);
        self.last_update = mtime;

        Ok(PollOutcome::Changed {
            old_count,
            new_count,
        })
    }
}

fn file_mtime(path: &Path) -> Result<f64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default())
}
