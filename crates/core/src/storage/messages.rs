//! Message store client
//!
//! Appending is a read-whole / mutate / write-whole cycle with no lock, so
//! two clients sending at the same moment can race and the later write wins,
//! silently dropping the earlier append. That lost-update window is an
//! accepted property of the design (see the race test below); the randomized
//! pre-write jitter only narrows it.

use std::fs;
use std::ops::Range;
use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::Local;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::storage::{read_json_or_default, write_json_pretty, SharedFolder};

/// Retry budget for one send.
pub const SAVE_ATTEMPTS: u32 = 5;
/// Sleep drawn before every write attempt, in seconds.
const PRE_WRITE_JITTER_SECS: Range<f64> = 0.1..0.5;
/// Sleep drawn between failed attempts, in seconds.
const RETRY_BACKOFF_SECS: Range<f64> = 0.5..1.0;

/// A chat message as stored in the shared file.
///
/// No id; ordering and identity are positional within the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub user: String,
    pub message: String,
    pub timestamp: String,
}

impl Message {
    /// Build a message stamped with the local wall clock.
    pub fn new(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            message: text.into(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Which messages to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    All,
    Mine,
    Others,
}

/// Filter a message list by ownership and case-insensitive substring search.
///
/// Ownership compares the author against the display name, not the
/// participant id, so two clients sharing a display name see each other's
/// messages as their own. Order is preserved.
pub fn apply_filter(
    messages: &[Message],
    current_user: &str,
    search: &str,
    mode: FilterMode,
) -> Vec<Message> {
    let needle = search.to_lowercase();
    messages
        .iter()
        .filter(|msg| match mode {
            FilterMode::All => true,
            FilterMode::Mine => msg.user == current_user,
            FilterMode::Others => msg.user != current_user,
        })
        .filter(|msg| needle.is_empty() || msg.message.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Message store operations on the shared folder.
pub struct MessageStore<'a> {
    folder: &'a SharedFolder,
}

impl<'a> MessageStore<'a> {
    pub fn new(folder: &'a SharedFolder) -> Self {
        Self { folder }
    }

    /// Load the full message list. Never fails: a missing or corrupt file
    /// reads as an empty list.
    pub fn load(&self) -> Vec<Message> {
        self.try_load().unwrap_or_else(|e| {
            debug!(error = %e, "message file unreadable, using empty list");
            Vec::new()
        })
    }

    /// Load, surfacing unreadable content. A missing file is an ordinary
    /// empty list; a corrupt or unreadable one is `Err` for callers that
    /// want to tell the user before degrading.
    pub fn try_load(&self) -> Result<Vec<Message>> {
        let text = match fs::read_to_string(self.folder.messages_path()) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// Number of messages currently readable from the file.
    pub fn count(&self) -> usize {
        self.load().len()
    }

    /// Append a message, retrying on write failure.
    ///
    /// Each attempt sleeps a random 0.1-0.5s before touching the file to
    /// spread concurrent senders apart, and failed attempts back off a
    /// random 0.5-1.0s. Blocks the calling thread for the duration.
    pub fn append(&self, identity: &Identity, text: &str) -> Result<()> {
        let path = self.folder.messages_path();
        let mut attempt = 0;
        loop {
            attempt += 1;
            thread::sleep(random_delay(PRE_WRITE_JITTER_SECS));
            match self.try_append(&path, identity, text) {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= SAVE_ATTEMPTS => {
                    return Err(Error::SaveExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "message save failed, retrying");
                    thread::sleep(random_delay(RETRY_BACKOFF_SECS));
                }
            }
        }
    }

    fn try_append(&self, path: &Path, identity: &Identity, text: &str) -> Result<()> {
        let mut messages: Vec<Message> = read_json_or_default(path);
        messages.push(Message::new(identity.display_name(), text));
        write_json_pretty(path, &messages)
    }
}

fn random_delay(range: Range<f64>) -> Duration {
    Duration::from_secs_f64(rand::thread_rng().gen_range(range))
}
