//! Notification fan-out and drain
//!
//! A sender writes one unread entry into every other present participant's
//! queue in a single whole-file write. Each participant drains only its own
//! queue and marks it read in place; nobody ever deletes another's entries.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity::Identity;
use crate::storage::{read_json_or_default, unix_now, write_json_compact, SharedFolder};

use std::collections::BTreeMap;

/// Notification previews are cut to this many characters.
pub const PREVIEW_LIMIT: usize = 50;

/// One unread-message notice addressed to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unix timestamp, float seconds.
    pub timestamp: f64,
    /// Sender display name.
    pub sender: String,
    /// Truncated message preview.
    pub message: String,
    pub read: bool,
}

type NotificationMap = BTreeMap<String, Vec<Notification>>;

/// What a drain pass found in this participant's queue.
#[derive(Debug, Clone, Default)]
pub struct DrainOutcome {
    /// How many entries were unread before the pass marked them.
    pub unread: usize,
    /// The oldest unread entry, for toast display.
    pub first: Option<Notification>,
}

/// Notification operations on the shared folder.
pub struct NotificationStore<'a> {
    folder: &'a SharedFolder,
}

impl<'a> NotificationStore<'a> {
    pub fn new(folder: &'a SharedFolder) -> Self {
        Self { folder }
    }

    /// Fan a just-sent message out to every other present participant.
    ///
    /// One queue entry per recipient, all merged into a single file write.
    pub fn fan_out(&self, identity: &Identity, text: &str) -> Result<()> {
        let recipients = self.folder.presence().peer_ids(identity);

        let path = self.folder.notifications_path();
        let mut map: NotificationMap = read_json_or_default(&path);

        let now = unix_now();
        let sender = identity.display_name();
        let preview = truncate_preview(text);
        for recipient in recipients {
            map.entry(recipient).or_default().push(Notification {
                timestamp: now,
                sender: sender.clone(),
                message: preview.clone(),
                read: false,
            });
        }

        write_json_compact(&path, &map)
    }

    /// Check this participant's queue; if anything is unread, mark the whole
    /// queue read and rewrite the file.
    ///
    /// Returns what was unread so the caller can badge and toast. A second
    /// call right after a non-empty drain finds nothing.
    pub fn drain_own(&self, identity: &Identity) -> Result<DrainOutcome> {
        let path = self.folder.notifications_path();
        let mut map: NotificationMap = read_json_or_default(&path);

        let Some(queue) = map.get_mut(identity.participant_id()) else {
            return Ok(DrainOutcome::default());
        };

        let unread = queue.iter().filter(|n| !n.read).count();
        if unread == 0 {
            return Ok(DrainOutcome::default());
        }
        let first = queue.iter().find(|n| !n.read).cloned();

        // Everything in the queue flips to read, not just what we toast.
        for notification in queue.iter_mut() {
            notification.read = true;
        }
        write_json_compact(&path, &map)?;

        Ok(DrainOutcome { unread, first })
    }
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_LIMIT {
        let cut: String = text.chars().take(PREVIEW_LIMIT).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
