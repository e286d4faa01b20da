//! Shared-folder storage layer for NukeChat
//!
//! The "database" is a directory on a shared filesystem holding four JSON
//! documents. Any client may rewrite any document at any moment, so every
//! read here degrades to an empty value on missing or unparseable content
//! instead of erroring - a reader can catch another process mid-write.

mod messages;
mod notifications;
mod presence;
mod settings;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

pub use messages::{apply_filter, FilterMode, Message, MessageStore};
pub use notifications::{DrainOutcome, Notification, NotificationStore};
pub use presence::{PresenceEntry, PresenceTracker};
pub use settings::SettingsStore;

/// Ordered sequence of all chat messages.
pub const MESSAGES_FILE: &str = "nukechat_messages.json";
/// Map of participant id to presence entry.
pub const PRESENCE_FILE: &str = "presence.json";
/// Map of recipient participant id to notification queue.
pub const NOTIFICATIONS_FILE: &str = "notifications.json";
/// Map of hostname to custom display name.
pub const CONFIG_FILE: &str = "config.json";
/// Legacy single-user settings, read-only and migrated into config.json.
pub const LEGACY_SETTINGS_FILE: &str = "nukechat_settings.json";

/// Handle to the shared network folder.
#[derive(Debug, Clone)]
pub struct SharedFolder {
    base: PathBuf,
}

impl SharedFolder {
    /// Open the shared folder, creating the directory if needed.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let base = path.into();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    pub fn messages_path(&self) -> PathBuf {
        self.base.join(MESSAGES_FILE)
    }

    pub fn presence_path(&self) -> PathBuf {
        self.base.join(PRESENCE_FILE)
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.base.join(NOTIFICATIONS_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join(CONFIG_FILE)
    }

    pub fn legacy_settings_path(&self) -> PathBuf {
        self.base.join(LEGACY_SETTINGS_FILE)
    }

    /// Get the message store
    pub fn messages(&self) -> MessageStore<'_> {
        MessageStore::new(self)
    }

    /// Get the presence tracker
    pub fn presence(&self) -> PresenceTracker<'_> {
        PresenceTracker::new(self)
    }

    /// Get the notification store
    pub fn notifications(&self) -> NotificationStore<'_> {
        NotificationStore::new(self)
    }

    /// Get the settings store
    pub fn settings(&self) -> SettingsStore<'_> {
        SettingsStore::new(self)
    }
}

/// Seconds since the unix epoch as a float, the timestamp unit shared by the
/// presence and notification files.
pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Read a JSON document, treating a missing, locked, or corrupt file as the
/// default value. Mid-write reads from other processes land here too.
pub(crate) fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "shared file unreadable, using default");
            return T::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "shared file unparseable, using default");
            T::default()
        }
    }
}

/// Write a JSON document with 4-space indentation (messages, config).
pub(crate) fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    fs::write(path, buf)?;
    Ok(())
}

/// Write a compact JSON document (presence, notifications).
pub(crate) fn write_json_compact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string(value)?;
    fs::write(path, text)?;
    Ok(())
}
