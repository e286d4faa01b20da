//! Per-host username configuration
//!
//! config.json maps hostnames to custom display names so one shared file
//! serves every machine on the folder. The older single-user
//! nukechat_settings.json is still honored as a read-only fallback and
//! migrated forward on first load.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use crate::error::Result;
use crate::storage::{read_json_or_default, write_json_pretty, SharedFolder};

type ConfigMap = BTreeMap<String, String>;

/// Shape of the legacy settings file.
#[derive(Debug, Default, Deserialize)]
struct LegacySettings {
    #[serde(default)]
    username: Option<String>,
}

/// Settings operations on the shared folder.
pub struct SettingsStore<'a> {
    folder: &'a SharedFolder,
}

impl<'a> SettingsStore<'a> {
    pub fn new(folder: &'a SharedFolder) -> Self {
        Self { folder }
    }

    /// Load the custom username for a host, if one is set.
    ///
    /// Falls back to the legacy settings file when config.json does not
    /// exist yet, converting it to the new format as a side effect.
    pub fn load_username(&self, hostname: &str) -> Option<String> {
        let config_path = self.folder.config_path();
        if config_path.exists() {
            let config: ConfigMap = read_json_or_default(&config_path);
            return config.get(hostname).cloned().filter(|n| !n.is_empty());
        }

        let legacy: LegacySettings = read_json_or_default(&self.folder.legacy_settings_path());
        let name = legacy.username.filter(|n| !n.is_empty())?;
        if let Err(e) = self.save_username(hostname, &name) {
            warn!(error = %e, "could not migrate legacy settings");
        }
        Some(name)
    }

    /// Save the custom username for a host, preserving other hosts' entries.
    /// A corrupt config file is rebuilt from scratch.
    pub fn save_username(&self, hostname: &str, name: &str) -> Result<()> {
        let config_path = self.folder.config_path();
        let mut config: ConfigMap = read_json_or_default(&config_path);
        config.insert(hostname.to_string(), name.to_string());
        write_json_pretty(&config_path, &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let folder = SharedFolder::open(dir.path()).unwrap();

        folder.settings().save_username("ws42", "Alice").unwrap();

        assert_eq!(
            folder.settings().load_username("ws42"),
            Some("Alice".to_string())
        );
        assert_eq!(folder.settings().load_username("ws9"), None);
    }

    #[test]
    fn test_save_preserves_other_hosts() {
        let dir = tempdir().unwrap();
        let folder = SharedFolder::open(dir.path()).unwrap();

        folder.settings().save_username("ws1", "Alice").unwrap();
        folder.settings().save_username("ws2", "Bob").unwrap();

        assert_eq!(
            folder.settings().load_username("ws1"),
            Some("Alice".to_string())
        );
        assert_eq!(
            folder.settings().load_username("ws2"),
            Some("Bob".to_string())
        );
    }

    #[test]
    fn test_legacy_settings_migrated() {
        let dir = tempdir().unwrap();
        let folder = SharedFolder::open(dir.path()).unwrap();
        fs::write(
            folder.legacy_settings_path(),
            r#"{"username": "OldName"}"#,
        )
        .unwrap();

        let name = folder.settings().load_username("ws42");
        assert_eq!(name, Some("OldName".to_string()));

        // Migration wrote the new format; the legacy file is left alone.
        assert!(folder.config_path().exists());
        assert!(folder.legacy_settings_path().exists());
        let config: ConfigMap = read_json_or_default(&folder.config_path());
        assert_eq!(config["ws42"], "OldName");
    }

    #[test]
    fn test_config_takes_precedence_over_legacy() {
        let dir = tempdir().unwrap();
        let folder = SharedFolder::open(dir.path()).unwrap();
        fs::write(folder.legacy_settings_path(), r#"{"username": "Old"}"#).unwrap();
        folder.settings().save_username("ws42", "New").unwrap();

        assert_eq!(
            folder.settings().load_username("ws42"),
            Some("New".to_string())
        );
    }

    #[test]
    fn test_empty_username_reads_as_unset() {
        let dir = tempdir().unwrap();
        let folder = SharedFolder::open(dir.path()).unwrap();

        folder.settings().save_username("ws42", "").unwrap();

        assert_eq!(folder.settings().load_username("ws42"), None);
    }
}
