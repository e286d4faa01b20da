//! Presence tracking over the shared folder
//!
//! Every client rewrites the whole presence map when it announces itself,
//! and that rewrite drops every entry older than the online window -
//! including entries left behind by crashed peers. Garbage collection is a
//! side effect of showing up.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity::Identity;
use crate::storage::{read_json_or_default, unix_now, write_json_compact, SharedFolder};

/// A participant is online while its entry is younger than this.
pub const ONLINE_WINDOW_SECS: f64 = 30.0;

/// One participant's liveness record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEntry {
    /// Display name, not participant id.
    pub user: String,
    /// Unix timestamp, float seconds.
    pub last_seen: f64,
}

type PresenceMap = BTreeMap<String, PresenceEntry>;

/// Presence operations on the shared folder.
pub struct PresenceTracker<'a> {
    folder: &'a SharedFolder,
}

impl<'a> PresenceTracker<'a> {
    pub fn new(folder: &'a SharedFolder) -> Self {
        Self { folder }
    }

    /// Announce this client and prune stale peers, rewriting the whole map.
    ///
    /// Called once at startup and every five seconds thereafter.
    pub fn announce(&self, identity: &Identity) -> Result<()> {
        let path = self.folder.presence_path();
        let mut map: PresenceMap = read_json_or_default(&path);

        let now = unix_now();
        map.insert(
            identity.participant_id().to_string(),
            PresenceEntry {
                user: identity.display_name(),
                last_seen: now,
            },
        );
        map.retain(|_, entry| now - entry.last_seen < ONLINE_WINDOW_SECS);

        write_json_compact(&path, &map)
    }

    /// Display names of everyone currently online, judged against the clock
    /// at call time. A stale entry another client has not yet pruned is
    /// filtered here even though it is still in the file.
    pub fn list_online(&self) -> Vec<String> {
        let map: PresenceMap = read_json_or_default(&self.folder.presence_path());
        let now = unix_now();
        let names: BTreeSet<String> = map
            .into_values()
            .filter(|entry| now - entry.last_seen < ONLINE_WINDOW_SECS)
            .map(|entry| entry.user)
            .collect();
        names.into_iter().collect()
    }

    /// Participant ids of everyone in the presence file except this client.
    /// Used to address notification fan-out.
    pub fn peer_ids(&self, identity: &Identity) -> Vec<String> {
        let map: PresenceMap = read_json_or_default(&self.folder.presence_path());
        map.into_keys()
            .filter(|id| id != identity.participant_id())
            .collect()
    }
}
