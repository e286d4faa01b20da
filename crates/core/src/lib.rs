//! NukeChat Core Library
//!
//! File-mediated chat synchronization for clients on a shared folder.
//! Every piece of shared state - messages, presence, notifications, per-host
//! settings - lives in a JSON document that each client reads and rewrites
//! wholesale. There is no server and no locking; the last writer wins, and
//! every reader tolerates a missing or half-written file by treating it as
//! empty.

pub mod error;
pub mod identity;
pub mod payload;
pub mod poller;
pub mod storage;

pub use error::{Error, Result};
pub use identity::Identity;
pub use payload::{
    ClassifierRegistry, MessageBody, NukeScriptClassifier, PayloadClassifier, ScriptPayload,
};
pub use poller::{PollOutcome, UpdatePoller};
pub use storage::{
    apply_filter, DrainOutcome, FilterMode, Message, MessageStore, Notification,
    NotificationStore, PresenceEntry, PresenceTracker, SettingsStore, SharedFolder,
};
