//! Participant identity
//!
//! Two distinct names describe one running client. The participant id
//! (`hostname_1234`) is picked once per process and keys the presence and
//! notification maps, so two clients on the same machine stay separate.
//! The display name is what other people see and what message authorship
//! is compared against.

use rand::Rng;

/// Identity of this client process.
#[derive(Debug, Clone)]
pub struct Identity {
    hostname: String,
    participant_id: String,
    custom_username: Option<String>,
}

impl Identity {
    /// Build an identity for this machine with a fresh random suffix.
    pub fn new() -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        Self::with_hostname(hostname)
    }

    /// Build an identity for an explicit hostname (used in tests).
    pub fn with_hostname(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
        let participant_id = format!("{}_{}", hostname, suffix);
        Self {
            hostname,
            participant_id,
            custom_username: None,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Process-lifetime key used in the presence and notification files.
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn custom_username(&self) -> Option<&str> {
        self.custom_username.as_deref()
    }

    /// Set or clear the custom display name. Empty strings clear it.
    pub fn set_custom_username(&mut self, name: Option<String>) {
        self.custom_username = name.filter(|n| !n.trim().is_empty());
    }

    /// Human-readable name used for message authorship and presence display.
    ///
    /// `"{custom} - ({hostname})"` when a custom name is set, otherwise the
    /// bare hostname. Deliberately does not include the random suffix.
    pub fn display_name(&self) -> String {
        match &self.custom_username {
            Some(custom) => format!("{} - ({})", custom, self.hostname),
            None => self.hostname.clone(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}
