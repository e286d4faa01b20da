//! Chat client composition
//!
//! One `ChatClient` per host-application instance. It owns the shared
//! folder handle, this process's identity, the poll baseline, and the
//! current view state (search text, filter mode), and turns protocol
//! activity into [`UiEvent`]s. It holds no authority over global state -
//! whoever wrote a shared file last wins.

use nukechat_core::payload::wrap_script;
use nukechat_core::{
    apply_filter, ClassifierRegistry, FilterMode, Identity, PollOutcome, ScriptPayload,
    SharedFolder, UpdatePoller,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::events::{UiEvent, READY, STATUS_REVERT};

pub struct ChatClient {
    folder: SharedFolder,
    identity: Identity,
    registry: ClassifierRegistry,
    poller: UpdatePoller,
    search: String,
    filter: FilterMode,
    /// Clipboard text that last classified as a shareable script.
    clipboard_script: Option<String>,
    events: UnboundedSender<UiEvent>,
}

impl ChatClient {
    /// Build a client for this machine, loading any saved username.
    pub fn new(folder: SharedFolder, events: UnboundedSender<UiEvent>) -> Self {
        Self::with_identity(folder, Identity::new(), events)
    }

    /// Build a client with an explicit identity (tests, embedding hosts).
    pub fn with_identity(
        folder: SharedFolder,
        mut identity: Identity,
        events: UnboundedSender<UiEvent>,
    ) -> Self {
        let custom = folder.settings().load_username(identity.hostname());
        identity.set_custom_username(custom);
        Self {
            folder,
            identity,
            registry: ClassifierRegistry::default(),
            poller: UpdatePoller::new(),
            search: String::new(),
            filter: FilterMode::All,
            clipboard_script: None,
            events,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Display names of everyone currently online.
    pub fn online_users(&self) -> Vec<String> {
        self.folder.presence().list_online()
    }

    /// Route a just-submitted input line: an empty line with a recognized
    /// script on the clipboard shares the script, anything else goes out as
    /// a plain message.
    pub async fn handle_send_action(&mut self, input: &str) {
        if input.trim().is_empty() {
            if let Some(text) = self.clipboard_script.clone() {
                if let Some(payload) = self.registry.extract(&text) {
                    self.send_script(payload).await;
                }
            }
            return;
        }
        self.send(input).await;
    }

    /// Send a plain text message. Returns whether the append stuck.
    ///
    /// The append's collision jitter blocks, so it runs off the timer loop.
    pub async fn send(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.set_status("Sending Message...");

        let folder = self.folder.clone();
        let identity = self.identity.clone();
        let body = text.to_string();
        let saved = tokio::task::spawn_blocking(move || folder.messages().append(&identity, &body))
            .await
            .unwrap_or_else(|e| Err(std::io::Error::other(e).into()));

        match saved {
            Ok(()) => {
                self.set_status("Message Sent");
                if let Err(e) = self.folder.notifications().fan_out(&self.identity, text) {
                    self.set_status(format!("Error creating notification: {e}"));
                }
                self.refresh();
                true
            }
            Err(e) => {
                self.set_status(format!("Message Could Not Be Saved: {e}"));
                false
            }
        }
    }

    /// Send a script payload wrapped in its envelope.
    pub async fn send_script(&mut self, payload: ScriptPayload) -> bool {
        let message = match wrap_script(&payload) {
            Ok(m) => m,
            Err(e) => {
                self.set_status(format!("Error sending script message: {e}"));
                return false;
            }
        };
        if !self.send(&message).await {
            return false;
        }
        match payload.description.as_deref() {
            Some(desc) if !desc.is_empty() => {
                self.set_status(format!("Script fragment \"{desc}\" shared"));
            }
            _ => self.set_status("Script fragment shared"),
        }
        true
    }

    /// Reload from the shared file and emit the filtered view. An
    /// unreadable file degrades to an empty view behind a status message.
    pub fn refresh(&self) {
        let messages = match self.folder.messages().try_load() {
            Ok(messages) => messages,
            Err(e) => {
                self.set_status(format!("Error loading messages: {e}"));
                Vec::new()
            }
        };
        let filtered = apply_filter(
            &messages,
            &self.identity.display_name(),
            &self.search,
            self.filter,
        );
        self.emit(UiEvent::Messages(filtered));
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.refresh();
    }

    pub fn set_filter(&mut self, mode: FilterMode) {
        self.filter = mode;
        self.refresh();
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
        self.filter = FilterMode::All;
        self.refresh();
    }

    /// Persist a new custom username for this host and adopt it.
    pub fn save_username(&mut self, name: &str) {
        let name = name.trim();
        match self
            .folder
            .settings()
            .save_username(self.identity.hostname(), name)
        {
            Ok(()) => {
                self.identity.set_custom_username(Some(name.to_string()));
                self.set_status("Username saved");
            }
            Err(e) => self.set_status(format!("Could not save settings: {e}")),
        }
    }

    /// 5s cadence: announce liveness, pruning stale peers as a side effect,
    /// and refresh the online-users view.
    pub fn tick_announce(&self) {
        if let Err(e) = self.folder.presence().announce(&self.identity) {
            self.set_status(format!("Presence Error: {e}"));
        }
        self.emit(UiEvent::Online(self.online_users()));
    }

    /// 3s cadence: drain our notification queue and surface what was there.
    pub fn tick_drain(&self) {
        let outcome = match self.folder.notifications().drain_own(&self.identity) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.set_status(format!("Error checking notifications: {e}"));
                return;
            }
        };
        if outcome.unread == 0 {
            return;
        }
        self.emit(UiEvent::Badge {
            unread: outcome.unread,
        });
        let Some(first) = outcome.first else { return };
        if outcome.unread == 1 {
            self.set_status(format!("New message: {}: {}", first.sender, first.message));
            self.emit(UiEvent::Toast {
                sender: first.sender,
                body: first.message,
            });
        } else {
            self.set_status(format!("{} new messages!", outcome.unread));
            let body = format!(
                "{}\n\n... and {} more messages",
                first.message,
                outcome.unread - 1
            );
            self.emit(UiEvent::Toast {
                sender: first.sender,
                body,
            });
        }
    }

    /// 1s cadence: watch the message file and reload on change.
    pub fn tick_poll(&mut self) {
        match self.poller.poll(&self.folder) {
            Ok(outcome @ PollOutcome::Changed { .. }) => {
                self.refresh();
                let fresh = outcome.new_messages();
                if fresh > 0 {
                    self.emit(UiEvent::NewMessages { count: fresh });
                    self.emit(UiEvent::Badge { unread: fresh });
                    self.set_status(format!("{fresh} new messages!"));
                } else {
                    self.set_status("Messages Updated");
                }
            }
            Ok(PollOutcome::Created) | Ok(PollOutcome::Unchanged) => {}
            Err(e) => self.set_status(format!("Update Error: {e}")),
        }
    }

    /// 1s cadence: classify the clipboard and hint when a script is ready
    /// to share with a bare Enter.
    pub fn tick_clipboard(&mut self, text: Option<String>) {
        let hit = text
            .as_deref()
            .map(|t| self.registry.classify(t))
            .unwrap_or(false);
        let had = self.clipboard_script.is_some();
        self.clipboard_script = if hit { text } else { None };

        if hit && !had {
            // Hint stays up while the script is on the clipboard.
            self.emit(UiEvent::Status(
                "Press Enter to share the copied script".to_string(),
            ));
        } else if !hit && had {
            self.emit(UiEvent::Status(READY.to_string()));
        }
    }

    /// The messages tab was focused; unread indicator resets.
    pub fn clear_badge(&self) {
        self.emit(UiEvent::BadgeCleared);
        self.emit(UiEvent::Status(READY.to_string()));
    }

    /// Emit a transient status and schedule the revert to "Ready".
    fn set_status(&self, text: impl Into<String>) {
        self.emit(UiEvent::Status(text.into()));
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let events = self.events.clone();
            handle.spawn(async move {
                tokio::time::sleep(STATUS_REVERT).await;
                let _ = events.send(UiEvent::Status(READY.to_string()));
            });
        }
    }

    fn emit(&self, event: UiEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nukechat_core::Message;
    use tempfile::tempdir;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn test_client(dir: &std::path::Path) -> (ChatClient, UnboundedReceiver<UiEvent>) {
        let folder = SharedFolder::open(dir).unwrap();
        let (tx, rx) = unbounded_channel();
        let client = ChatClient::with_identity(folder, Identity::with_hostname("ws42"), tx);
        (client, rx)
    }

    fn drain_events(rx: &mut UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_send_appends_and_refreshes() {
        let dir = tempdir().unwrap();
        let (mut client, mut rx) = test_client(dir.path());

        assert!(client.send("hello").await);

        let events = drain_events(&mut rx);
        let view = events.iter().find_map(|e| match e {
            UiEvent::Messages(m) => Some(m.clone()),
            _ => None,
        });
        let view = view.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].message, "hello");
        assert_eq!(view[0].user, "ws42");
    }

    #[tokio::test]
    async fn test_send_blank_is_ignored() {
        let dir = tempdir().unwrap();
        let (mut client, mut rx) = test_client(dir.path());

        assert!(!client.send("   ").await);
        assert!(drain_events(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_with_script_clipboard_shares_script() {
        let dir = tempdir().unwrap();
        let (mut client, mut rx) = test_client(dir.path());

        let script = "set cut_paste_input [stack 0]\nBlur {\n xpos 1\n ypos 2\n}";
        client.tick_clipboard(Some(script.to_string()));
        client.handle_send_action("").await;

        let events = drain_events(&mut rx);
        let view = events
            .iter()
            .rev()
            .find_map(|e| match e {
                UiEvent::Messages(m) => Some(m.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(view.len(), 1);
        assert!(view[0].message.starts_with("[SCRIPT_DATA]"));
    }

    #[tokio::test]
    async fn test_empty_input_without_script_sends_nothing() {
        let dir = tempdir().unwrap();
        let (mut client, mut rx) = test_client(dir.path());

        client.tick_clipboard(Some("just some prose".to_string()));
        client.handle_send_action("").await;

        let events = drain_events(&mut rx);
        assert!(!events
            .iter()
            .any(|e| matches!(e, UiEvent::Messages(m) if !m.is_empty())));
    }

    #[tokio::test]
    async fn test_clipboard_hint_transitions() {
        let dir = tempdir().unwrap();
        let (mut client, mut rx) = test_client(dir.path());
        let script = "set cut_paste_input [stack 0]\nGrade {\n xpos 1\n ypos 2\n}";

        client.tick_clipboard(Some(script.to_string()));
        client.tick_clipboard(Some(script.to_string()));
        client.tick_clipboard(None);

        let statuses: Vec<String> = drain_events(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Status(s) => Some(s),
                _ => None,
            })
            .collect();
        // One hint while the script sits on the clipboard, one reset after.
        assert_eq!(
            statuses,
            vec![
                "Press Enter to share the copied script".to_string(),
                READY.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_poll_reports_peer_appends() {
        let dir = tempdir().unwrap();
        let (mut client, mut rx) = test_client(dir.path());
        let peer_folder = SharedFolder::open(dir.path()).unwrap();
        let peer = Identity::with_hostname("ws9");

        client.tick_poll();
        drain_events(&mut rx);

        std::thread::sleep(std::time::Duration::from_millis(20));
        peer_folder.messages().append(&peer, "ping").unwrap();
        client.tick_poll();

        let events = drain_events(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::NewMessages { count: 1 })));
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::Messages(m) if m.len() == 1)));
    }

    #[tokio::test]
    async fn test_corrupt_message_file_degrades_with_status() {
        let dir = tempdir().unwrap();
        let (client, mut rx) = test_client(dir.path());
        std::fs::write(dir.path().join("nukechat_messages.json"), "{ broken").unwrap();

        client.refresh();

        let events = drain_events(&mut rx);
        assert!(events.iter().any(
            |e| matches!(e, UiEvent::Status(s) if s.starts_with("Error loading messages"))
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::Messages(m) if m.is_empty())));
    }

    #[tokio::test]
    async fn test_announce_publishes_online_users() {
        let dir = tempdir().unwrap();
        let (client, mut rx) = test_client(dir.path());
        let peer_folder = SharedFolder::open(dir.path()).unwrap();
        let peer = Identity::with_hostname("ws9");
        peer_folder.presence().announce(&peer).unwrap();

        client.tick_announce();

        let events = drain_events(&mut rx);
        let online = events
            .iter()
            .find_map(|e| match e {
                UiEvent::Online(users) => Some(users.clone()),
                _ => None,
            })
            .unwrap();
        assert!(online.contains(&"ws42".to_string()));
        assert!(online.contains(&"ws9".to_string()));
    }

    #[tokio::test]
    async fn test_filter_view_follows_search() {
        let dir = tempdir().unwrap();
        let (mut client, mut rx) = test_client(dir.path());

        client.send("render done").await;
        client.send("lunch?").await;
        drain_events(&mut rx);

        client.set_search("RENDER");
        let events = drain_events(&mut rx);
        let view = events
            .iter()
            .find_map(|e| match e {
                UiEvent::Messages(m) => Some(m.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].message, "render done");
    }

    #[tokio::test]
    async fn test_save_username_changes_authorship() {
        let dir = tempdir().unwrap();
        let (mut client, mut rx) = test_client(dir.path());

        client.save_username("Alice");
        client.send("hi").await;

        let events = drain_events(&mut rx);
        let view = events
            .iter()
            .find_map(|e| match e {
                UiEvent::Messages(m) => Some(m.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(view[0].user, "Alice - (ws42)");
    }

    #[tokio::test]
    async fn test_username_survives_restart() {
        let dir = tempdir().unwrap();
        let (mut client, _rx) = test_client(dir.path());
        client.save_username("Alice");

        // A new client on the same host picks the name up from config.json.
        let (client2, _rx2) = test_client(dir.path());
        assert_eq!(client2.identity().display_name(), "Alice - (ws42)");
    }

    #[tokio::test]
    async fn test_drain_badges_and_toasts() {
        let dir = tempdir().unwrap();
        let (client, mut rx) = test_client(dir.path());
        let sender_folder = SharedFolder::open(dir.path()).unwrap();
        let mut sender = Identity::with_hostname("ws9");
        sender.set_custom_username(Some("Bob".to_string()));

        client.tick_announce();
        sender_folder.presence().announce(&sender).unwrap();
        sender_folder.notifications().fan_out(&sender, "psst").unwrap();

        client.tick_drain();
        let events = drain_events(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::Badge { unread: 1 })));
        assert!(events.iter().any(
            |e| matches!(e, UiEvent::Toast { sender, body } if sender == "Bob - (ws9)" && body == "psst")
        ));

        // Queue was marked read; nothing more to surface.
        client.tick_drain();
        let events = drain_events(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, UiEvent::Badge { .. })));
    }

    #[tokio::test]
    async fn test_drain_summarizes_multiple_unread() {
        let dir = tempdir().unwrap();
        let (client, mut rx) = test_client(dir.path());
        let sender_folder = SharedFolder::open(dir.path()).unwrap();
        let sender = Identity::with_hostname("ws9");

        client.tick_announce();
        sender_folder.presence().announce(&sender).unwrap();
        sender_folder.notifications().fan_out(&sender, "one").unwrap();
        sender_folder.notifications().fan_out(&sender, "two").unwrap();
        sender_folder
            .notifications()
            .fan_out(&sender, "three")
            .unwrap();

        client.tick_drain();
        let events = drain_events(&mut rx);
        let toast_body = events
            .iter()
            .find_map(|e| match e {
                UiEvent::Toast { body, .. } => Some(body.clone()),
                _ => None,
            })
            .unwrap();
        assert!(toast_body.starts_with("one"));
        assert!(toast_body.contains("... and 2 more messages"));
    }

    #[tokio::test]
    async fn test_undecodable_envelope_still_listed() {
        let dir = tempdir().unwrap();
        let (client, mut rx) = test_client(dir.path());
        let peer_folder = SharedFolder::open(dir.path()).unwrap();
        let peer = Identity::with_hostname("ws9");

        peer_folder
            .messages()
            .append(&peer, "[SCRIPT_DATA]garbage[/SCRIPT_DATA]")
            .unwrap();

        client.refresh();
        let events = drain_events(&mut rx);
        let view = events
            .iter()
            .find_map(|e| match e {
                UiEvent::Messages(m) => Some(m.clone()),
                _ => None,
            })
            .unwrap();
        // The broken envelope reaches the view; rendering it as an inline
        // error is the consumer's call via parse_body.
        assert_eq!(view.len(), 1);
        assert!(matches!(
            nukechat_core::payload::parse_body(&view[0].message),
            nukechat_core::MessageBody::Undecodable(_)
        ));
    }

    #[tokio::test]
    async fn test_message_partition_across_two_clients() {
        let dir = tempdir().unwrap();
        let (mut alice, mut rx) = test_client(dir.path());
        let folder = SharedFolder::open(dir.path()).unwrap();
        let (tx2, _rx2) = unbounded_channel();
        let mut bob =
            ChatClient::with_identity(folder, Identity::with_hostname("ws9"), tx2);

        alice.send("from alice").await;
        bob.send("from bob").await;

        alice.set_filter(FilterMode::Mine);
        let mine: Vec<Message> = drain_events(&mut rx)
            .into_iter()
            .rev()
            .find_map(|e| match e {
                UiEvent::Messages(m) => Some(m),
                _ => None,
            })
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user, "ws42");

        alice.set_filter(FilterMode::Others);
        let others: Vec<Message> = drain_events(&mut rx)
            .into_iter()
            .rev()
            .find_map(|e| match e {
                UiEvent::Messages(m) => Some(m),
                _ => None,
            })
            .unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].user, "ws9");
    }
}
