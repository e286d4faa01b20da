//! Client timer loop
//!
//! One cooperative loop per process drives the whole protocol: announce
//! every 5s, drain notifications every 3s, poll the message file every 1s,
//! check the clipboard every 1s. Commands from the hosting UI arrive on a
//! channel and are handled between ticks. Nothing here blocks longer than
//! a file read/write; the jittered message append runs on the blocking
//! pool inside `ChatClient::send`.

use std::time::Duration;

use nukechat_core::FilterMode;
use tokio::sync::mpsc::Receiver;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::client::ChatClient;
use crate::clipboard::ClipboardWatcher;

/// Timer cadences, configurable for tests and embedding hosts.
#[derive(Debug, Clone)]
pub struct Cadence {
    pub announce: Duration,
    pub drain: Duration,
    pub poll: Duration,
    pub clipboard: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            announce: Duration::from_secs(5),
            drain: Duration::from_secs(3),
            poll: Duration::from_secs(1),
            clipboard: Duration::from_secs(1),
        }
    }
}

/// Something the hosting UI asked the client to do.
#[derive(Debug, Clone)]
pub enum Command {
    /// Input line submitted; routed through clipboard-aware dispatch.
    Input(String),
    SetSearch(String),
    SetFilter(FilterMode),
    ClearSearch,
    SaveUsername(String),
    /// The messages tab was focused; clear the unread indicator.
    BadgeSeen,
    Shutdown,
}

/// Run the client loop until shutdown or the command channel closes.
pub async fn run(
    mut client: ChatClient,
    mut clipboard: ClipboardWatcher,
    mut commands: Receiver<Command>,
    cadence: Cadence,
) {
    let mut announce = interval(cadence.announce);
    let mut drain = interval(cadence.drain);
    let mut poll = interval(cadence.poll);
    let mut clip = interval(cadence.clipboard);
    for timer in [&mut announce, &mut drain, &mut poll, &mut clip] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }

    // The first announce tick fires immediately, covering the announce-at-
    // startup requirement; likewise the first poll creates the message file.
    loop {
        tokio::select! {
            _ = announce.tick() => client.tick_announce(),
            _ = drain.tick() => client.tick_drain(),
            _ = poll.tick() => client.tick_poll(),
            _ = clip.tick() => {
                let text = clipboard.read_text();
                client.tick_clipboard(text);
            }
            command = commands.recv() => match command {
                None | Some(Command::Shutdown) => break,
                Some(Command::Input(line)) => client.handle_send_action(&line).await,
                Some(Command::SetSearch(text)) => client.set_search(text),
                Some(Command::SetFilter(mode)) => client.set_filter(mode),
                Some(Command::ClearSearch) => client.clear_search(),
                Some(Command::SaveUsername(name)) => client.save_username(&name),
                Some(Command::BadgeSeen) => client.clear_badge(),
            }
        }
    }

    info!("client loop stopped");
}
