//! NukeChat - shared-folder team chat
//!
//! Terminal client for the file-mediated chat protocol. Point it at the
//! network folder your team shares and type; lines are sent as messages,
//! slash commands drive search, filters, and the username setting. A panel
//! host embeds the same `ChatClient`/`scheduler` pair and renders the
//! `UiEvent` stream instead of logging it.

use std::path::PathBuf;

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nukechat_core::payload::{count_nodes, parse_body};
use nukechat_core::{FilterMode, Message, MessageBody, SharedFolder};

mod client;
mod clipboard;
mod events;
mod scheduler;

use client::ChatClient;
use clipboard::ClipboardWatcher;
use events::UiEvent;
use scheduler::{Cadence, Command};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let folder_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_folder);
    tracing::info!(folder = %folder_path.display(), "Starting NukeChat");

    let folder = match SharedFolder::open(&folder_path) {
        Ok(folder) => folder,
        Err(e) => {
            tracing::error!("Failed to open shared folder: {}", e);
            std::process::exit(1);
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::channel(32);

    let client = ChatClient::new(folder, event_tx);
    tracing::info!(
        user = %client.identity().display_name(),
        id = %client.identity().participant_id(),
        "Identity ready"
    );

    let loop_handle = tokio::spawn(scheduler::run(
        client,
        ClipboardWatcher::new(),
        cmd_rx,
        Cadence::default(),
    ));

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            render_event(event);
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_line(&line) {
            Some(Command::Shutdown) => {
                let _ = cmd_tx.send(Command::Shutdown).await;
                break;
            }
            Some(command) => {
                if cmd_tx.send(command).await.is_err() {
                    break;
                }
            }
            None => {}
        }
    }

    drop(cmd_tx);
    let _ = loop_handle.await;
    printer.abort();
}

/// Map a terminal input line to a client command.
fn parse_line(line: &str) -> Option<Command> {
    if let Some(rest) = line.strip_prefix("/name ") {
        return Some(Command::SaveUsername(rest.to_string()));
    }
    if let Some(rest) = line.strip_prefix("/search ") {
        return Some(Command::SetSearch(rest.to_string()));
    }
    if let Some(rest) = line.strip_prefix("/filter ") {
        let mode = match rest.trim() {
            "mine" => FilterMode::Mine,
            "others" => FilterMode::Others,
            _ => FilterMode::All,
        };
        return Some(Command::SetFilter(mode));
    }
    match line.trim() {
        "/quit" => Some(Command::Shutdown),
        "/clear" => Some(Command::ClearSearch),
        "/read" => Some(Command::BadgeSeen),
        "" => Some(Command::Input(String::new())),
        _ => Some(Command::Input(line.to_string())),
    }
}

fn render_event(event: UiEvent) {
    match event {
        UiEvent::Status(text) if text == events::READY => {}
        UiEvent::Status(text) => tracing::info!(status = %text),
        UiEvent::Messages(messages) => {
            if let Some(last) = messages.last() {
                tracing::info!(
                    total = messages.len(),
                    "[{}] {}: {}",
                    last.timestamp,
                    last.user,
                    render_body(last)
                );
            }
        }
        UiEvent::Toast { sender, body } => tracing::info!(%sender, %body, "toast"),
        UiEvent::NewMessages { count } => tracing::info!(count, "new messages"),
        UiEvent::Online(users) => tracing::debug!(?users, "online"),
        UiEvent::Badge { unread } => tracing::debug!(unread, "unread badge"),
        UiEvent::BadgeCleared => tracing::debug!("badge cleared"),
    }
}

/// One-line rendering of a message body. Envelope payloads show a summary
/// instead of their base64 blob; a broken envelope shows an inline error.
fn render_body(message: &Message) -> String {
    match parse_body(&message.message) {
        MessageBody::Plain => message.message.clone(),
        MessageBody::Script(payload) => match payload.description {
            Some(desc) => format!("[shared script \"{desc}\", {} nodes]", count_nodes(&payload.script)),
            None => format!("[shared script, {} nodes]", count_nodes(&payload.script)),
        },
        MessageBody::Expression(payload) => format!("[shared expression: {}]", payload.script),
        MessageBody::Undecodable(kind) => format!("[unreadable {} payload]", kind.label()),
    }
}

fn default_folder() -> PathBuf {
    directories::ProjectDirs::from("io", "nukechat", "nukechat")
        .map(|dirs| dirs.data_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("db"))
}
