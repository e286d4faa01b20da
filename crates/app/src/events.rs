//! UI event contract
//!
//! The protocol loop never draws anything; it emits these events on a
//! channel and the hosting panel decides how to render them. Toast display
//! and auto-dismiss are the consumer's job, on the durations given here.

use std::time::Duration;

use nukechat_core::Message;

/// Idle status line text.
pub const READY: &str = "Ready";
/// Transient statuses revert to [`READY`] after this long.
pub const STATUS_REVERT: Duration = Duration::from_secs(3);
/// Toasts auto-dismiss after this long.
pub const TOAST_DURATION: Duration = Duration::from_secs(5);

/// Something the hosting UI should show.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Status line text changed.
    Status(String),
    /// Unread indicator: tab reads "Messages (N new)".
    Badge { unread: usize },
    /// Unread indicator back to plain "Messages".
    BadgeCleared,
    /// Pop-up notification, auto-dismissed after [`TOAST_DURATION`].
    Toast { sender: String, body: String },
    /// The filtered message view to render, newest last.
    Messages(Vec<Message>),
    /// Messages observed by our own poll, not by the notification queue.
    NewMessages { count: usize },
    /// Display names currently online, refreshed on the announce cadence.
    Online(Vec<String>),
}
