//! Clipboard access
//!
//! Thin wrapper over the system clipboard. On headless machines (render
//! nodes, CI) there is no clipboard to open; script sharing is simply
//! unavailable there and everything else keeps working.

use arboard::Clipboard;
use tracing::warn;

pub struct ClipboardWatcher {
    inner: Option<Clipboard>,
}

impl ClipboardWatcher {
    pub fn new() -> Self {
        let inner = match Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                warn!(error = %e, "clipboard unavailable, script sharing disabled");
                None
            }
        };
        Self { inner }
    }

    /// Current clipboard text, if any.
    pub fn read_text(&mut self) -> Option<String> {
        self.inner
            .as_mut()?
            .get_text()
            .ok()
            .filter(|text| !text.is_empty())
    }
}

impl Default for ClipboardWatcher {
    fn default() -> Self {
        Self::new()
    }
}
