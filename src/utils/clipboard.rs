use anyhow::{Context, Result};
use arboard::Clipboard;
use log::debug;

/// Destination for generated commands. Best effort: callers warn on error.
pub trait ClipboardSink {
    fn copy(&mut self, text: &str) -> Result<()>;
}

/// The desktop clipboard, opened on first use so headless sessions that
/// never copy don't pay for it.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardSink for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        let clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new().context("Clipboard is not available")?,
        };
        let clipboard = self.inner.insert(clipboard);
        clipboard
            .set_text(text)
            .context("Failed to copy to clipboard")?;
        debug!("Copied {} bytes to clipboard", text.len());
        Ok(())
    }
}
