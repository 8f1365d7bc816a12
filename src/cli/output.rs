use console::{style, Color};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    use_colors: bool,
}

pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let message = message.to_string();

        let handle = thread::spawn(move || {
            let frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
            let mut frame_index = 0;
            let mut stderr = io::stderr();

            while running_clone.load(Ordering::Relaxed) {
                let _ = write!(stderr, "\r{} {}", frames[frame_index], message);
                let _ = stderr.flush();
                frame_index = (frame_index + 1) % frames.len();
                thread::sleep(Duration::from_millis(100));
            }

            // Clear the spinner line
            let _ = write!(stderr, "\r{}\r", " ".repeat(message.chars().count() + 3));
            let _ = stderr.flush();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Starts a spinner only when a person is watching stderr.
    pub fn attended(message: &str) -> Option<Self> {
        console::user_attended_stderr().then(|| Self::new(message))
    }

    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Spinner thread panicked");
            }
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.halt();
    }
}

impl OutputFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Colours only when stdout is a terminal.
    pub fn for_stdout() -> Self {
        Self::new(console::user_attended())
    }

    pub fn format_error(&self, message: &str) -> String {
        format!("{} {}", self.style_text("Error:", Color::Red), message)
    }

    pub fn format_success(&self, message: &str) -> String {
        format!("{} {}", self.style_text("✓", Color::Green), message)
    }

    pub fn format_warning(&self, message: &str) -> String {
        format!("{} {}", self.style_text("⚠", Color::Yellow), message)
    }

    pub fn format_info(&self, message: &str) -> String {
        format!("{} {}", self.style_text("ℹ", Color::Blue), message)
    }

    pub fn format_command(&self, command: &str) -> String {
        self.style_text(command, Color::Green)
    }

    pub fn format_status(&self, status: &str) -> String {
        if self.use_colors {
            style(status).dim().to_string()
        } else {
            status.to_string()
        }
    }

    fn style_text(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            style(text).fg(color).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_output_has_no_escapes() {
        let formatter = OutputFormatter::new(false);
        assert_eq!(formatter.format_error("boom"), "Error: boom");
        assert_eq!(formatter.format_command("ffmpeg -version"), "ffmpeg -version");
        assert_eq!(formatter.format_status("minimal | gpt-4o"), "minimal | gpt-4o");
    }

    #[test]
    fn spinner_stops_cleanly() {
        let spinner = Spinner::new("Thinking...");
        spinner.stop();
    }
}
