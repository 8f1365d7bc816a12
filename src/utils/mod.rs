pub mod clipboard;
pub mod shell;

pub use clipboard::{ClipboardSink, SystemClipboard};
pub use shell::{stream_command, ShellRunner, SystemShell};
