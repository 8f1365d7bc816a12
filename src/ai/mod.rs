pub mod backend;
pub mod client;
pub mod message;
pub mod response;

pub use backend::{BackendFactory, ChatBackend, Completion, Usage};
pub use client::{HttpBackendFactory, OpenAiClient};
pub use message::{ChatMessage, Role};
pub use response::{extract_command, shell_escape_form};
