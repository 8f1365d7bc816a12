pub mod commands;
pub mod editor;
pub mod session;
pub mod transcript;

pub use commands::{dispatch, CommandContext, Effect};
pub use editor::{Bindings, LineReader, ReadOutcome, RustylineReader};
pub use session::{classify, generate, Collaborators, Generation, LineKind, Session};
pub use transcript::Transcript;
