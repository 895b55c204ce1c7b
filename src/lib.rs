//! A headless chat widget client.
//!
//! [`ChatClient`] posts user input to a chat server, renders replies as
//! sanitized Markdown, and tracks quick-reply options, progress, and a
//! single photo upload.  Display goes through a [`View`]; persistence goes
//! through a [`Storage`].

// Public modules
pub mod chat;
pub mod endpoint;
pub mod error;
pub mod markup;
pub mod observability;
pub mod render;
pub mod storage;
pub mod types;

// Re-exports
pub use chat::{ChatClient, ClientConfig, SendOutcome, UploadOutcome};
pub use endpoint::{ChatEndpoint, HttpEndpoint};
pub use error::{Error, Result};
pub use markup::{MarkupPipeline, SafeHtml};
pub use observability::register_biometrics;
pub use render::{MemoryView, TerminalView, View};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use types::*;
