//! The chat widget and its terminal-facing helpers.
//!
//! - [`client`]: the `ChatClient` controller and its outcomes
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing for the REPL

mod client;
mod commands;
mod config;

pub use client::{ChatClient, PHOTO_URL_KEY, SendOutcome, UploadOutcome};
pub use commands::{ChatCommand, help_text, option_choice, parse_command};
pub use config::{
    BASE_URL_ENV, ChatArgs, ClientConfig, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_ERROR_MESSAGE,
    DEFAULT_GREETING, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_UPLOAD_FAILED_MESSAGE,
    DEFAULT_UPLOAD_SUCCEEDED_MESSAGE,
};
