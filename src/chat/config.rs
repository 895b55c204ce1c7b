//! Configuration types for the chat widget.
//!
//! Values come from three layers: built-in defaults, an optional YAML file,
//! and command-line arguments parsed via `arrrg`.  Later layers win.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::Deserialize;
use url::Url;

use crate::endpoint::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};

/// Environment variable consulted for the base URL when no other layer sets it.
pub const BASE_URL_ENV: &str = "CHATWIDGET_BASE_URL";

/// Message sent automatically when the widget starts.
pub const DEFAULT_GREETING: &str = "Hi";

/// Bot message shown when a chat turn fails.
pub const DEFAULT_ERROR_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

/// Bot message shown when a photo upload fails.
pub const DEFAULT_UPLOAD_FAILED_MESSAGE: &str = "Failed to upload photo. Please try again.";

/// Bot message shown when a photo upload succeeds.
pub const DEFAULT_UPLOAD_SUCCEEDED_MESSAGE: &str = "Photo uploaded successfully!";

/// Largest photo accepted for upload.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Photo extensions accepted for upload.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Command-line arguments for the chatwidget tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// YAML configuration file.
    #[arrrg(optional, "Path to a YAML config file", "FILE")]
    pub config: Option<String>,

    /// Base URL of the chat server.
    #[arrrg(optional, "Chat server base URL (default: http://127.0.0.1:5000/)", "URL")]
    pub base_url: Option<String>,

    /// Where session state is kept.
    #[arrrg(optional, "Storage file (default: ~/.chatwidget/storage.json)", "FILE")]
    pub storage: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// First message sent on startup.
    #[arrrg(optional, "Greeting sent on startup (default: Hi)", "TEXT")]
    pub greeting: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Resolved configuration for a [`ChatClient`](super::ChatClient) and its endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the chat server.
    pub base_url: String,

    /// Chat route relative to the base URL; `None` uses the default.
    pub chat_path: Option<String>,

    /// Upload route relative to the base URL; `None` uses the default.
    pub upload_path: Option<String>,

    /// Transport timeout for every request.
    pub timeout: Duration,

    /// Message sent by `start`.
    pub greeting: String,

    /// Bot message for a failed turn.
    pub error_message: String,

    /// Bot message for a failed upload.
    pub upload_failed_message: String,

    /// Bot message for a stored upload.
    pub upload_succeeded_message: String,

    /// Lower-case photo extensions accepted for upload.
    pub allowed_extensions: Vec<String>,

    /// Largest photo accepted for upload, in bytes.
    pub max_upload_bytes: u64,

    /// Storage file; `None` means the per-user default.
    pub storage_path: Option<PathBuf>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ClientConfig {
    /// Creates a new ClientConfig with default values.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_path: None,
            upload_path: None,
            timeout: DEFAULT_TIMEOUT,
            greeting: DEFAULT_GREETING.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            upload_failed_message: DEFAULT_UPLOAD_FAILED_MESSAGE.to_string(),
            upload_succeeded_message: DEFAULT_UPLOAD_SUCCEEDED_MESSAGE.to_string(),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            storage_path: None,
            use_color: true,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the chat and upload routes.
    pub fn with_paths(mut self, chat_path: Option<String>, upload_path: Option<String>) -> Self {
        self.chat_path = chat_path;
        self.upload_path = upload_path;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the startup greeting.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Sets the accepted photo extensions.  They are compared lower-case.
    pub fn with_allowed_extensions<S: AsRef<str>>(
        mut self,
        extensions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Sets the largest accepted photo.
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Sets the storage file.
    pub fn with_storage_path(mut self, path: Option<PathBuf>) -> Self {
        self.storage_path = path;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Parse a YAML document and layer it over the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: FileConfig = serde_yaml::from_str(yaml)?;
        let config = Self::new().with_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file and layer it over the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::from_yaml_str(&yaml)
    }

    /// Resolve the configuration for `args`, consulting the environment for
    /// the base URL when neither the file nor the arguments name one.
    pub fn from_args(args: &ChatArgs) -> Result<Self> {
        Self::resolve(args, std::env::var(BASE_URL_ENV).ok())
    }

    fn resolve(args: &ChatArgs, env_base_url: Option<String>) -> Result<Self> {
        let mut config = Self::new();
        let mut base_url_set = false;
        if let Some(path) = &args.config {
            let yaml = fs::read_to_string(path)
                .map_err(|err| Error::io(format!("failed to read {path}"), err))?;
            let file: FileConfig = serde_yaml::from_str(&yaml)?;
            base_url_set = file.app.base_url.is_some();
            config = config.with_file(file);
        }
        if let Some(base_url) = &args.base_url {
            config.base_url = base_url.clone();
        } else if !base_url_set && let Some(base_url) = env_base_url {
            config.base_url = base_url;
        }
        if let Some(storage) = &args.storage {
            config.storage_path = Some(PathBuf::from(storage));
        }
        if let Some(secs) = args.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(greeting) = &args.greeting {
            config.greeting = greeting.clone();
        }
        if args.no_color {
            config.use_color = false;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can be used.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .map_err(|err| Error::config(format!("invalid base URL {}: {err}", self.base_url)))?;
        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be at least one second"));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::config("max_upload_bytes must be positive"));
        }
        if self.allowed_extensions.is_empty() {
            return Err(Error::config("allowed_extensions must not be empty"));
        }
        Ok(())
    }

    fn with_file(mut self, file: FileConfig) -> Self {
        if let Some(base_url) = file.app.base_url {
            self.base_url = base_url;
        }
        let chat = file.chat;
        if chat.chat_path.is_some() {
            self.chat_path = chat.chat_path;
        }
        if chat.upload_path.is_some() {
            self.upload_path = chat.upload_path;
        }
        if let Some(secs) = chat.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(greeting) = chat.greeting {
            self.greeting = greeting;
        }
        if let Some(message) = chat.error_message {
            self.error_message = message;
        }
        if let Some(extensions) = chat.allowed_extensions {
            self = self.with_allowed_extensions(extensions);
        }
        if let Some(max) = chat.max_upload_bytes {
            self.max_upload_bytes = max;
        }
        if let Some(color) = chat.color {
            self.use_color = color;
        }
        if file.storage.path.is_some() {
            self.storage_path = file.storage.path;
        }
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    app: AppSection,
    chat: ChatSection,
    storage: StorageSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AppSection {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ChatSection {
    chat_path: Option<String>,
    upload_path: Option<String>,
    timeout_secs: Option<u64>,
    greeting: Option<String>,
    error_message: Option<String>,
    allowed_extensions: Option<Vec<String>>,
    max_upload_bytes: Option<u64>,
    color: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StorageSection {
    path: Option<PathBuf>,
}
