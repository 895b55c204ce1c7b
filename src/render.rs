//! Display surfaces for the chat widget.
//!
//! The [`ChatClient`](crate::chat::ChatClient) never touches a screen directly;
//! it drives a [`View`].  [`TerminalView`] draws to stdout, [`MemoryView`]
//! records what would have been drawn.

use std::io::{self, Stdout, Write};

use url::Url;

use crate::markup::strip_controls;
use crate::types::{CompletionLink, Message, Progress, Sender};

/// ANSI escape code for dim text (used for user messages).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for sender labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for bot messages).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for options).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for progress and completion).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI sequence that returns to column zero and erases the line.
const ANSI_CLEAR_LINE: &str = "\r\x1b[2K";

/// Width of the terminal progress bar, in cells.
const PROGRESS_CELLS: usize = 20;

/// A surface the chat widget draws on.
///
/// Every method corresponds to one visible change.  Message bodies arrive
/// already sanitized.
pub trait View: Send {
    /// Append a message to the conversation.
    fn append_message(&mut self, message: &Message);

    /// Show the typing indicator.
    fn show_typing(&mut self);

    /// Remove the typing indicator, if shown.
    fn hide_typing(&mut self);

    /// Empty the text input.
    fn clear_input(&mut self);

    /// Replace the displayed quick-reply options.  An empty slice clears them.
    fn show_options(&mut self, options: &[String]);

    /// Remove all quick-reply options.
    fn clear_options(&mut self) {
        self.show_options(&[]);
    }

    /// Set the progress indicator.
    fn set_progress(&mut self, progress: Progress);

    /// Show the affordance for a finished conversation.
    fn show_completion(&mut self, link: &CompletionLink);
}

////////////////////////////////////////// MemoryView //////////////////////////////////////////

/// One recorded change to a [`MemoryView`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// A message was appended.
    Message(Sender, String),
    /// The typing indicator appeared.
    TypingShown,
    /// The typing indicator went away.
    TypingHidden,
    /// The input was cleared.
    InputCleared,
    /// The option set was replaced.
    Options(Vec<String>),
    /// Progress changed.
    Progress(Progress),
    /// The completion affordance appeared.
    Completion(String),
}

/// A view that keeps everything in memory.
///
/// Useful for tests and for embedders that want to pull state rather than
/// receive pushes.
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    /// Every appended message, in order.
    pub messages: Vec<Message>,
    /// Currently displayed options.
    pub options: Vec<String>,
    /// Current progress, if any was ever set.
    pub progress: Option<Progress>,
    /// Accessibility value mirroring the progress bar.
    pub aria_valuenow: Option<f64>,
    /// Every completion affordance shown.
    pub completions: Vec<CompletionLink>,
    /// Whether the typing indicator is visible.
    pub typing: bool,
    /// Ordered log of changes.
    pub events: Vec<ViewEvent>,
}

impl MemoryView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// The plain text of every message from `sender`.
    pub fn texts_from(&self, sender: Sender) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.sender == sender)
            .map(Message::plain_text)
            .collect()
    }

    /// The most recent message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl View for MemoryView {
    fn append_message(&mut self, message: &Message) {
        self.messages.push(message.clone());
        self.events
            .push(ViewEvent::Message(message.sender, message.plain_text()));
    }

    fn show_typing(&mut self) {
        self.typing = true;
        self.events.push(ViewEvent::TypingShown);
    }

    fn hide_typing(&mut self) {
        if self.typing {
            self.typing = false;
            self.events.push(ViewEvent::TypingHidden);
        }
    }

    fn clear_input(&mut self) {
        self.events.push(ViewEvent::InputCleared);
    }

    fn show_options(&mut self, options: &[String]) {
        self.options = options.to_vec();
        self.events.push(ViewEvent::Options(options.to_vec()));
    }

    fn set_progress(&mut self, progress: Progress) {
        self.progress = Some(progress);
        self.aria_valuenow = Some(progress.percent());
        self.events.push(ViewEvent::Progress(progress));
    }

    fn show_completion(&mut self, link: &CompletionLink) {
        self.completions.push(link.clone());
        self.events.push(ViewEvent::Completion(link.url.clone()));
    }
}

///////////////////////////////////////// TerminalView /////////////////////////////////////////

/// Draws the conversation on stdout with optional ANSI styling.
pub struct TerminalView {
    stdout: Stdout,
    use_color: bool,
    typing: bool,
    base_url: Option<Url>,
}

impl TerminalView {
    /// Creates a new TerminalView with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new TerminalView with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            typing: false,
            base_url: None,
        }
    }

    /// Resolve relative completion links against `base_url` when printing.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Print an informational line that is not part of the conversation.
    pub fn print_info(&mut self, info: &str) {
        self.erase_typing();
        println!("{info}");
        self.flush();
    }

    /// Print an error line that is not part of the conversation.
    pub fn print_error(&mut self, error: &str) {
        self.erase_typing();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn erase_typing(&mut self) {
        if self.typing {
            if self.use_color {
                print!("{ANSI_CLEAR_LINE}");
            }
            self.typing = false;
        }
    }

    fn resolve(&self, url: &str) -> String {
        self.base_url
            .as_ref()
            .and_then(|base| base.join(url).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string())
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl View for TerminalView {
    fn append_message(&mut self, message: &Message) {
        self.erase_typing();
        let text = message.plain_text();
        match (message.sender, self.use_color) {
            (Sender::User, true) => {
                println!("{ANSI_DIM}{ANSI_BOLD}You:{ANSI_RESET} {ANSI_DIM}{text}{ANSI_RESET}")
            }
            (Sender::Bot, true) => {
                println!("{ANSI_CYAN}{ANSI_BOLD}Bot:{ANSI_RESET} {ANSI_CYAN}{text}{ANSI_RESET}")
            }
            (Sender::User, false) => println!("You: {text}"),
            (Sender::Bot, false) => println!("Bot: {text}"),
        }
        self.flush();
    }

    fn show_typing(&mut self) {
        // Without ANSI the indicator could not be erased again.
        if self.use_color && !self.typing {
            print!("{ANSI_DIM}Bot is typing...{ANSI_RESET}");
            self.typing = true;
            self.flush();
        }
    }

    fn hide_typing(&mut self) {
        self.erase_typing();
        self.flush();
    }

    fn clear_input(&mut self) {}

    fn show_options(&mut self, options: &[String]) {
        if options.is_empty() {
            return;
        }
        self.erase_typing();
        let line = options_line(options);
        if self.use_color {
            println!("  {ANSI_YELLOW}{line}{ANSI_RESET}");
        } else {
            println!("  {line}");
        }
        self.flush();
    }

    fn set_progress(&mut self, progress: Progress) {
        self.erase_typing();
        let filled = progress.filled_cells(PROGRESS_CELLS);
        let bar = format!(
            "{}{}",
            "#".repeat(filled),
            ".".repeat(PROGRESS_CELLS - filled)
        );
        if self.use_color {
            println!("  {ANSI_GREEN}Progress: [{bar}] {progress}{ANSI_RESET}");
        } else {
            println!("  Progress: [{bar}] {progress}");
        }
        self.flush();
    }

    fn show_completion(&mut self, link: &CompletionLink) {
        self.erase_typing();
        let url = strip_controls(&self.resolve(&link.url));
        let label = strip_controls(&link.label);
        if self.use_color {
            println!("{ANSI_GREEN}{ANSI_BOLD}{label}:{ANSI_RESET} {url}");
        } else {
            println!("{label}: {url}");
        }
        self.flush();
    }
}

/// Numbered option labels on one line, with control characters removed.
fn options_line(options: &[String]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("[{}] {}", i + 1, strip_controls(option)))
        .collect::<Vec<_>>()
        .join("   ")
}
