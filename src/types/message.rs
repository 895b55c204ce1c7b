use std::fmt;

use time::OffsetDateTime;

use crate::markup::SafeHtml;

/// Who a message is from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    /// The person chatting.
    User,
    /// The endpoint.
    Bot,
}

impl Sender {
    /// The class a page would put on the message container.
    pub fn css_class(&self) -> &'static str {
        match self {
            Sender::User => "user-message",
            Sender::Bot => "bot-message",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

/// One displayed unit of conversation.
///
/// The body has already been rendered and sanitized.  Messages are never
/// mutated once handed to a view.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Who sent it.
    pub sender: Sender,
    /// Sanitized markup.
    pub body: SafeHtml,
    /// When the client created it.
    pub created_at: OffsetDateTime,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(sender: Sender, body: SafeHtml) -> Self {
        Self {
            sender,
            body,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// A message from the user.
    pub fn user(body: SafeHtml) -> Self {
        Self::new(Sender::User, body)
    }

    /// A message from the bot.
    pub fn bot(body: SafeHtml) -> Self {
        Self::new(Sender::Bot, body)
    }

    /// The body with markup stripped.
    pub fn plain_text(&self) -> String {
        self.body.to_plain_text()
    }
}
