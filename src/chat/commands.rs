//! Slash command parsing for the terminal front end.
//!
//! Input starting with `/` controls the widget instead of being sent to the
//! chat server.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Upload the photo at the given path.
    Photo(String),

    /// Select a quick-reply option by its 1-based number.
    Pick(usize),

    /// Show the current quick-reply options again.
    Options,

    /// Show the accumulated user data.
    UserData,

    /// Show the session identifier.
    Session,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use chatwidget::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/photo me.png").is_some());
/// assert!(parse_command("My name is Ann").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "photo" | "upload" => match argument {
            Some(path) => ChatCommand::Photo(path.to_string()),
            None => ChatCommand::Invalid("/photo requires a file path".to_string()),
        },
        "pick" => match argument.map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => ChatCommand::Pick(n),
            Some(_) => ChatCommand::Invalid("/pick expects a positive integer".to_string()),
            None => ChatCommand::Invalid("/pick requires an option number".to_string()),
        },
        "options" => ChatCommand::Options,
        "data" | "userdata" => ChatCommand::UserData,
        "session" => ChatCommand::Session,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Interpret a bare number as a choice among `count` displayed options.
///
/// Returns the zero-based index, or `None` when the input is anything else.
pub fn option_choice(input: &str, count: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= count => Some(n - 1),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /photo <file>          Upload a photo (png, jpg, jpeg, gif)
  /pick <n>              Choose quick-reply option n (a bare number works too)
  /options               Show the current options
  /data                  Show what the server has collected so far
  /session               Show the session identifier
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_messages_are_not_commands() {
        assert_eq!(parse_command("Hello"), None);
        assert_eq!(parse_command("  my email is a/b@example.com"), None);
    }

    #[test]
    fn parse_photo() {
        assert_eq!(
            parse_command("/photo ~/me.png"),
            Some(ChatCommand::Photo("~/me.png".to_string()))
        );
        assert_eq!(
            parse_command("/UPLOAD  a b.jpg "),
            Some(ChatCommand::Photo("a b.jpg".to_string()))
        );
        assert!(matches!(
            parse_command("/photo"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_pick() {
        assert_eq!(parse_command("/pick 2"), Some(ChatCommand::Pick(2)));
        assert!(matches!(
            parse_command("/pick 0"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/pick two"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(parse_command("/pick"), Some(ChatCommand::Invalid(_))));
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("/options"), Some(ChatCommand::Options));
        assert_eq!(parse_command("/data"), Some(ChatCommand::UserData));
        assert_eq!(parse_command("/session"), Some(ChatCommand::Session));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn bare_numbers_pick_displayed_options() {
        assert_eq!(option_choice("1", 2), Some(0));
        assert_eq!(option_choice(" 2 ", 2), Some(1));
        assert_eq!(option_choice("3", 2), None);
        assert_eq!(option_choice("0", 2), None);
        assert_eq!(option_choice("25", 0), None);
        assert_eq!(option_choice("yes", 2), None);
    }

    #[test]
    fn help_mentions_every_command() {
        let help = help_text();
        for command in ["/photo", "/pick", "/options", "/data", "/session", "/help", "/quit"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
