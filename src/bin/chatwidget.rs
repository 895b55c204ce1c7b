//! Terminal front end for the chat widget.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a server on localhost:5000
//! chatwidget
//!
//! # Point at another server and keep state somewhere else
//! chatwidget --base-url https://resume.example.com/ --storage ./widget.json
//!
//! # Read settings from a YAML file
//! chatwidget --config widget.yaml
//! ```
//!
//! Set `CHATWIDGET_LOG` (e.g. `debug`) to see request flow on stderr.

use std::path::PathBuf;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use chatwidget::chat::{
    ChatArgs, ChatClient, ChatCommand, ClientConfig, SendOutcome, help_text, option_choice,
    parse_command,
};
use chatwidget::{FileStorage, HttpEndpoint, PhotoUpload, TerminalView, View};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "CHATWIDGET_LOG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("chatwidget [OPTIONS]");
    let config = ClientConfig::from_args(&args)?;

    let storage_path = match &config.storage_path {
        Some(path) => path.clone(),
        None => FileStorage::default_path().ok_or("no home directory; pass --storage")?,
    };
    let storage = FileStorage::open(&storage_path)?;
    let endpoint = HttpEndpoint::with_options(
        &config.base_url,
        config.chat_path.as_deref(),
        config.upload_path.as_deref(),
        Some(config.timeout),
    )?;
    let view =
        TerminalView::with_color(config.use_color).with_base_url(endpoint.chat_url().clone());
    let server = config.base_url.clone();
    let client = ChatClient::new(endpoint, storage, view, config);
    let mut rl = DefaultEditor::new()?;

    println!("Chat widget (server: {server})");
    println!("Type /help for commands, /quit to exit\n");

    client.start().await;

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Photo(path) => {
                            match PhotoUpload::from_path(expand_home(&path)).await {
                                Ok(photo) => {
                                    client.on_file_selected(Some(photo)).await;
                                }
                                Err(err) => client
                                    .view()
                                    .print_error(&format!("Could not read {path}: {err}")),
                            }
                        }
                        ChatCommand::Pick(n) => {
                            if client.on_option_selected(n - 1).await == SendOutcome::Ignored {
                                client.view().print_error(&format!("There is no option {n}."));
                            }
                        }
                        ChatCommand::Options => {
                            let options = client.options();
                            if options.is_empty() {
                                client.view().print_info("No options right now.");
                            } else {
                                client.view().show_options(&options);
                            }
                        }
                        ChatCommand::UserData => {
                            match serde_json::to_string_pretty(&client.user_data()) {
                                Ok(json) => client.view().print_info(&json),
                                Err(err) => client.view().print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::Session => {
                            let info = format!("Session: {}", client.session_id());
                            client.view().print_info(&info);
                        }
                        ChatCommand::Invalid(msg) => {
                            client.view().print_error(&msg);
                        }
                    }
                    continue;
                }

                if let Some(index) = option_choice(line, client.options().len()) {
                    client.on_option_selected(index).await;
                    continue;
                }

                client.set_input(line);
                client.on_send_clicked().await;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                client.view().print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
