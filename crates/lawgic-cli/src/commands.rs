/// Result of processing a slash command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Quit the application.
    Quit,
    /// Stage a file to send with the next message.
    Attach(String),
    /// Drop the staged file.
    Detach,
    /// Hide the error banner.
    Dismiss,
    /// Print the full conversation.
    History,
    /// Clear the conversation back to the greeting.
    Reset,
    /// Switch the model and rebuild the session.
    ModelChanged(String),
    /// List suggestions, or send the n-th one (1-based).
    Suggest(Option<usize>),
    /// Save the current model as the default in the config file.
    SaveSettings,
    /// Change the theme.
    ThemeChanged(String),
    /// Show model, message count and staged attachment.
    ShowStatus,
    /// Not a command - treat as regular input.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let input = input.trim();
    if !input.starts_with('/') {
        return CommandResult::NotACommand;
    }

    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,

        "/attach" => {
            if arg.is_empty() {
                CommandResult::Message(
                    "Usage: /attach <path>  (PNG, JPEG, WEBP or PDF)".into(),
                )
            } else {
                CommandResult::Attach(arg.to_string())
            }
        }
        "/detach" => CommandResult::Detach,
        "/dismiss" => CommandResult::Dismiss,
        "/history" => CommandResult::History,
        "/reset" | "/clear" => CommandResult::Reset,

        "/model" => {
            if arg.is_empty() {
                CommandResult::Message(
                    "Current model is shown in /status. Use: /model <model-name>".into(),
                )
            } else {
                CommandResult::ModelChanged(arg.to_string())
            }
        }
        "/suggest" => {
            if arg.is_empty() {
                CommandResult::Suggest(None)
            } else {
                match arg.parse::<usize>() {
                    Ok(n) if n > 0 => CommandResult::Suggest(Some(n)),
                    _ => CommandResult::Message(format!(
                        "Invalid suggestion number: {}. Usage: /suggest [n]",
                        arg
                    )),
                }
            }
        }
        "/theme" => {
            if arg.is_empty() {
                CommandResult::Message("Available themes: dark, light, plain\nUsage: /theme <name>".into())
            } else {
                CommandResult::ThemeChanged(arg.to_string())
            }
        }
        "/status" => CommandResult::ShowStatus,
        "/save" => CommandResult::SaveSettings,
        "/version" => CommandResult::Message(format!(
            "Lawgic CLI v{}",
            env!("CARGO_PKG_VERSION")
        )),

        _ => CommandResult::Message(format!(
            "Unknown command: {}. Type /help for available commands.",
            cmd
        )),
    }
}

fn show_help() -> CommandResult {
    let help_text = "\
╭─ Lawgic CLI Commands ──────────────────────────────────────────╮

  CONVERSATION
    /history                  Show the full conversation
    /reset, /clear            Start over from the greeting
    /suggest [n]              List quick suggestions, or ask the n-th
    /dismiss                  Hide the current error banner

  ATTACHMENTS
    /attach <path>            Send a file with the next message
    /detach                   Drop the staged file

  MODEL & DISPLAY
    /model <name>             Switch model (keeps the conversation)
    /save                     Save the current model as the default
    /theme <name>             Change color theme (dark, light, plain)
    /status                   Show model, messages and staged file

  OTHER
    /help, /h                 Show this help message
    /version                  Show version information
    /exit, /quit, /q          Quit the application

╰────────────────────────────────────────────────────────────────╯";

    CommandResult::Message(help_text.into())
}
