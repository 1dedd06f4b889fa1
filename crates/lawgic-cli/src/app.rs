use crate::commands::{handle_command, CommandResult};
use crate::render;
use crate::theme::Theme;
use anyhow::{bail, Context, Result};
use lawgic_core::chat::IgnoreReason;
use lawgic_core::{
    ChatController, ChatMessage, PendingAttachment, Sender, Settings, TurnEvent, TurnOutcome,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Resolve the API key, then build the backend, storage and controller.
pub async fn open_controller(settings: &Settings) -> Result<ChatController> {
    let api_key = settings.require_api_key()?;
    let backend = Arc::new(settings.build_backend(api_key)?);
    let storage = settings
        .build_storage()
        .context("failed to open conversation storage")?;
    let controller = ChatController::start(backend, settings, storage)
        .await
        .context("failed to start chat session")?;
    Ok(controller)
}

fn resolve_theme(name: &str) -> Theme {
    Theme::by_name(name).unwrap_or_else(|| {
        tracing::warn!("Unknown theme '{name}', using dark");
        Theme::dark()
    })
}

// ── Single prompt ───────────────────────────────────────────────────────

pub async fn run_single_prompt(
    settings: &Settings,
    prompt: &str,
    attach: Option<&Path>,
    theme: &str,
) -> Result<()> {
    let theme = resolve_theme(theme);
    let controller = open_controller(settings).await?;

    let attachment = match attach {
        Some(path) => {
            if !path.is_file() {
                bail!("attachment not found: {}", path.display());
            }
            Some(PendingAttachment::from_path(path))
        }
        None => None,
    };

    match stream_turn(&controller, prompt, attachment, &theme).await {
        TurnOutcome::Completed(_) => Ok(()),
        TurnOutcome::Ignored(IgnoreReason::EmptyInput) => bail!("nothing to send: prompt is empty"),
        TurnOutcome::Ignored(IgnoreReason::TurnInFlight) => bail!("a turn is already in flight"),
        TurnOutcome::AttachmentFailed(e) => bail!("{e}"),
        TurnOutcome::Failed(e) => bail!("turn failed: {e}"),
    }
}

// ── Turn streaming ──────────────────────────────────────────────────────

/// Drive one turn while printing its events: reply text goes to stdout as it
/// grows, status lines and live sources go to stderr.
async fn stream_turn(
    controller: &ChatController,
    text: &str,
    attachment: Option<PendingAttachment>,
    theme: &Theme,
) -> TurnOutcome {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TurnEvent>();

    let turn = controller.send_turn_with_events(text, attachment, event_tx);
    let printer = async {
        let mut printed = String::new();
        let mut live_sources = 0usize;

        while let Some(event) = event_rx.recv().await {
            match event {
                TurnEvent::UserMessage(message) => {
                    if let Some(ref file) = message.attachment {
                        eprintln!("[attached: {}]", file.name);
                    }
                    eprintln!("{}", typing_line(theme));
                }
                TurnEvent::PartialText(accumulated) => {
                    if printed.is_empty() {
                        println!("{}", bot_label(theme));
                    }
                    if let Some(suffix) = accumulated.get(printed.len()..) {
                        print!("{suffix}");
                        let _ = std::io::stdout().flush();
                    }
                    printed = accumulated;
                }
                TurnEvent::PartialCitations(citations) => {
                    if citations.len() != live_sources {
                        live_sources = citations.len();
                        eprintln!();
                        eprintln!(
                            "{}",
                            render::format_sources("Sources (updating):", &citations, theme)
                        );
                    }
                }
                TurnEvent::Committed(message) => {
                    print_committed(&message, &printed, theme);
                    printed.clear();
                }
                TurnEvent::Failed(error) => {
                    eprintln!("{}", render::format_error(&error, theme));
                }
                TurnEvent::Finished => {}
            }
        }
    };

    let (outcome, ()) = tokio::join!(turn, printer);
    outcome
}

fn print_committed(message: &ChatMessage, printed: &str, theme: &Theme) {
    if !printed.is_empty() && message.text.starts_with(printed) {
        println!("{}", &message.text[printed.len()..]);
        if !message.citations().is_empty() {
            println!(
                "{}",
                render::format_sources("Sources:", message.citations(), theme)
            );
        }
    } else {
        if !printed.is_empty() {
            println!();
        }
        println!("{}", render::format_message(message, theme));
    }
    println!();
}

fn bot_label(theme: &Theme) -> String {
    render::format_header(&ChatMessage::bot(""), theme)
}

fn typing_line(theme: &Theme) -> String {
    if theme.styled {
        use crossterm::style::Stylize;
        "Lawgic is typing...".with(theme.muted).to_string()
    } else {
        "Lawgic is typing...".to_string()
    }
}

// ── Interactive REPL ────────────────────────────────────────────────────

pub async fn run_repl(settings: Settings, theme: &str) -> Result<()> {
    let mut theme = resolve_theme(theme);
    let controller = open_controller(&settings).await?;
    let mut pending: Option<PendingAttachment> = None;

    println!("{}", render::banner(&theme));
    println!();
    for message in controller.messages().await {
        println!("{}", render::format_message(&message, &theme));
        println!();
    }
    if let Some(list) = render::format_suggestions(controller.suggestions(), &theme) {
        println!("{list}");
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", prompt_marker(pending.as_ref()));
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() && pending.is_none() {
            continue;
        }

        let text = match handle_command(input) {
            CommandResult::NotACommand => input.to_string(),
            CommandResult::Quit => break,
            CommandResult::Message(msg) => {
                println!("{msg}");
                continue;
            }
            CommandResult::Attach(path) => {
                let path = Path::new(&path);
                if !path.is_file() {
                    eprintln!("{}", render::format_error(&format!("No such file: {}", path.display()), &theme));
                    continue;
                }
                let attachment = PendingAttachment::from_path(path);
                if !attachment.is_supported() {
                    eprintln!(
                        "{}",
                        render::format_warning(
                            &format!(
                                "{} looks like {}, which the assistant may reject.",
                                attachment.name, attachment.mime_type
                            ),
                            &theme
                        )
                    );
                }
                println!("Attached {} ({}). It will be sent with your next message.", attachment.name, attachment.mime_type);
                pending = Some(attachment);
                continue;
            }
            CommandResult::Detach => {
                match pending.take() {
                    Some(a) => println!("Removed {}.", a.name),
                    None => println!("No file attached."),
                }
                continue;
            }
            CommandResult::Dismiss => {
                controller.dismiss_error();
                continue;
            }
            CommandResult::History => {
                for message in controller.messages().await {
                    println!("{}", render::format_message(&message, &theme));
                    println!();
                }
                continue;
            }
            CommandResult::Reset => {
                match controller.reset_history().await {
                    Ok(()) => {
                        pending = None;
                        println!("Conversation cleared.");
                        if let Some(greeting) = controller.messages().await.first() {
                            println!("{}", render::format_message(greeting, &theme));
                        }
                    }
                    Err(e) => eprintln!("{}", render::format_error(&e.to_string(), &theme)),
                }
                continue;
            }
            CommandResult::ModelChanged(model) => {
                let mut config = controller.session_config().await;
                config.model = model.clone();
                match controller.rebuild_session(config).await {
                    Ok(()) => println!("Model changed to: {model}"),
                    Err(e) => eprintln!("{}", render::format_error(&e.to_string(), &theme)),
                }
                continue;
            }
            CommandResult::SaveSettings => {
                let model = controller.session_config().await.model;
                // Start from the file on disk so command-line overrides stay out of it.
                let mut saved = Settings::load();
                saved.llm.model = model.clone();
                match saved.save() {
                    Ok(()) => println!(
                        "Saved {model} as the default model in {}",
                        Settings::config_path().display()
                    ),
                    Err(e) => eprintln!("{}", render::format_error(&e.to_string(), &theme)),
                }
                continue;
            }
            CommandResult::ThemeChanged(name) => {
                match Theme::by_name(&name) {
                    Some(t) => {
                        theme = t;
                        println!("Theme changed to: {}", theme.name);
                    }
                    None => println!(
                        "Unknown theme: {name}. Available: {}",
                        Theme::all_names().join(", ")
                    ),
                }
                continue;
            }
            CommandResult::ShowStatus => {
                let config = controller.session_config().await;
                let messages = controller.messages().await;
                let asked = messages.iter().filter(|m| m.sender == Sender::User).count();
                println!("Model:    {}", config.model);
                println!("Theme:    {}", theme.name);
                println!("Messages: {} ({asked} questions)", messages.len());
                match pending {
                    Some(ref a) => println!("Attached: {} ({})", a.name, a.mime_type),
                    None => println!("Attached: none"),
                }
                if let Some(last) = messages.last() {
                    println!("Last:     {}", render::preview(&last.text, lawgic_core::constants::limits::HISTORY_PREVIEW_CHARS));
                }
                continue;
            }
            CommandResult::Suggest(None) => {
                match render::format_suggestions(controller.suggestions(), &theme) {
                    Some(list) => println!("{list}"),
                    None => println!("No suggestions configured."),
                }
                continue;
            }
            CommandResult::Suggest(Some(n)) => match controller.suggestions().get(n - 1) {
                Some(s) => {
                    println!("> {s}");
                    s.clone()
                }
                None => {
                    println!("No suggestion number {n}.");
                    continue;
                }
            },
        };

        let outcome = stream_turn(&controller, &text, pending.take(), &theme).await;
        if let TurnOutcome::Ignored(reason) = outcome {
            tracing::debug!(?reason, "input ignored");
        }
    }

    Ok(())
}

fn prompt_marker(pending: Option<&PendingAttachment>) -> String {
    match pending {
        Some(a) => format!("[{}] >", a.name),
        None => ">".to_string(),
    }
}
