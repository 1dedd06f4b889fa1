use crate::theme::Theme;
use chrono::Local;
use crossterm::style::{Color, Stylize};
use lawgic_core::{ChatMessage, Citation, Sender};
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn bold_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold pattern"))
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link pattern"))
}

fn paint(text: &str, color: Color, theme: &Theme) -> String {
    if theme.styled {
        text.with(color).to_string()
    } else {
        text.to_string()
    }
}

fn embolden(text: &str, theme: &Theme) -> String {
    if theme.styled {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// Render the small markdown subset replies use: `**bold**` and
/// `[title](url)` links.
pub fn format_text(text: &str, theme: &Theme) -> String {
    let bolded = bold_pattern().replace_all(text, |caps: &Captures| embolden(&caps[1], theme));
    link_pattern()
        .replace_all(&bolded, |caps: &Captures| {
            format!("{} ({})", &caps[1], paint(&caps[2], theme.link_color, theme))
        })
        .into_owned()
}

pub fn format_sources(heading: &str, citations: &[Citation], theme: &Theme) -> String {
    let mut out = paint(heading, theme.muted, theme);
    for citation in citations {
        out.push_str("\n  - ");
        if citation.label() == citation.uri {
            out.push_str(&paint(&citation.uri, theme.link_color, theme));
        } else {
            out.push_str(&format!(
                "{} ({})",
                citation.label(),
                paint(&citation.uri, theme.link_color, theme)
            ));
        }
    }
    out
}

/// Sender label plus local HH:MM time, e.g. `Lawgic · 14:05`.
pub fn format_header(message: &ChatMessage, theme: &Theme) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let (label, color) = match message.sender {
        Sender::User => ("You", theme.user_color),
        Sender::Bot => ("Lawgic", theme.bot_color),
    };
    format!(
        "{} {}",
        embolden(&paint(label, color, theme), theme),
        paint(&format!("· {time}"), theme.muted, theme)
    )
}

pub fn format_message(message: &ChatMessage, theme: &Theme) -> String {
    let mut out = format_header(message, theme);
    if let Some(ref attachment) = message.attachment {
        out.push('\n');
        out.push_str(&paint(
            &format!("Attached: {} ({})", attachment.name, attachment.mime_type),
            theme.muted,
            theme,
        ));
    }
    if !message.text.is_empty() {
        out.push('\n');
        out.push_str(&format_text(&message.text, theme));
    }
    if !message.citations().is_empty() {
        out.push('\n');
        out.push_str(&format_sources("Sources:", message.citations(), theme));
    }
    out
}

pub fn format_error(error: &str, theme: &Theme) -> String {
    format!(
        "{} {}\n{}",
        embolden(&paint("Error:", theme.error, theme), theme),
        paint(error, theme.error, theme),
        paint("(type /dismiss to hide)", theme.muted, theme)
    )
}

pub fn format_warning(warning: &str, theme: &Theme) -> String {
    paint(&format!("Warning: {warning}"), theme.warning, theme)
}

pub fn format_suggestions(suggestions: &[String], theme: &Theme) -> Option<String> {
    if suggestions.is_empty() {
        return None;
    }
    let mut out = paint("Quick Suggestions:", theme.muted, theme);
    for (index, suggestion) in suggestions.iter().enumerate() {
        out.push_str(&format!("\n  [{}] {}", index + 1, suggestion));
    }
    out.push('\n');
    out.push_str(&paint("Use /suggest <n> to ask one.", theme.muted, theme));
    Some(out)
}

pub fn banner(theme: &Theme) -> String {
    format!(
        "{}\n{}",
        embolden(&paint("LawGic - Legal Aid Chatbot", theme.accent, theme), theme),
        paint("Your AI guide to Bangladeshi Law & Constitution", theme.muted, theme)
    )
}

/// Cut `text` to `max` characters on a char boundary, marking the cut.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{}...", cut.trim_end())
    }
}
