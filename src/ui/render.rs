//! Message bubbles, typing indicator, and status glyph as terminal text.

use chrono::Local;
use crossterm::style::{style, Stylize};

use crate::store::ConversationSnapshot;
use crate::types::{ConnectionStatus, Message};

pub const TYPING_TEXT: &str = "IA está digitando...";

/// Glyph shown next to the input for each status.
pub fn status_glyph(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Idle => ">_",
        ConnectionStatus::Sending => "…",
        ConnectionStatus::Received => "✓",
        ConnectionStatus::Error => "!",
    }
}

/// Renders conversation state; holds no state of its own beyond layout options.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    pub width: usize,
    pub color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            width: 80,
            color: true,
        }
    }
}

impl Renderer {
    pub fn plain(width: usize) -> Self {
        Self {
            width,
            color: false,
        }
    }

    /// One bubble: user messages are right-aligned, assistant messages left.
    pub fn render_message(&self, message: &Message) -> String {
        let bubble_width = (self.width * 3 / 4).max(20);
        let time = message
            .timestamp
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string();
        let mut out = String::new();

        for line in wrap(&message.text, bubble_width.saturating_sub(2)) {
            if message.is_user() {
                let text = format!("{line} │");
                let padded = format!("{text:>width$}", width = self.width);
                out.push_str(&self.paint_user(&padded));
            } else {
                let text = format!("│ {line}");
                out.push_str(&self.paint_assistant(&text));
            }
            out.push('\n');
        }

        let stamp = if message.is_user() {
            format!("{time:>width$}", width = self.width)
        } else {
            time
        };
        out.push_str(&self.paint_dim(&stamp));
        out.push('\n');
        out
    }

    /// Typing indicator, empty when idle.
    pub fn render_typing_indicator(&self, busy: bool) -> String {
        if busy {
            format!("{}\n", self.paint_assistant(TYPING_TEXT))
        } else {
            String::new()
        }
    }

    /// Prompt prefix carrying the status glyph.
    pub fn render_prompt(&self, status: ConnectionStatus) -> String {
        let glyph = status_glyph(status);
        let glyph = if self.color {
            match status {
                ConnectionStatus::Idle => style(glyph).cyan().to_string(),
                ConnectionStatus::Sending => style(glyph).yellow().to_string(),
                ConnectionStatus::Received => style(glyph).green().to_string(),
                ConnectionStatus::Error => style(glyph).red().to_string(),
            }
        } else {
            glyph.to_string()
        };
        format!("{glyph} ")
    }

    /// Whole conversation, oldest first, so the newest entry ends up at the bottom.
    pub fn render_conversation(&self, snapshot: &ConversationSnapshot) -> String {
        let mut out = String::new();
        for message in &snapshot.messages {
            out.push_str(&self.render_message(message));
        }
        out.push_str(&self.render_typing_indicator(snapshot.busy));
        out
    }

    fn paint_user(&self, text: &str) -> String {
        if self.color {
            style(text).cyan().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_assistant(&self, text: &str) -> String {
        if self.color {
            style(text).green().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_dim(&self, text: &str) -> String {
        if self.color {
            style(text).dark_grey().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Greedy word wrap on character counts. Overlong words are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > width && current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sender;

    #[test]
    fn user_bubbles_are_right_aligned() {
        let renderer = Renderer::plain(40);
        let out = renderer.render_message(&Message::new("1", "Olá", Sender::User));
        let first = out.lines().next().unwrap();
        assert!(first.ends_with("Olá │"));
        assert_eq!(first.chars().count(), 40);
    }

    #[test]
    fn assistant_bubbles_are_left_aligned() {
        let renderer = Renderer::plain(40);
        let out = renderer.render_message(&Message::new("1", "Oi!", Sender::Assistant));
        assert!(out.starts_with("│ Oi!\n"));
    }

    #[test]
    fn typing_indicator_only_when_busy() {
        let renderer = Renderer::plain(40);
        assert_eq!(renderer.render_typing_indicator(false), "");
        assert_eq!(renderer.render_typing_indicator(true), format!("{TYPING_TEXT}\n"));
    }

    #[test]
    fn conversation_renders_newest_last() {
        let renderer = Renderer::plain(60);
        let snapshot = ConversationSnapshot {
            messages: vec![
                Message::new("1", "primeira", Sender::Assistant),
                Message::new("2", "segunda", Sender::User),
            ],
            busy: true,
            last_error: None,
            status: ConnectionStatus::Sending,
        };
        let out = renderer.render_conversation(&snapshot);
        let first = out.find("primeira").unwrap();
        let second = out.find("segunda").unwrap();
        assert!(first < second);
        assert!(out.trim_end().ends_with(TYPING_TEXT));
    }

    #[test]
    fn each_status_has_a_distinct_glyph() {
        let glyphs = [
            status_glyph(ConnectionStatus::Idle),
            status_glyph(ConnectionStatus::Sending),
            status_glyph(ConnectionStatus::Received),
            status_glyph(ConnectionStatus::Error),
        ];
        for (i, a) in glyphs.iter().enumerate() {
            for b in &glyphs[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(Renderer::plain(10).render_prompt(ConnectionStatus::Received), "✓ ");
    }

    #[test]
    fn wrap_splits_on_words_and_long_tokens() {
        assert_eq!(wrap("um dois tres", 7), vec!["um dois", "tres"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10), vec![String::new()]);
    }
}
