//! Rendering of chat messages.
//!
//! Assistant replies arrive as HTML and are sanitized before they are shown;
//! user messages are always treated as text.  [`message_html`] is the one
//! place that boundary is drawn, and both the terminal and the HTML
//! transcript go through it.

use std::io::{self, Stdout, Write};

use crate::types::{Conversation, DisplayMessage, Sender};

/// ANSI escape code for dim text (used for previews and placeholders).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for headings).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user's messages).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the assistant's messages).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Removes scripts, event handlers, and anything else unsafe from HTML.
pub fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

/// Escapes text so every character displays literally inside HTML.
pub fn escape_text(text: &str) -> String {
    ammonia::clean_text(text)
}

/// The HTML body of one message bubble.
pub fn message_html(message: &DisplayMessage) -> String {
    match message.sender {
        Sender::Assistant => sanitize_html(&message.text),
        Sender::User => escape_text(&message.text),
    }
}

/// Flattens sanitized HTML to terminal text: block ends become newlines,
/// list items get a dash, tags are dropped and common entities decoded.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('>') else {
            rest = &rest[start..];
            break;
        };
        let tag = rest[start + 1..start + end].trim().to_ascii_lowercase();
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        match (tag.starts_with('/'), name) {
            (false, "br") => out.push('\n'),
            (false, "li") => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("- ");
            }
            (true, "p" | "div" | "ul" | "ol" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "tr") => {
                out.push('\n')
            }
            _ => {}
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    let text = decode_entities(&out);
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let mut collapsed = String::new();
    let mut blank = 0;
    for line in lines {
        if line.is_empty() {
            blank += 1;
            if blank > 1 {
                continue;
            }
        } else {
            blank = 0;
        }
        collapsed.push_str(line);
        collapsed.push('\n');
    }
    collapsed.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Drops C0 and C1 control characters except newline and tab, so remote
/// text cannot drive the terminal with escape sequences.
pub fn terminal_safe(text: &str) -> String {
    text.chars()
        .filter(|c| matches!(c, '\n' | '\t') || !c.is_control())
        .collect()
}

/// A standalone HTML document of a conversation.
pub fn html_transcript(title: &str, messages: &[DisplayMessage]) -> String {
    let title = escape_text(title);
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n"));
    html.push_str(&format!("<h2>{title}</h2>\n<div class=\"chat-messages\">\n"));
    for message in messages {
        let (class, bubble) = match message.sender {
            Sender::User => ("user", "chat-bubble"),
            Sender::Assistant => ("ai", "chat-bubble chat-bubble-html"),
        };
        html.push_str(&format!(
            "<div class=\"chat-message chat-message-{class}\"><div class=\"{bubble}\">{}</div></div>\n",
            message_html(message)
        ));
    }
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

/// Trait for rendering application output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
pub trait Renderer: Send {
    /// Print a page or conversation heading.
    fn print_heading(&mut self, heading: &str);

    /// Print one message of the open thread.
    fn print_message(&mut self, message: &DisplayMessage);

    /// Print the conversation list, marking the open one.
    fn print_conversations(&mut self, conversations: &[Conversation], active: Option<&str>);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a dimmed hint, such as an empty-state placeholder.
    fn print_hint(&mut self, hint: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// Writes to stdout unless constructed with [`PlainTextRenderer::to_writer`].
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            out: io::stdout(),
            use_color,
        }
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Renders into `out` instead of stdout.
    pub fn to_writer(out: W, use_color: bool) -> Self {
        Self { out, use_color }
    }

    /// Consumes the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn styled(&mut self, style: &str, text: &str) {
        let text = terminal_safe(text);
        if self.use_color {
            let _ = writeln!(self.out, "{style}{text}{ANSI_RESET}");
        } else {
            let _ = writeln!(self.out, "{text}");
        }
        let _ = self.out.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_heading(&mut self, heading: &str) {
        self.styled(ANSI_BOLD, &format!("\n== {heading} =="));
    }

    fn print_message(&mut self, message: &DisplayMessage) {
        match message.sender {
            // Shown verbatim; markup in user text is never interpreted.
            Sender::User => {
                self.styled(ANSI_CYAN, "you>");
                let _ = writeln!(self.out, "{}", terminal_safe(&message.text));
            }
            Sender::Assistant => {
                self.styled(ANSI_GREEN, "assistant>");
                let text = html_to_text(&sanitize_html(&message.text));
                let _ = writeln!(self.out, "{}", terminal_safe(&text));
            }
        }
        let _ = self.out.flush();
    }

    fn print_conversations(&mut self, conversations: &[Conversation], active: Option<&str>) {
        if conversations.is_empty() {
            self.print_hint("No conversations yet. Start one with /new.");
            return;
        }
        for (index, conversation) in conversations.iter().enumerate() {
            let marker = if Some(conversation.id.as_str()) == active {
                '*'
            } else {
                ' '
            };
            let _ = writeln!(
                self.out,
                "{marker}{:>3}. {}",
                index + 1,
                terminal_safe(conversation.display_title())
            );
            let preview = format!("       {}", conversation.display_preview());
            self.styled(ANSI_DIM, &preview);
        }
    }

    fn print_error(&mut self, error: &str) {
        self.styled(ANSI_RED, &format!("Error: {error}"));
    }

    fn print_info(&mut self, info: &str) {
        let _ = writeln!(self.out, "{}", terminal_safe(info));
        let _ = self.out.flush();
    }

    fn print_hint(&mut self, hint: &str) {
        self.styled(ANSI_DIM, hint);
    }
}
