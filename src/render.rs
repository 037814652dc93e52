//! Choice between the plain and the HTML representation of a message, and
//! the sanitization boundary every server-supplied HTML body crosses before
//! it is handed out as markup.

use std::collections::HashSet;
use std::fmt;

use crate::domain::email::{ComposeDraft, EmailContent};

pub const NO_TEXT_PLACEHOLDER: &str = "No plain text content available";
pub const NO_HTML_PLACEHOLDER: &str = "No HTML content available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentMode {
    #[default]
    Text,
    Html,
}

impl ContentMode {
    pub fn is_html(self) -> bool {
        self == ContentMode::Html
    }

    pub fn toggled(self) -> Self {
        match self {
            ContentMode::Text => ContentMode::Html,
            ContentMode::Html => ContentMode::Text,
        }
    }
}

/// What a view should show for a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Literal text, to be displayed verbatim.
    Text(String),
    /// Sanitized markup, safe to hand to an HTML renderer.
    Markup(String),
    Placeholder(&'static str),
}

impl Rendered {
    pub fn as_str(&self) -> &str {
        match self {
            Rendered::Text(s) | Rendered::Markup(s) => s,
            Rendered::Placeholder(p) => p,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Rendered::Placeholder(_))
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn render(content: &EmailContent, mode: ContentMode) -> Rendered {
    match mode {
        ContentMode::Text => match content.text() {
            Some(text) => Rendered::Text(text.to_string()),
            None => Rendered::Placeholder(NO_TEXT_PLACEHOLDER),
        },
        ContentMode::Html => content
            .html()
            .map(sanitize_html)
            .filter(|clean| !clean.trim().is_empty())
            .map(Rendered::Markup)
            .unwrap_or(Rendered::Placeholder(NO_HTML_PLACEHOLDER)),
    }
}

/// Preview of a draft body, interpreted the way it will be sent.
pub fn render_draft(draft: &ComposeDraft) -> Rendered {
    let mode = if draft.is_html {
        ContentMode::Html
    } else {
        ContentMode::Text
    };
    let content = if draft.is_html {
        EmailContent {
            text: None,
            html: Some(draft.content.clone()),
        }
    } else {
        EmailContent {
            text: Some(draft.content.clone()),
            html: None,
        }
    };
    render(&content, mode)
}

/// Allow-list filter for untrusted HTML. Script and style elements are
/// dropped with their content, event-handler attributes never survive, and
/// only http(s), mailto and cid URLs are kept.
pub fn sanitize_html(html: &str) -> String {
    let schemes: HashSet<&str> = ["http", "https", "mailto", "cid"].into_iter().collect();
    ammonia::Builder::default()
        .url_schemes(schemes)
        .link_rel(Some("noopener noreferrer"))
        .clean(html)
        .to_string()
}

/// Wraps sanitized markup as text for a terminal.
pub fn to_terminal_text(markup: &str, width: usize) -> String {
    html2text::from_read(markup.as_bytes(), width.max(20)).unwrap_or_else(|e| {
        log::warn!("html to text conversion failed: {e}");
        markup.to_string()
    })
}
