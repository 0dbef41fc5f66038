//! Markdown rendering service
//!
//! Converts note and post bodies to HTML with pulldown-cmark. Raw HTML in
//! the source is escaped rather than passed through, so rendered content is
//! safe to embed in the admin panel.
//!
//! # Example
//!
//! ```
//! use adminhub::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Hello World\n\nThis is **bold** text.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Markdown renderer with GFM-style extensions.
///
/// Supported on top of CommonMark:
/// - Tables
/// - Strikethrough
/// - Task lists
/// - Fenced code blocks tagged with a `language-*` class
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }

    /// Renders Markdown text to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let events = process_events(parser);

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }
}

/// Escapes raw HTML and collapses code blocks into a single HTML event.
fn process_events<'a>(parser: Parser<'a>) -> Vec<Event<'a>> {
    let mut events = Vec::new();
    let mut in_code_block = false;
    let mut code_lang: Option<String> = None;
    let mut code_content = String::new();

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                code_content.clear();
                code_lang = match kind {
                    CodeBlockKind::Fenced(lang) => {
                        // Only the first word of the info string names the language
                        let lang = lang.split_whitespace().next().unwrap_or("");
                        (!lang.is_empty()).then(|| lang.to_string())
                    }
                    CodeBlockKind::Indented => None,
                };
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                let block = match code_lang.take() {
                    Some(lang) => format!(
                        "<pre><code class=\"language-{}\">{}</code></pre>\n",
                        html_escape(&lang),
                        html_escape(&code_content)
                    ),
                    None => format!("<pre><code>{}</code></pre>\n", html_escape(&code_content)),
                };
                events.push(Event::Html(block.into()));
            }
            Event::Text(text) if in_code_block => {
                code_content.push_str(&text);
            }
            Event::Html(raw) | Event::InlineHtml(raw) => {
                events.push(Event::Text(raw));
            }
            _ => events.push(event),
        }
    }

    events
}

/// Escapes HTML special characters in a string.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
