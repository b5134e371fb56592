//! Markdown rendering for content bodies.
//!
//! Bodies are authored in Markdown by admins and rendered once on save into
//! `body_html`. Raw HTML in the source is escaped rather than passed through.
//!
//! ```
//! use minbar::services::markdown::MarkdownRenderer;
//!
//! let html = MarkdownRenderer::new().render("# Tafsir\n\nSurah **Al-Fatiha**");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Stateless Markdown to HTML renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options
    }

    /// Render Markdown to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let mut in_code_block = false;
        let mut code_lang: Option<String> = None;
        let mut code = String::new();
        let mut events = Vec::new();

        for event in Parser::new_ext(markdown, Self::options()) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code.clear();
                    code_lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    events.push(Event::Html(code_block(&code, code_lang.take()).into()));
                }
                Event::Text(text) if in_code_block => code.push_str(&text),
                // untrusted markup is shown, never interpreted
                Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
                other => events.push(other),
            }
        }

        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, events.into_iter());
        output
    }

    /// Strip formatting, keeping paragraphs on separate lines.
    ///
    /// Used for the PDF export and for summaries derived from the body.
    pub fn to_plain_text(&self, markdown: &str) -> String {
        let mut text = String::with_capacity(markdown.len());

        for event in Parser::new_ext(markdown, Self::options()) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak => text.push(' '),
                Event::HardBreak => text.push('\n'),
                Event::Start(Tag::Item) => text.push_str("- "),
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::Item)
                | Event::End(TagEnd::CodeBlock) => text.push('\n'),
                _ => {}
            }
        }

        text.trim_end().to_string()
    }

    /// First `max_chars` characters of the plain text, cut at a word boundary.
    pub fn excerpt(&self, markdown: &str, max_chars: usize) -> String {
        let plain = self.to_plain_text(markdown).replace('\n', " ");
        if plain.chars().count() <= max_chars {
            return plain;
        }

        let cut: String = plain.chars().take(max_chars).collect();
        let trimmed = match cut.rfind(' ') {
            Some(pos) if pos > 0 => &cut[..pos],
            _ => cut.as_str(),
        };
        format!("{}…", trimmed.trim_end())
    }
}

fn code_block(code: &str, lang: Option<String>) -> String {
    match lang {
        Some(lang) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            html_escape(&lang),
            html_escape(code)
        ),
        None => format!("<pre><code>{}</code></pre>\n", html_escape(code)),
    }
}

/// Escape the five HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
