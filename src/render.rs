//! Markdown rendering with syntax-highlighted code blocks.
//!
//! [`MarkdownRenderer`] converts raw response text into structurally safe
//! HTML: markdown (including tables and fenced code) via pulldown-cmark,
//! with fenced code regions highlighted through syntect when the language
//! tag is recognized. Rendering is stateless, so it is safe to call
//! repeatedly on growing prefixes of the same text — once per streamed
//! fragment and once on the final buffer. A trailing cursor glyph appended
//! by the caller is ordinary text to this module.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};
use pulldown_cmark_escape::escape_html;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::observability;
use crate::transcript::{Role, Transcript};

/// Highlighting theme applied to recognized code blocks.
const THEME: &str = "base16-ocean.dark";

/// Styles for the exported transcript page.
const PAGE_CSS: &str = "\
.highlight { background-color: #272822; padding: 10px; border-radius: 5px; }
.highlight pre { margin: 0; }
.user-message { background-color: #f0f2f6; padding: 10px; border-radius: 5px; margin: 8px 0; }
.assistant-message { background-color: #ffffff; padding: 10px; border-radius: 5px; margin: 8px 0; }
";

/// Renders markdown text as safe HTML with highlighted code fences.
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl MarkdownRenderer {
    /// Creates a renderer with the default syntax and theme sets loaded.
    ///
    /// Loading the syntax definitions is the expensive part; construct once
    /// and reuse across render calls.
    pub fn new() -> Self {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_set.themes.remove(THEME).unwrap_or_default();
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    /// Renders markdown to HTML.
    ///
    /// Fenced code regions with a recognized language tag are syntax
    /// highlighted; an unrecognized tag or a highlighting failure falls back
    /// to an escaped plain code block rather than failing the render. Raw
    /// HTML in the input is re-emitted as escaped text.
    pub fn render(&self, text: &str) -> String {
        observability::RENDER_CALLS.click();

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let parser = Parser::new_ext(text, options);

        let mut events: Vec<Event> = Vec::new();
        let mut in_code_block = false;
        let mut code_lang: Option<String> = None;
        let mut code_buf = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_buf.clear();
                    code_lang = match kind {
                        // The info string may carry extra words; the language
                        // is its first token.
                        CodeBlockKind::Fenced(info) => info
                            .split(|c: char| c == ',' || c.is_whitespace())
                            .next()
                            .filter(|token| !token.is_empty())
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    let block = self.highlight_block(&code_buf, code_lang.take().as_deref());
                    events.push(Event::Html(block.into()));
                }
                Event::Text(text) if in_code_block => {
                    code_buf.push_str(&text);
                }
                // Inline and block HTML from the model is untrusted; escape
                // it instead of passing it through.
                Event::Html(raw) => events.push(Event::Text(raw)),
                Event::InlineHtml(raw) => events.push(Event::Text(raw)),
                other => events.push(other),
            }
        }

        let mut output = String::new();
        html::push_html(&mut output, events.into_iter());
        output
    }

    /// Renders the whole transcript as a standalone styled HTML page.
    pub fn render_page(&self, transcript: &Transcript) -> String {
        let mut page = String::new();
        page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
        page.push_str(PAGE_CSS);
        page.push_str("</style>\n</head>\n<body>\n");
        for message in transcript {
            let class = match message.role {
                Role::User => "user-message",
                Role::Assistant => "assistant-message",
            };
            page.push_str(&format!("<div class=\"{class}\">\n"));
            page.push_str(&self.render(&message.content));
            page.push_str("</div>\n");
        }
        page.push_str("</body>\n</html>\n");
        page
    }

    /// Highlight one fenced code region, falling back to escaped plain
    /// output when the language is unknown or highlighting fails.
    fn highlight_block(&self, code: &str, lang: Option<&str>) -> String {
        let syntax = lang.and_then(|lang| self.syntax_set.find_syntax_by_token(lang));
        match syntax {
            Some(syntax) => {
                match highlighted_html_for_string(code, &self.syntax_set, syntax, &self.theme) {
                    Ok(highlighted) => format!("<div class=\"highlight\">{highlighted}</div>\n"),
                    Err(_) => plain_code_block(code, lang),
                }
            }
            None => plain_code_block(code, lang),
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// An escaped, unhighlighted code block.
fn plain_code_block(code: &str, lang: Option<&str>) -> String {
    let mut escaped_code = String::with_capacity(code.len());
    let _ = escape_html(&mut escaped_code, code);
    match lang {
        Some(lang) => {
            let mut escaped_lang = String::with_capacity(lang.len());
            let _ = escape_html(&mut escaped_lang, lang);
            format!("<pre><code class=\"language-{escaped_lang}\">{escaped_code}</code></pre>\n")
        }
        None => format!("<pre><code>{escaped_code}</code></pre>\n"),
    }
}
