//! Markdown rendering with syntax highlighting

use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use pulldown_cmark::{
    html, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd,
    TextMergeStream,
};
use regex::Regex;
use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{ParseState, ScopeStackOp, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^A-Za-z0-9_]+").unwrap();
    static ref BARE_URL: Regex =
        Regex::new(r#"(?:https?://|www\.)[^\s<>"]*[^\s<>"'.,:;!?)\]]"#).unwrap();
    static ref HTML_ANCHOR: Regex = Regex::new(r"(?i)^<(/?)a[\s>/]").unwrap();
}

/// Class attached to every rendered code block
const CODE_CLASS: &str = "hljs";

/// Label used when no grammar could be determined
const PLAIN_TEXT: &str = "plaintext";

/// Grammars scored when a block names no usable language, in tie-break order
const DETECT_CANDIDATES: &[&str] = &[
    "rs", "js", "py", "sh", "go", "java", "cpp", "c", "rb", "php", "sql", "css", "html",
    "xml", "json", "yaml",
];

/// Scopes that count towards a grammar's relevance
const SIGNIFICANT_SCOPES: &[&str] = &[
    "keyword.control",
    "keyword.declaration",
    "keyword.other",
    "storage",
    "entity.name",
    "support.function",
    "support.macro",
    "support.type",
    "variable.function",
    "constant.language",
];

/// Lines of a block looked at during detection
const DETECT_LINES: usize = 50;

/// Minimum relevance for a detected grammar to be used
const MIN_RELEVANCE: i64 = 2;

/// Markdown renderer with syntax highlighting.
///
/// Built once per process and shared; rendering never mutates it.
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    options: Options,
}

/// A fenced or indented code block being collected
struct CodeBlock {
    lang: Option<String>,
    text: String,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_theme("base16-ocean.dark")
    }

    /// Create with a specific highlight theme for the generated stylesheet
    pub fn with_theme(theme: &str) -> Self {
        // Front-matter is stripped before rendering, so no metadata block option here
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_GFM;

        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            options,
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let parser = TextMergeStream::new(Parser::new_ext(markdown, self.options));

        let mut events: Vec<Event> = Vec::new();
        let mut code_block: Option<CodeBlock> = None;
        let mut heading: Option<(HeadingLevel, Vec<Event>)> = None;
        let mut link_depth = 0usize;

        for event in parser {
            if code_block.is_some() {
                match event {
                    Event::Text(text) => {
                        if let Some(block) = code_block.as_mut() {
                            block.text.push_str(&text);
                        }
                    }
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some(block) = code_block.take() {
                            let highlighted =
                                self.highlight_code(&block.text, block.lang.as_deref());
                            events.push(Event::Html(highlighted.into()));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some(CodeBlock {
                        lang,
                        text: String::new(),
                    });
                }
                Event::Start(Tag::Heading { level, .. }) => {
                    heading = Some((level, Vec::new()));
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((level, inner)) = heading.take() {
                        events.push(Event::Html(render_heading(level, inner).into()));
                    }
                }
                // Text already inside a link or an image alt is never autolinked
                Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. }) => {
                    link_depth += 1;
                    push_event(&mut events, &mut heading, event);
                }
                Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                    link_depth = link_depth.saturating_sub(1);
                    push_event(&mut events, &mut heading, event);
                }
                Event::InlineHtml(ref raw) => {
                    if let Some(caps) = HTML_ANCHOR.captures(raw) {
                        if caps[1].is_empty() {
                            link_depth += 1;
                        } else {
                            link_depth = link_depth.saturating_sub(1);
                        }
                    }
                    push_event(&mut events, &mut heading, event);
                }
                Event::SoftBreak => push_event(&mut events, &mut heading, Event::HardBreak),
                Event::Text(text) if link_depth == 0 && BARE_URL.is_match(&text) => {
                    for linked in autolink(text) {
                        push_event(&mut events, &mut heading, linked);
                    }
                }
                _ => push_event(&mut events, &mut heading, event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Highlight a code block, falling back to escaped plain text
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let (label, syntax) = self.resolve_syntax(code, lang);

        match self.highlight_with(code, syntax) {
            Ok(highlighted) => format!(
                r#"<pre><code class="{} language-{}">{}</code></pre>"#,
                CODE_CLASS,
                html_escape(&label),
                highlighted
            ),
            Err(e) => {
                tracing::warn!("Syntax highlighting failed for {}: {}", label, e);
                format!(
                    r#"<pre><code class="{}">{}</code></pre>"#,
                    CODE_CLASS,
                    html_escape(code)
                )
            }
        }
    }

    /// Pick a grammar: declared language first, then first-line detection,
    /// then content scoring, then plain text
    fn resolve_syntax<'s>(
        &'s self,
        code: &str,
        lang: Option<&str>,
    ) -> (String, &'s SyntaxReference) {
        if let Some(lang) = lang.filter(|l| !l.is_empty()) {
            if let Some(syntax) = self.syntax_set.find_syntax_by_token(lang) {
                return (lang.to_string(), syntax);
            }
            tracing::debug!("Unknown code block language {:?}, auto-detecting", lang);
        }

        if let Some(syntax) = self.syntax_set.find_syntax_by_first_line(code) {
            return (syntax_label(syntax), syntax);
        }

        match self.detect_syntax(code) {
            Some(syntax) => (syntax_label(syntax), syntax),
            None => (
                PLAIN_TEXT.to_string(),
                self.syntax_set.find_syntax_plain_text(),
            ),
        }
    }

    /// Best scoring candidate grammar for `code`, if any scores high enough
    fn detect_syntax(&self, code: &str) -> Option<&SyntaxReference> {
        let mut best: Option<(i64, &SyntaxReference)> = None;

        for token in DETECT_CANDIDATES {
            let Some(syntax) = self.syntax_set.find_syntax_by_token(token) else {
                continue;
            };
            let score = self.relevance(code, syntax);
            if score >= MIN_RELEVANCE && best.map_or(true, |(top, _)| score > top) {
                best = Some((score, syntax));
            }
        }

        best.map(|(_, syntax)| syntax)
    }

    /// Significant scopes opened while parsing `code`, minus a penalty for invalid ones
    fn relevance(&self, code: &str, syntax: &SyntaxReference) -> i64 {
        let mut state = ParseState::new(syntax);
        let mut score = 0;

        for line in LinesWithEndings::from(code).take(DETECT_LINES) {
            let Ok(ops) = state.parse_line(line, &self.syntax_set) else {
                return i64::MIN;
            };
            for (_, op) in ops {
                let ScopeStackOp::Push(scope) = op else {
                    continue;
                };
                let name = scope.build_string();
                if name.starts_with("invalid") {
                    score -= 3;
                } else if SIGNIFICANT_SCOPES.iter().any(|p| name.starts_with(p)) {
                    score += 1;
                }
            }
        }

        score
    }

    fn highlight_with(
        &self,
        code: &str,
        syntax: &SyntaxReference,
    ) -> std::result::Result<String, syntect::Error> {
        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &self.syntax_set,
            ClassStyle::Spaced,
        );
        for line in LinesWithEndings::from(code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        Ok(generator.finalize())
    }

    /// CSS matching the classes emitted for highlighted code
    pub fn stylesheet(&self) -> Result<String> {
        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next())
            .ok_or_else(|| anyhow!("No themes available"))?;
        Ok(css_for_theme_with_class_style(theme, ClassStyle::Spaced)?)
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Route an event into the open heading, if any
fn push_event<'a>(
    events: &mut Vec<Event<'a>>,
    heading: &mut Option<(HeadingLevel, Vec<Event<'a>>)>,
    event: Event<'a>,
) {
    match heading {
        Some((_, inner)) => inner.push(event),
        None => events.push(event),
    }
}

/// Render a heading with an anchor id derived from its text
fn render_heading(level: HeadingLevel, inner: Vec<Event>) -> String {
    let text: String = inner
        .iter()
        .filter_map(|e| match e {
            Event::Text(t) | Event::Code(t) => Some(&**t),
            _ => None,
        })
        .collect();

    let mut body = String::new();
    html::push_html(&mut body, inner.into_iter());

    format!("<{level} id=\"{}\">{body}</{level}>\n", heading_id(&text))
}

/// Lowercase the text and collapse every run of non-word characters into `-`.
/// Duplicate ids across headings are left as they are.
pub fn heading_id(text: &str) -> String {
    NON_WORD.replace_all(&text.to_lowercase(), "-").into_owned()
}

/// Split a text run into plain text and links for bare URLs
fn autolink(text: CowStr<'_>) -> Vec<Event<'static>> {
    let text: &str = &text;
    let mut out = Vec::new();
    let mut last = 0;

    for m in BARE_URL.find_iter(text) {
        if m.start() > last {
            out.push(Event::Text(CowStr::from(text[last..m.start()].to_string())));
        }
        let url = m.as_str();
        let href = if url.starts_with("www.") {
            format!("http://{}", url)
        } else {
            url.to_string()
        };
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Inline,
            dest_url: CowStr::from(href),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_string())));
        out.push(Event::End(TagEnd::Link));
        last = m.end();
    }

    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
    out
}

/// Short class-friendly name for a detected grammar
fn syntax_label(syntax: &SyntaxReference) -> String {
    syntax
        .file_extensions
        .first()
        .cloned()
        .unwrap_or_else(|| heading_id(&syntax.name))
}

/// Simple HTML escaping
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Hello World\n\nThis is a test.");
        assert!(html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_heading_ids() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("## Getting Started!");
        assert!(html.contains(r#"<h2 id="getting-started-">Getting Started!</h2>"#));

        assert_eq!(heading_id("What's  new -- v2?"), "what-s-new-v2-");
        assert_eq!(heading_id("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_duplicate_heading_ids_are_kept() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("## Setup\n\ntext\n\n## Setup\n");
        assert_eq!(html.matches(r#"<h2 id="setup">"#).count(), 2);
    }

    #[test]
    fn test_heading_with_inline_markup() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("### Using `cargo` *fast*");
        assert!(html.contains(r#"<h3 id="using-cargo-fast">"#));
        assert!(html.contains("<code>cargo</code>"));
        assert!(html.contains("<em>fast</em>"));
    }

    #[test]
    fn test_render_declared_language() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```python\ndef greet():\n    return 'hi'\n```");
        assert!(html.contains(r#"<pre><code class="hljs language-python">"#));
        assert!(html.contains("<span class="));
        assert!(html.contains("greet"));
    }

    #[test]
    fn test_render_detected_language() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```\n#!/usr/bin/env python\nprint(1)\n```");
        assert!(html.contains(r#"<pre><code class="hljs language-py">"#));
        assert!(html.contains("<span class="));
    }

    #[test]
    fn test_render_unknown_language_falls_back_to_plain_text() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```klingon\nQapla' & batlh\n```");
        assert!(html.contains(r#"<pre><code class="hljs language-plaintext">"#));
        assert!(html.contains("Qapla"));
        assert!(html.contains("&amp; batlh"));
    }

    #[test]
    fn test_render_detects_language_from_content() {
        let renderer = MarkdownRenderer::new();

        let rust = "```\npub struct Counter {\n    total: u32,\n}\n\nimpl Counter {\n    pub fn bump(&mut self) -> u32 {\n        self.total += 1;\n        self.total\n    }\n}\n```";
        let html = renderer.render(rust);
        assert!(html.contains(r#"<pre><code class="hljs language-rs">"#));
        assert!(html.contains("<span class="));

        let js = "```\nconst greet = (name) => {\n  console.log(name);\n};\n\nfunction main() {\n  return greet(\"x\");\n}\n```";
        let html = renderer.render(js);
        assert!(html.contains(r#"<pre><code class="hljs language-js">"#));
    }

    #[test]
    fn test_prose_block_stays_plain_text() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```\njust some words here\n```");
        assert!(html.contains(r#"<pre><code class="hljs language-plaintext">"#));
    }

    #[test]
    fn test_gfm_constructs() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_autolink() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("See https://example.com/docs. Or www.example.org");
        assert!(html.contains(r#"<a href="https://example.com/docs">https://example.com/docs</a>."#));
        assert!(html.contains(r#"<a href="http://www.example.org">www.example.org</a>"#));

        // Existing links are left alone
        let html = renderer.render("[https://example.com](https://example.com)");
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn test_autolink_skips_raw_anchors_and_images() {
        let renderer = MarkdownRenderer::new();

        let html = renderer.render(r#"<a href="https://x.com">https://x.com</a> then https://y.com"#);
        assert_eq!(html.matches("<a ").count(), 2);
        assert!(html.contains(r#"<a href="https://y.com">https://y.com</a>"#));

        let html = renderer.render("![see www.example.com](a.png)");
        assert!(html.contains(r#"alt="see www.example.com""#));
        assert!(!html.contains("&lt;a"));
    }

    #[test]
    fn test_heading_id_includes_bare_url() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("## Visit https://x.com now");
        assert!(html.contains(r#"<h2 id="visit-https-x-com-now">"#));
        assert!(html.contains(r#"<a href="https://x.com">https://x.com</a>"#));
    }

    #[test]
    fn test_single_newline_is_a_break() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("first line\nsecond line");
        assert!(html.contains("first line<br />"));
    }

    #[test]
    fn test_smart_punctuation() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("\"quoted\" -- and --- done");
        assert!(html.contains('\u{201c}'));
        assert!(html.contains('\u{2013}'));
        assert!(html.contains('\u{2014}'));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = MarkdownRenderer::new();
        let input = "# Title\n\n```rust\nfn main() {}\n```\n";
        assert_eq!(renderer.render(input), renderer.render(input));
    }

    #[test]
    fn test_stylesheet() {
        let renderer = MarkdownRenderer::new();
        let css = renderer.stylesheet().unwrap();
        assert!(css.contains('{'));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }
}
