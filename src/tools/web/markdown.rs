//! HTML to Markdown conversion
//!
//! Walks the parsed DOM and emits CommonMark-ish text. Script, style and
//! other non-content elements are dropped with their children.

use scraper::node::{Element, Node};
use scraper::{ElementRef, Html};

/// Elements skipped entirely
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "template", "head", "svg", "iframe", "button", "select",
];

/// Elements rendered as separate blocks
const BLOCKS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "main", "nav", "aside", "form",
    "figure", "figcaption", "table", "tr", "dl", "dt", "dd", "address", "details", "summary",
];

/// Which inline constructs are emitted
#[derive(Debug, Clone, Copy)]
struct Style {
    links: bool,
    emphasis: bool,
    images: bool,
}

const MARKDOWN: Style = Style {
    links: true,
    emphasis: true,
    images: true,
};

const PLAIN: Style = Style {
    links: false,
    emphasis: false,
    images: false,
};

/// Convert an HTML document to Markdown
#[must_use]
pub fn html_to_markdown(html: &str) -> String {
    render_document(html, MARKDOWN)
}

/// Convert an HTML fragment to plain text
///
/// Paragraph and line breaks are kept; links, emphasis and images are
/// reduced to their text.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut writer = Writer::new(PLAIN);
    writer.children(fragment.root_element());
    writer.finish()
}

fn render_document(html: &str, style: Style) -> String {
    let document = Html::parse_document(html);
    let mut writer = Writer::new(style);
    writer.children(document.root_element());
    writer.finish()
}

struct Writer {
    out: String,
    style: Style,
    pre: bool,
    list_depth: usize,
}

impl Writer {
    const fn new(style: Style) -> Self {
        Self {
            out: String::new(),
            style,
            pre: false,
            list_depth: 0,
        }
    }

    fn children(&mut self, el: ElementRef<'_>) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, el: ElementRef<'_>) {
        let value = el.value();
        let name = value.name();

        if SKIPPED.contains(&name) {
            return;
        }

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.block();
                if self.style.emphasis {
                    let level = usize::from(name.as_bytes()[1] - b'0');
                    self.out.push_str(&"#".repeat(level));
                    self.out.push(' ');
                }
                self.children(el);
                self.block();
            }
            "br" => self.out.push('\n'),
            "hr" => {
                self.block();
                self.out.push_str("---");
                self.block();
            }
            "a" => self.link(el, value),
            "img" => self.image(value),
            "strong" | "b" => self.wrapped(el, "**"),
            "em" | "i" => self.wrapped(el, "*"),
            "code" if !self.pre => self.wrapped(el, "`"),
            "pre" => self.preformatted(el),
            "ul" | "ol" => self.list(el, name == "ol"),
            "li" => {
                self.line();
                self.out.push_str("- ");
                self.children(el);
                self.line();
            }
            "blockquote" => self.quote(el),
            "td" | "th" => {
                self.children(el);
                self.out.push(' ');
            }
            _ if BLOCKS.contains(&name) => {
                self.block();
                self.children(el);
                self.block();
            }
            _ => self.children(el),
        }
    }

    fn text(&mut self, text: &str) {
        if self.pre {
            self.out.push_str(text);
            return;
        }

        let mut words = text.split_whitespace().peekable();
        if words.peek().is_none() {
            if !text.is_empty() && !self.at_boundary() {
                self.out.push(' ');
            }
            return;
        }

        if text.starts_with(char::is_whitespace) && !self.at_boundary() {
            self.out.push(' ');
        }
        let joined = words.collect::<Vec<_>>().join(" ");
        self.out.push_str(&joined);
        if text.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn link(&mut self, el: ElementRef<'_>, value: &Element) {
        let href = value.attr("href").filter(|h| !h.starts_with("javascript:"));
        match href {
            Some(href) if self.style.links => {
                let text = self.render_inline(el);
                if text.is_empty() {
                    return;
                }
                self.out.push('[');
                self.out.push_str(&text);
                self.out.push_str("](");
                self.out.push_str(href);
                self.out.push(')');
            }
            _ => self.children(el),
        }
    }

    fn image(&mut self, value: &Element) {
        if !self.style.images {
            return;
        }
        if let Some(src) = value.attr("src") {
            let alt = value.attr("alt").unwrap_or_default();
            self.out.push_str(&format!("![{alt}]({src})"));
        }
    }

    fn wrapped(&mut self, el: ElementRef<'_>, marker: &str) {
        if !self.style.emphasis {
            self.children(el);
            return;
        }
        let text = self.render_inline(el);
        if text.is_empty() {
            return;
        }
        self.out.push_str(marker);
        self.out.push_str(&text);
        self.out.push_str(marker);
    }

    fn preformatted(&mut self, el: ElementRef<'_>) {
        self.block();
        let fence = self.style.emphasis;
        if fence {
            self.out.push_str("```\n");
        }
        let was_pre = std::mem::replace(&mut self.pre, true);
        self.children(el);
        self.pre = was_pre;
        if fence {
            self.line();
            self.out.push_str("```");
        }
        self.block();
    }

    fn list(&mut self, el: ElementRef<'_>, ordered: bool) {
        self.block();
        let indent = "  ".repeat(self.list_depth);
        self.list_depth += 1;

        let items = el
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "li");
        for (n, item) in items.enumerate() {
            self.line();
            self.out.push_str(&indent);
            if ordered {
                self.out.push_str(&format!("{}. ", n + 1));
            } else {
                self.out.push_str("- ");
            }
            self.children(item);
        }

        self.list_depth -= 1;
        self.block();
    }

    fn quote(&mut self, el: ElementRef<'_>) {
        let mut inner = Self::new(self.style);
        inner.children(el);
        let inner = inner.finish();
        if inner.is_empty() {
            return;
        }
        self.block();
        let quoted: Vec<String> = inner
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect();
        self.out.push_str(&quoted.join("\n"));
        self.block();
    }

    fn render_inline(&self, el: ElementRef<'_>) -> String {
        let mut inner = Self::new(self.style);
        inner.pre = self.pre;
        inner.children(el);
        inner.out.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn at_boundary(&self) -> bool {
        self.out.is_empty() || self.out.ends_with(char::is_whitespace)
    }

    /// Make sure the output ends with a newline
    fn line(&mut self) {
        trim_trailing_spaces(&mut self.out);
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Make sure the output ends with a blank line
    fn block(&mut self) {
        self.line();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn finish(self) -> String {
        let mut result = String::with_capacity(self.out.len());
        let mut blank_run = 0;
        for line in self.out.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            result.push_str(line);
            result.push('\n');
        }
        result.trim().to_string()
    }
}

fn trim_trailing_spaces(out: &mut String) {
    let trimmed = out.trim_end_matches([' ', '\t']).len();
    out.truncate(trimmed);
}
