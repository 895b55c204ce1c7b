//! Markdown rendering and HTML sanitization.
//!
//! Every piece of text shown in the widget goes through a [`MarkupPipeline`]:
//! first the [`MarkdownRenderer`] turns it into markup, then the [`Sanitizer`]
//! reduces that markup to a safe subset.  Views only ever receive [`SafeHtml`],
//! so nothing from the endpoint is interpreted as markup before sanitization.

use std::fmt;

use pulldown_cmark::{Options, Parser};

/// Tags that survive sanitization.  Everything else is escaped into text.
pub const ALLOWED_TAGS: &[&str] = &[
    "a",
    "b",
    "blockquote",
    "br",
    "code",
    "del",
    "div",
    "em",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "i",
    "li",
    "ol",
    "p",
    "pre",
    "s",
    "span",
    "strong",
    "table",
    "tbody",
    "td",
    "th",
    "thead",
    "tr",
    "ul",
];

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/////////////////////////////////////////// SafeHtml ///////////////////////////////////////////

/// Markup that has been through a [`Sanitizer`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SafeHtml(String);

impl SafeHtml {
    /// Wrap markup the caller has already sanitized.
    ///
    /// This is the constructor for [`Sanitizer`] implementations.  Anything else
    /// should obtain `SafeHtml` from a sanitizer.
    pub fn from_sanitized(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    /// Borrow the markup.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the markup.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Strip tags and decode entities for display on a text surface.
    ///
    /// Block-level tags become line breaks, blank lines are dropped, list items
    /// get a leading dash, and control characters other than newline and tab are
    /// removed.
    pub fn to_plain_text(&self) -> String {
        let mut text = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();
        while let Some(start) = rest.find('<') {
            text.push_str(&rest[..start]);
            let Some(len) = rest[start..].find('>') else {
                rest = &rest[start..];
                break;
            };
            let tag = &rest[start + 1..start + len];
            let name = tag
                .trim_start_matches('/')
                .split(|c: char| c.is_ascii_whitespace() || c == '/')
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            match name.as_str() {
                "li" if !tag.starts_with('/') => text.push_str("\n- "),
                "br" | "p" | "div" | "pre" | "blockquote" | "ul" | "ol" | "li" | "tr" | "hr"
                | "table" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => text.push('\n'),
                "td" | "th" if tag.starts_with('/') => text.push(' '),
                _ => {}
            }
            rest = &rest[start + len + 1..];
        }
        text.push_str(rest);

        let decoded: String = decode_entities(&text)
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();
        decoded
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//////////////////////////////////////////// Traits ////////////////////////////////////////////

/// Converts message text into markup.
pub trait MarkdownRenderer: Send + Sync {
    /// Render `text`.  The output is not yet safe to display.
    fn render(&self, text: &str) -> String;
}

/// Reduces arbitrary markup to a safe subset.
pub trait Sanitizer: Send + Sync {
    /// Sanitize `markup`.
    fn sanitize(&self, markup: &str) -> SafeHtml;
}

/////////////////////////////////////// CommonMarkRenderer ///////////////////////////////////////

/// CommonMark rendering with tables and strikethrough.
#[derive(Debug, Clone, Copy)]
pub struct CommonMarkRenderer {
    options: Options,
}

impl CommonMarkRenderer {
    /// Create a renderer with the given parser options.
    pub fn with_options(options: Options) -> Self {
        Self { options }
    }
}

impl Default for CommonMarkRenderer {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self { options }
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, text: &str) -> String {
        let parser = Parser::new_ext(text, self.options);
        let mut html = String::with_capacity(text.len() + text.len() / 2);
        pulldown_cmark::html::push_html(&mut html, parser);
        html
    }
}

////////////////////////////////////// AllowlistSanitizer //////////////////////////////////////

/// Keeps only allow-listed tags and rebuilds each one from scratch.
///
/// Attributes are dropped except `href` and `title` on `a` (the href only when
/// [`is_safe_url`] accepts it), `start` on `ol`, and a `language-*` class on
/// `code`.  A tag that is not allowed, including comments and doctypes, is
/// escaped and so renders as inert text.
#[derive(Debug, Clone)]
pub struct AllowlistSanitizer {
    allowed: &'static [&'static str],
}

impl AllowlistSanitizer {
    /// Create a sanitizer that keeps `allowed` tags.
    pub fn new(allowed: &'static [&'static str]) -> Self {
        Self { allowed }
    }

    fn allows(&self, name: &str) -> bool {
        self.allowed.contains(&name)
    }

    fn rebuild(&self, tag: &Tag) -> String {
        if tag.closing {
            return format!("</{}>", tag.name);
        }
        let mut out = format!("<{}", tag.name);
        for (name, value) in tag.attrs.iter() {
            let Some(value) = value else {
                continue;
            };
            let value = decode_entities(value);
            let keep = match (tag.name.as_str(), name.as_str()) {
                ("a", "href") => is_safe_url(&value),
                ("a", "title") => true,
                ("ol", "start") => !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()),
                ("code", "class") => is_language_class(&value),
                _ => false,
            };
            if keep {
                out.push_str(&format!(" {}=\"{}\"", name, escape_html(&value)));
            }
        }
        if tag.self_closing {
            out.push_str(" /");
        }
        out.push('>');
        out
    }
}

impl Default for AllowlistSanitizer {
    fn default() -> Self {
        Self::new(ALLOWED_TAGS)
    }
}

impl Sanitizer for AllowlistSanitizer {
    fn sanitize(&self, markup: &str) -> SafeHtml {
        let mut out = String::with_capacity(markup.len());
        let mut rest = markup;
        while let Some(start) = rest.find('<') {
            out.push_str(&rest[..start]);
            rest = &rest[start..];
            match parse_tag(rest) {
                Some((tag, consumed)) if self.allows(&tag.name) => {
                    out.push_str(&self.rebuild(&tag));
                    rest = &rest[consumed..];
                }
                Some((_, consumed)) => {
                    out.push_str(&escape_html(&rest[..consumed]));
                    rest = &rest[consumed..];
                }
                None => {
                    out.push_str("&lt;");
                    rest = &rest[1..];
                }
            }
        }
        out.push_str(rest);
        SafeHtml(out)
    }
}

//////////////////////////////////////// MarkupPipeline ////////////////////////////////////////

/// Render, then sanitize.
pub struct MarkupPipeline {
    renderer: Box<dyn MarkdownRenderer>,
    sanitizer: Box<dyn Sanitizer>,
}

impl MarkupPipeline {
    /// Create a pipeline from its two stages.
    pub fn new(
        renderer: impl MarkdownRenderer + 'static,
        sanitizer: impl Sanitizer + 'static,
    ) -> Self {
        Self {
            renderer: Box::new(renderer),
            sanitizer: Box::new(sanitizer),
        }
    }

    /// Turn message text into displayable markup.
    pub fn to_safe_html(&self, text: &str) -> SafeHtml {
        self.sanitizer.sanitize(&self.renderer.render(text))
    }
}

impl Default for MarkupPipeline {
    fn default() -> Self {
        Self::new(CommonMarkRenderer::default(), AllowlistSanitizer::default())
    }
}

impl fmt::Debug for MarkupPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkupPipeline").finish_non_exhaustive()
    }
}

///////////////////////////////////////////// URLs /////////////////////////////////////////////

/// True when `url` is relative or uses an http, https, or mailto scheme.
///
/// Whitespace and control characters are ignored while looking for the scheme,
/// matching how browsers read `java\tscript:` as `javascript:`.
pub fn is_safe_url(url: &str) -> bool {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    if compact.is_empty() {
        return false;
    }
    let scheme_end = compact.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(end) if compact[end..].starts_with(':') => {
            let scheme = compact[..end].to_ascii_lowercase();
            SAFE_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}

/// Escape text for inclusion in HTML content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove every control character, for one-line text bound for a terminal.
pub fn strip_controls(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

fn is_language_class(value: &str) -> bool {
    value.strip_prefix("language-").is_some_and(|lang| {
        !lang.is_empty()
            && lang
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#'))
    })
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => {
                    if let Some(hex) = entity
                        .strip_prefix("#x")
                        .or_else(|| entity.strip_prefix("#X"))
                    {
                        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse::<u32>().ok().and_then(char::from_u32)
                    } else {
                        None
                    }
                }
            };
            c.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

////////////////////////////////////////// Tag parsing //////////////////////////////////////////

#[derive(Debug)]
struct Tag {
    name: String,
    closing: bool,
    self_closing: bool,
    attrs: Vec<(String, Option<String>)>,
}

/// Parse one tag at the start of `input`, which begins with `<`.
///
/// Returns the tag and the number of bytes it spans, or `None` if `input` does
/// not start with a well-formed start or end tag.
fn parse_tag(input: &str) -> Option<(Tag, usize)> {
    let bytes = input.as_bytes();
    let mut i = 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let name_start = i;
    if !bytes.get(i)?.is_ascii_alphabetic() {
        return None;
    }
    while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
        i += 1;
    }
    let name = input[name_start..i].to_ascii_lowercase();
    let mut attrs = Vec::new();
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => {
                return Some((
                    Tag {
                        name,
                        closing,
                        self_closing: false,
                        attrs,
                    },
                    i + 1,
                ));
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Some((
                    Tag {
                        name,
                        closing,
                        self_closing: true,
                        attrs,
                    },
                    i + 2,
                ));
            }
            _ => {}
        }
        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
        {
            i += 1;
        }
        if i == attr_start {
            return None;
        }
        let attr_name = input[attr_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            attrs.push((attr_name, None));
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let value = match bytes.get(i)? {
            quote @ (b'"' | b'\'') => {
                let close = input[i + 1..].find(*quote as char)?;
                let value = &input[i + 1..i + 1 + close];
                i += close + 2;
                value
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                &input[value_start..i]
            }
        };
        attrs.push((attr_name, Some(value.to_string())));
    }
}
