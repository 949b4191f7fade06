//! Markdown rendering for research reports
//!
//! Report markdown embeds titles and snippets taken from the open web, so
//! rendering never passes raw HTML through: inline and block HTML is turned
//! into escaped text, and the output is swept for script-capable constructs
//! that markdown itself can produce (e.g. `javascript:` links).
//!
//! ## Features
//! - Tables and strikethrough (GitHub-flavored)
//! - Links, lists, headers, emphasis
//! - Standalone HTML document wrapper for saved reports

use pulldown_cmark::{html, Event, Options, Parser};
use regex::Regex;
use std::sync::OnceLock;

const REPORT_STYLE: &str = "body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; max-width: 960px; }
h1, h2, h3 { color: #333; }
a { color: #007acc; }
hr { border: 0; border-top: 1px solid #ddd; margin: 24px 0; }
code { background: #f5f5f5; padding: 2px 4px; border-radius: 3px; }";

fn build_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Render markdown to a sanitized HTML fragment.
pub fn render_to_html(input: &str) -> String {
    let parser = Parser::new_ext(input, build_options()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut html_output = String::with_capacity(input.len() * 2);
    html::push_html(&mut html_output, parser);

    if contains_unsafe_html(&html_output) {
        sanitize_html(&html_output)
    } else {
        html_output
    }
}

/// Wrap a rendered fragment into a standalone document with embedded style.
pub fn wrap_html_document(title: &str, body_html: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}\n</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        REPORT_STYLE,
        body_html
    )
}

/// Check if HTML contains potentially unsafe content
fn contains_unsafe_html(html: &str) -> bool {
    let unsafe_patterns = [
        "<script",
        "javascript:",
        "vbscript:",
        "<iframe",
        "<object",
        "<embed",
        " on",
    ];

    let lower = html.to_lowercase();
    unsafe_patterns
        .iter()
        .any(|pattern| lower.contains(pattern))
}

fn unsafe_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"(?is)<script[^>]*>.*?</script>", ""),
            (r"(?is)<iframe[^>]*>.*?</iframe>", ""),
            (r"(?is)<object[^>]*>.*?</object>", ""),
            (r"(?i)<embed[^>]*>", ""),
            (r#"(?i)\s+on\w+\s*=\s*("[^"]*"|'[^']*')"#, ""),
            (r#"(?i)(href|src)\s*=\s*["']\s*(javascript|vbscript):[^"']*["']"#, "$1=\"#\""),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Sanitize HTML by removing unsafe tags and attributes
fn sanitize_html(html: &str) -> String {
    unsafe_rules()
        .iter()
        .fold(html.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).to_string()
        })
}

/// Escape HTML special characters
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
