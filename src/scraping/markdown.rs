//! HTML → Markdown conversion for extracted articles.

use regex::Regex;
use std::sync::OnceLock;

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static CHECKBOX_RE: OnceLock<Regex> = OnceLock::new();
static CHECKED_ATTR_RE: OnceLock<Regex> = OnceLock::new();
static BLANK_RUN_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"))
}

fn checkbox_re() -> &'static Regex {
    CHECKBOX_RE.get_or_init(|| {
        Regex::new(r#"(?i)<input\b[^>]*\btype\s*=\s*["']?checkbox["']?[^>]*>"#)
            .expect("valid checkbox regex")
    })
}

// A standalone `checked` attribute, not `unchecked` or `data-checked`.
fn checked_attr_re() -> &'static Regex {
    CHECKED_ATTR_RE.get_or_init(|| {
        Regex::new(r"(?i)\schecked(?:\s*=|\s|/?>)").expect("valid checked regex")
    })
}

fn blank_run_re() -> &'static Regex {
    BLANK_RUN_RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid blank-run regex"))
}

/// Whether `text` contains anything tag-like.
pub fn has_markup(text: &str) -> bool {
    tag_re().is_match(text)
}

/// Remove every tag-like substring.
pub fn strip_html(text: &str) -> String {
    tag_re().replace_all(text, "").into_owned()
}

// Alphanumeric markers pass through html2md without being escaped.
const CHECKED_MARKER: &str = "SCOUTTASKCHECKED";
const UNCHECKED_MARKER: &str = "SCOUTTASKUNCHECKED";

fn mark_checkboxes(html: &str) -> String {
    checkbox_re()
        .replace_all(html, |caps: &regex::Captures| {
            if checked_attr_re().is_match(&caps[0]) {
                CHECKED_MARKER
            } else {
                UNCHECKED_MARKER
            }
        })
        .into_owned()
}

fn render_checkboxes(markdown: &str) -> String {
    markdown
        .replace(&format!("{} ", CHECKED_MARKER), "[x] ")
        .replace(CHECKED_MARKER, "[x] ")
        .replace(&format!("{} ", UNCHECKED_MARKER), "[ ] ")
        .replace(UNCHECKED_MARKER, "[ ] ")
}

/// Convert an HTML fragment to Markdown.
///
/// Deterministic. Text without any tag-like substring is returned trimmed and
/// otherwise untouched, so converting already-stripped text is a no-op.
pub fn html_to_markdown(html: &str) -> String {
    if !has_markup(html) {
        return html.trim().to_string();
    }

    let html = mark_checkboxes(html);
    let markdown = html2md::parse_html(&html);
    let markdown = render_checkboxes(&strip_html(&markdown));
    let markdown = markdown.replace("\r\n", "\n");
    blank_run_re()
        .replace_all(&markdown, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_returned_trimmed() {
        let text = "  Bitcoin rose 3% today_with *no* markup  \n";
        assert_eq!(html_to_markdown(text), text.trim());
    }

    #[test]
    fn conversion_is_idempotent_on_stripped_text() {
        let samples = [
            "<p>Hello <b>world</b></p>",
            "<div><h2>Title</h2><p>a_b * c</p></div>",
            "no tags at all",
            "1 < 2 and 3 > 2",
        ];
        for sample in samples {
            let stripped = strip_html(sample);
            assert_eq!(html_to_markdown(&stripped), stripped.trim(), "{}", sample);
        }
    }

    #[test]
    fn common_structures_survive() {
        let md = html_to_markdown(
            "<h1>Prices</h1><p>Some <strong>bold</strong> text.</p>\
             <table><thead><tr><th>Coin</th><th>USD</th></tr></thead>\
             <tbody><tr><td>BTC</td><td>60000</td></tr></tbody></table>\
             <p>Was <del>50000</del> now.</p>\
             <pre><code>let x = 1;</code></pre>",
        );
        assert!(md.contains("Prices"));
        assert!(md.contains("**bold**"));
        assert!(md.contains('|'));
        assert!(md.contains("BTC"));
        assert!(md.contains("~~") && md.contains("50000"), "{}", md);
        assert!(md.contains("```"));
        assert!(md.contains("let x = 1;"));
        assert!(!md.contains('<'));
    }

    #[test]
    fn checkboxes_become_task_markers() {
        let md = html_to_markdown(
            r#"<ul><li><input type="checkbox" checked> done</li><li><input type="checkbox"> todo</li></ul>"#,
        );
        assert!(md.contains("[x]"));
        assert!(md.contains("[ ]"));
    }

    #[test]
    fn checked_must_be_its_own_attribute() {
        let md = html_to_markdown(
            r#"<ul><li><input type="checkbox" class="unchecked"> a</li><li><input data-checked="false" type="checkbox"> b</li><li><input type="checkbox" CHECKED/> c</li></ul>"#,
        );
        assert!(md.contains("[ ] a"), "{}", md);
        assert!(md.contains("[ ] b"), "{}", md);
        assert!(md.contains("[x] c"), "{}", md);
    }

    #[test]
    fn blank_runs_are_collapsed() {
        let md = html_to_markdown("<p>one</p><br><br><br><br><p>two</p>");
        assert!(!md.contains("\n\n\n"));
        assert!(md.contains("one"));
        assert!(md.contains("two"));
    }
}
