//! HTML -> Markdown converter (spec §4.1).
//!
//! Extracts the main content region, strips scripts/styles, and rewrites
//! block and inline elements into Markdown. Fails soft: malformed input
//! yields an empty string rather than propagating an error.

use scraper::{ElementRef, Html, Selector};

/// Candidate selectors for the main content region, tried in order.
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    "#main",
    ".main-content",
    "body",
];

/// Convert a full HTML document into normalized Markdown.
pub fn html_to_markdown(html: &str) -> String {
    let document = Html::parse_document(html);

    let root = MAIN_CONTENT_SELECTORS
        .iter()
        .find_map(|sel| Selector::parse(sel).ok().and_then(|s| document.select(&s).next()));

    let Some(root) = root else {
        return String::new();
    };

    let mut out = String::new();
    render_children(root, 0, &mut out);
    collapse_blank_lines(&out)
}

fn render_children(el: ElementRef, indent: usize, out: &mut String) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            render_element(child_el, indent, out);
        } else if let Some(text) = child.value().as_text() {
            let decoded = html_escape::decode_html_entities(text);
            out.push_str(&decoded);
        }
    }
}

fn render_element(el: ElementRef, indent: usize, out: &mut String) {
    let tag = el.value().name();
    match tag {
        "script" | "style" | "noscript" => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level: usize = tag[1..].parse().unwrap_or(1);
            out.push_str(&"#".repeat(level));
            out.push(' ');
            push_inline_text(el, out);
            out.push_str("\n\n");
        }
        "p" => {
            push_inline(el, indent, out);
            out.push_str("\n\n");
        }
        "br" => {
            out.push('\n');
        }
        "strong" | "b" => {
            out.push_str("**");
            push_inline_text(el, out);
            out.push_str("**");
        }
        "em" | "i" => {
            out.push('*');
            push_inline_text(el, out);
            out.push('*');
        }
        "code" => {
            out.push('`');
            push_inline_text(el, out);
            out.push('`');
        }
        "pre" => {
            out.push_str("```\n");
            push_inline_text(el, out);
            out.push_str("\n```\n\n");
        }
        "a" => {
            let href = el.value().attr("href").unwrap_or("");
            out.push('[');
            push_inline_text(el, out);
            out.push(']');
            out.push('(');
            out.push_str(href);
            out.push(')');
        }
        "ul" | "ol" => {
            render_list(el, indent, out);
            out.push('\n');
        }
        "li" => {
            // Handled by render_list; plain recursion otherwise.
            render_children(el, indent, out);
        }
        "blockquote" => {
            out.push_str("> ");
            push_inline_text(el, out);
            out.push_str("\n\n");
        }
        "div" | "section" | "span" | "body" | "main" | "article" => {
            if is_note_aside(el) {
                out.push_str("> Note: ");
                push_inline_text(el, out);
                out.push_str("\n\n");
            } else {
                render_children(el, indent, out);
            }
        }
        _ => {
            render_children(el, indent, out);
        }
    }
}

fn is_note_aside(el: ElementRef) -> bool {
    let class = el.value().attr("class").unwrap_or("");
    class.contains("note") || class.contains("important")
}

fn push_inline(el: ElementRef, indent: usize, out: &mut String) {
    render_children(el, indent, out);
}

fn push_inline_text(el: ElementRef, out: &mut String) {
    let mut buf = String::new();
    render_children(el, 0, &mut buf);
    out.push_str(buf.trim());
}

fn render_list(el: ElementRef, indent: usize, out: &mut String) {
    let item_sel = Selector::parse(":scope > li").ok();
    let Some(item_sel) = item_sel else { return };
    for item in el.select(&item_sel) {
        out.push_str(&"  ".repeat(indent));
        out.push_str("- ");
        let nested_lists = Selector::parse(":scope > ul, :scope > ol").ok();
        if let Some(nested_sel) = &nested_lists {
            for nested in item.select(nested_sel) {
                render_list(nested, indent + 1, out);
            }
        }
        push_inline_text(item, out);
        out.push('\n');
    }
}

/// Collapse runs of 3+ blank lines to a single blank line.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 1 {
                out.push('\n');
            }
        } else {
            blank_run = 0;
            out.push_str(line);
            out.push('\n');
        }
    }
    out.trim().to_string()
}

/// Infer the framework token from a documentation URL path: the first path
/// segment after `/documentation/`, lowercased.
pub fn infer_framework_from_url(url: &str) -> String {
    if let Some(idx) = url.find("/documentation/") {
        let rest = &url[idx + "/documentation/".len()..];
        let segment = rest.split('/').next().unwrap_or("");
        let segment = segment.split(['?', '#']).next().unwrap_or(segment);
        return segment.to_lowercase();
    }
    String::new()
}
