//! Readable-text extraction from an HTML document.

use scraper::{Html, Node};

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header", "noscript"];

/// Extract the visible text of `html`.
///
/// Text inside [`SKIPPED_ELEMENTS`] is dropped. Every remaining line is
/// trimmed, blank lines are removed and the rest joined with `\n`.
pub fn extract_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut lines: Vec<&str> = Vec::new();

    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        lines.extend(text.lines().map(str::trim).filter(|l| !l.is_empty()));
    }

    lines.join("\n")
}
