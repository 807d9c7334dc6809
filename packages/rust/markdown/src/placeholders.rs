//! `[IMAGE: description]` placeholder substitution.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[IMAGE:\s*([^\]]+)\]").expect("valid regex"));

/// Replace image placeholders with Markdown image references.
///
/// URLs are consumed first-in-first-out in placeholder order, one per
/// placeholder. Unused URLs are ignored; placeholders left over once the URLs
/// run out stay as literal text.
pub fn substitute_images(markdown: &str, image_urls: &[String]) -> String {
    let mut urls = image_urls.iter();

    IMAGE_RE
        .replace_all(markdown, |caps: &Captures| match urls.next() {
            Some(url) => format!("![{}]({url})", caps[1].trim()),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Number of image placeholders in `markdown`.
pub fn count_placeholders(markdown: &str) -> usize {
    IMAGE_RE.find_iter(markdown).count()
}
