//! Markdown-to-HTML rendering for finished blog posts.
//!
//! [`render_document`] is a pure function: identical inputs always produce
//! byte-identical output. It:
//! 1. Substitutes `[IMAGE: ...]` placeholders with image references
//! 2. Converts Markdown to an HTML fragment via `comrak`
//! 3. Wraps the fragment in the document template with SEO metadata

mod placeholders;

use comrak::{Options, markdown_to_html};
use tracing::{debug, instrument};

use blogwriter_shared::SeoMeta;

use placeholders::count_placeholders;
pub use placeholders::substitute_images;

const STYLESHEET: &str = r#"        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.8;
            max-width: 800px;
            margin: 0 auto;
            padding: 2rem;
            color: #333;
        }
        h1 { color: #1a1a1a; margin-bottom: 1rem; }
        h2 { color: #2a2a2a; margin-top: 2rem; }
        img { max-width: 100%; height: auto; border-radius: 8px; margin: 1.5rem 0; }
        p { margin: 1rem 0; }
        code { background: #f4f4f4; padding: 0.2rem 0.4rem; border-radius: 4px; }
        pre { background: #f4f4f4; padding: 1rem; border-radius: 8px; overflow-x: auto; }"#;

/// Render a complete HTML document from blog Markdown.
#[instrument(skip_all, fields(markdown_len = markdown.len(), images = image_urls.len()))]
pub fn render_document(markdown: &str, image_urls: &[String], seo_meta: &SeoMeta) -> String {
    let placeholders = count_placeholders(markdown);
    if placeholders > image_urls.len() {
        debug!(
            placeholders,
            images = image_urls.len(),
            "more placeholders than images, extras stay literal"
        );
    }
    let with_images = substitute_images(markdown, image_urls);
    let body = markdown_to_body(&with_images);
    debug!(body_len = body.len(), "markdown converted");
    wrap_document(&body, seo_meta)
}

/// Convert Markdown to an HTML fragment. Raw HTML in the input is not passed through.
pub fn markdown_to_body(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    markdown_to_html(markdown, &options)
}

fn wrap_document(body: &str, seo_meta: &SeoMeta) -> String {
    let title = escape_html(&seo_meta.title);
    let description = escape_html(&seo_meta.description);
    let body = body.trim_end();

    format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="description" content="{description}">
    <title>{title}</title>
    <style>
{STYLESHEET}
    </style>
</head>
<body>
    <article>
{body}
    </article>
</body>
</html>
"#
    )
}

/// Escape text for use in element content and double-quoted attributes.
fn escape_html(text: &str) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(title: &str, description: &str) -> SeoMeta {
        SeoMeta {
            title: title.into(),
            description: description.into(),
        }
    }

    #[test]
    fn wraps_body_in_document_template() {
        let html = render_document("# Hello\n\nWorld", &[], &meta("Hello Post", "A greeting"));
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"ko\">"));
        assert!(html.contains("<meta name=\"description\" content=\"A greeting\">"));
        assert!(html.contains("<title>Hello Post</title>"));
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<p>World</p>"));
        assert!(html.contains("<article>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let md = "# T\n\n[IMAGE: one]\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n[IMAGE: two]";
        let urls = vec!["https://img/1.png".to_string()];
        let seo = meta("T", "d");
        let first = render_document(md, &urls, &seo);
        let second = render_document(md, &urls, &seo);
        assert_eq!(first, second);
    }

    #[test]
    fn placeholders_become_img_tags() {
        let md = "[IMAGE: a cat]\n\n[IMAGE: a dog]";
        let urls = vec!["https://img/cat.png".to_string()];
        let html = render_document(md, &urls, &SeoMeta::default());
        assert!(html.contains(r#"<img src="https://img/cat.png" alt="a cat" />"#));
        assert!(html.contains("[IMAGE: a dog]"));
    }

    #[test]
    fn metadata_is_escaped() {
        let html = render_document("body", &[], &meta("Fish & <Chips>", "say \"hi\""));
        assert!(html.contains("<title>Fish &amp; &lt;Chips&gt;</title>"));
        assert!(html.contains("content=\"say &quot;hi&quot;\""));
    }

    #[test]
    fn default_meta_uses_generic_title() {
        let html = render_document("text", &[], &SeoMeta::default());
        assert!(html.contains("<title>Blog Post</title>"));
        assert!(html.contains("<meta name=\"description\" content=\"\">"));
    }

    #[test]
    fn raw_html_is_not_passed_through() {
        let body = markdown_to_body("<script>alert(1)</script>\n\nok");
        assert!(!body.contains("<script>"));
        assert!(body.contains("<p>ok</p>"));
    }

    #[test]
    fn gfm_extensions_enabled() {
        let body = markdown_to_body("~~gone~~\n\n- [x] done\n\n| h |\n|---|\n| c |");
        assert!(body.contains("<del>gone</del>"));
        assert!(body.contains("<table>"));
        assert!(body.contains("checkbox"));
    }
}
