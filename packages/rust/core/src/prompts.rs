//! Prompt templates for the model-backed steps.

use blogwriter_shared::AnalyzedContent;

pub fn analyze_content(raw_content: &str) -> String {
    format!(
        r#"You are an expert at analysing web content.

Analyse the following web page content and extract its key information as JSON:

<web_content>
{raw_content}
</web_content>

Extract:
1. title: the page title
2. main_topic: the core topic (1-2 sentences)
3. key_points: the key points (a list, at most 5)
4. summary: an overall summary (3-5 sentences)
5. tone: the tone of the content (formal, casual, technical, ...)

Respond with JSON only."#
    )
}

pub fn suggest_keywords(analysis: &AnalyzedContent, user_keywords: Option<&[String]>) -> String {
    let user_section = match user_keywords {
        Some(keywords) if !keywords.is_empty() => {
            format!("Keywords suggested by the user: {}\n", keywords.join(", "))
        }
        _ => String::new(),
    };

    format!(
        r#"You are an SEO keyword specialist.

Based on the following content analysis, suggest 3 keywords for a blog post:

<analyzed_content>
Title: {title}
Topic: {topic}
Key points: {points}
Summary: {summary}
</analyzed_content>

{user_section}
Requirements:
- effective for SEO
- likely to have high search volume
- closely related to the content's topic

Return the 3 keywords as JSON:
{{"keywords": ["keyword1", "keyword2", "keyword3"]}}"#,
        title = analysis.title,
        topic = analysis.main_topic,
        points = analysis.key_points.join(", "),
        summary = analysis.summary,
    )
}

pub fn write_blog(analysis: &AnalyzedContent, keywords: &[String]) -> String {
    format!(
        r#"You are a professional blog writer.

Write an engaging blog post in Markdown based on the following information:

<source_content>
Title: {title}
Topic: {topic}
Key points: {points}
Summary: {summary}
</source_content>

<keywords>
{keywords}
</keywords>

Requirements:
1. Start with a title (H1)
2. Introduction, body and conclusion
3. Work the keywords in naturally
4. Use subheadings (H2, H3)
5. Mark where images belong as [IMAGE: description]
6. A reader-friendly tone
7. Roughly 1000-2000 words

Respond with Markdown only."#,
        title = analysis.title,
        topic = analysis.main_topic,
        points = analysis.key_points.join(", "),
        summary = analysis.summary,
        keywords = keywords.join(", "),
    )
}

pub fn optimize_seo(blog_excerpt: &str, keywords: &[String]) -> String {
    format!(
        r#"You are an SEO specialist.

Generate SEO metadata for the following blog post and keywords:

<blog_content>
{blog_excerpt}
</blog_content>

<keywords>
{keywords}
</keywords>

Respond as JSON:
{{
    "title": "SEO-optimised page title (50-60 characters)",
    "description": "meta description (150-160 characters)"
}}"#,
        keywords = keywords.join(", "),
    )
}

pub fn image_prompt(analysis: &AnalyzedContent) -> String {
    format!(
        r#"You are an expert at writing image prompts.

Write an image generation prompt that suits the following blog content:

<content>
Topic: {topic}
Key points: {points}
</content>

Requirements:
- suitable as the blog's main image
- professional and visually appealing style
- written in English

Respond with the image prompt only, without quotes."#,
        topic = analysis.main_topic,
        points = analysis.key_points.join(", "),
    )
}
