//! Article output type with content, metadata, and format conversion.
//!
//! This module defines the [`Article`] struct which represents the complete
//! result of content extraction: the cleaned content tree, its plain text,
//! the metadata, and derived metrics.

use crate::dom_tree::{DomTree, NodeId};
use crate::formatters::markdown::{FrontMatterExtras, MarkdownDocument};
use crate::formatters::text::{TextConfig, convert_to_text};
use crate::metadata::{ArticleMetadata, count_words};
use crate::serializer::{MarkdownInput, MarkdownSerializer};
use crate::Result;

/// Output format options for Article content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Cleaned HTML of the content container.
    Html,
    /// Markdown with YAML front matter.
    #[default]
    Markdown,
    /// Plain text, one paragraph per block.
    PlainText,
}

/// The complete result of reading an HTML document.
#[derive(Debug, Clone)]
pub struct Article {
    /// Extracted metadata (title, byline, date, etc.).
    pub metadata: ArticleMetadata,

    /// Cleaned content; `content_root` is the `readability-page-1` div.
    pub content: DomTree,

    pub content_root: NodeId,

    /// Normalized text of the content.
    pub text_content: String,

    /// Word count of content.
    pub word_count: usize,

    /// Source URL if known.
    pub source_url: Option<String>,
}

impl Article {
    /// Creates an Article from a content tree, computing the derived text fields.
    pub fn new(
        metadata: ArticleMetadata, content: DomTree, content_root: NodeId, source_url: Option<String>,
    ) -> Self {
        let text_content = content.text_content(content_root).trim().to_string();
        let word_count = count_words(&text_content);
        Self { metadata, content, content_root, text_content, word_count, source_url }
    }

    /// The cleaned content as HTML.
    pub fn content_html(&self) -> String {
        self.content.outer_html(self.content_root)
    }

    /// Estimated reading time in minutes at 200 words per minute.
    pub fn reading_time(&self) -> f64 {
        self.word_count as f64 / 200.0
    }

    /// Serializes the content tree to Markdown.
    ///
    /// The content tree is not modified.
    pub fn to_markdown(&self, serializer: &MarkdownSerializer) -> Result<String> {
        serializer.serialize(MarkdownInput::Node(&self.content, self.content_root))
    }

    /// Serializes the content and wraps it in a front-matter document.
    ///
    /// `source` is the identifier written to the `source` key; when `None`
    /// the article's URL is used.
    pub fn to_document(&self, serializer: &MarkdownSerializer, source: Option<&str>) -> Result<MarkdownDocument> {
        let body = self.to_markdown(serializer)?;
        let source = source.or(self.source_url.as_deref()).unwrap_or_default();
        Ok(MarkdownDocument::new(&self.metadata.title, source, body)
            .with_extras(FrontMatterExtras::from(&self.metadata))
            .include_metadata(false))
    }

    /// Plain text of the content with paragraph breaks.
    pub fn to_text(&self, config: &TextConfig) -> String {
        convert_to_text(&self.content, self.content_root, &self.metadata, config)
    }

    /// Converts content to the specified format.
    pub fn to_format(&self, format: OutputFormat, serializer: &MarkdownSerializer) -> Result<String> {
        match format {
            OutputFormat::Html => Ok(self.content_html()),
            OutputFormat::Markdown => self.to_document(serializer, None).map(|doc| doc.render()),
            OutputFormat::PlainText => Ok(self.to_text(&TextConfig::default())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_fragment;

    fn article() -> Article {
        let tree = parse_fragment(
            r#"<div id="readability-page-1" class="page"><h2>Heading</h2><p>This is a test article with <em>some</em> content.</p></div>"#,
        );
        let root = tree.first_element_child(tree.root()).unwrap();
        let metadata = ArticleMetadata {
            title: "Test Article".to_string(),
            byline: Some("Ada Lovelace".to_string()),
            ..Default::default()
        };
        Article::new(metadata, tree, root, Some("https://example.com/a".to_string()))
    }

    #[test]
    fn test_article_creation() {
        let article = article();
        assert_eq!(article.text_content, "HeadingThis is a test article with some content.");
        assert_eq!(article.word_count, 8);
        assert!(article.reading_time() > 0.0);
        assert!(article.content_html().starts_with(r#"<div id="readability-page-1""#));
    }

    #[test]
    fn test_to_markdown() {
        let article = article();
        let markdown = article.to_markdown(&MarkdownSerializer::new()).unwrap();
        assert_eq!(markdown, "## Heading\n\nThis is a test article with *some* content.");
    }

    #[test]
    fn test_to_document_uses_source_url() {
        let article = article();
        let doc = article.to_document(&MarkdownSerializer::new(), None).unwrap();
        assert_eq!(doc.title(), "Test Article");
        assert_eq!(doc.source(), "https://example.com/a");
        assert!(!doc.render().contains("byline"));

        let doc = article.to_document(&MarkdownSerializer::new(), Some("local.html")).unwrap();
        assert_eq!(doc.source(), "local.html");
        assert!(doc.include_metadata(true).render().contains("byline: \"Ada Lovelace\""));
    }

    #[test]
    fn test_to_format() {
        let article = article();
        let serializer = MarkdownSerializer::new();
        assert!(article.to_format(OutputFormat::Html, &serializer).unwrap().contains("<h2>Heading</h2>"));
        assert!(article.to_format(OutputFormat::Markdown, &serializer).unwrap().starts_with("---\n"));
        assert_eq!(
            article.to_format(OutputFormat::PlainText, &serializer).unwrap(),
            "Heading\n\nThis is a test article with some content."
        );
    }
}
